//! Packs two-level bitmaps into printer rows.
//!
//! Graphics data is packed as bytes where each bit represents one dot:
//! - Bit 7 (MSB) = leftmost dot
//! - Bit 0 (LSB) = rightmost dot
//! - 1 = black (print), 0 = white (no print)
//!
//! Rows whose width is not a multiple of 8 are padded with blank bits.

use log::debug;

use crate::dither::BitBuffer;

/// Packed raster, `bytes_per_row * height` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRaster {
    bytes_per_row: u32,
    height: u32,
    data: Vec<u8>,
}

impl PackedRaster {
    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_row as usize;
        &self.data[start..start + self.bytes_per_row as usize]
    }

    pub(crate) fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Pack one row of marks, MSB first, zero padded.
///
/// ```
/// use thermal_raster::pack_row;
///
/// assert_eq!(pack_row(&[1, 1, 1, 1, 0, 0, 0, 0]), vec![0xF0]);
/// assert_eq!(pack_row(&[1, 0, 1]), vec![0b1010_0000]);
/// ```
pub fn pack_row(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &px)| byte | ((px & 1) << (7 - i)))
        })
        .collect()
}

/// Pack every row of `bits`.
pub fn pack(bits: &BitBuffer) -> PackedRaster {
    let bytes_per_row = (bits.width() + 7) / 8;
    let mut data = Vec::with_capacity(bytes_per_row as usize * bits.height() as usize);
    for y in 0..bits.height() {
        data.extend(pack_row(bits.row(y)));
    }

    debug!("packed {} rows of {} bytes", bits.height(), bytes_per_row);

    PackedRaster {
        bytes_per_row,
        height: bits.height(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rows_are_msb_first() {
        let bits = BitBuffer::from_bits(8, 2, vec![1, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1])
            .unwrap();
        let packed = pack(&bits);
        assert_eq!(packed.bytes_per_row(), 1);
        assert_eq!(packed.data(), &[0x81, 0x55]);
    }

    #[test]
    fn unaligned_width_pads_with_blank_bits() {
        let bits = BitBuffer::from_bits(10, 1, vec![1; 10]).unwrap();
        let packed = pack(&bits);
        assert_eq!(packed.bytes_per_row(), 2);
        assert_eq!(packed.data(), &[0xFF, 0b1100_0000]);
    }

    #[test]
    fn unpacking_reconstructs_every_bit() {
        let (w, h) = (19, 5);
        let marks: Vec<u8> = (0..w * h).map(|i| ((i * 31 + i / 7) % 3 == 0) as u8).collect();
        let bits = BitBuffer::from_bits(w, h, marks).unwrap();
        let packed = pack(&bits);
        let bpr = packed.bytes_per_row() as usize;
        assert_eq!(packed.data().len(), bpr * h as usize);

        for y in 0..h {
            for x in 0..w {
                let byte = packed.data()[y as usize * bpr + x as usize / 8];
                assert_eq!((byte >> (7 - x % 8)) & 1, bits.get(x, y), "({}, {})", x, y);
            }
            assert_eq!(packed.row(y).len(), bpr);
        }
    }
}
