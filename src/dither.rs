//! # Floyd–Steinberg Error Diffusion
//!
//! Reduces a grayscale buffer to strict black/white while keeping the
//! average tone. Each pixel is thresholded at 128 and its quantization error
//! is pushed onto the neighbors that have not been visited yet:
//!
//! ```text
//!            current   7/16
//!   3/16      5/16     1/16
//! ```
//!
//! Because every row inherits the residual of the row above, the scan is
//! strictly sequential: left to right, top to bottom.

use log::debug;

use crate::{error::Error, luminance::GrayscaleBuffer};

const THRESHOLD: f32 = 128.0;

/// Row-major two-level bitmap, 1 = mark (black dot), 0 = blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl BitBuffer {
    /// Build a bitmap from explicit marks; any non-zero value counts as a mark.
    ///
    /// Fails with [`Error::InvalidInput`] if a dimension is zero or
    /// `bits.len() != width * height`.
    pub fn from_bits(width: u32, height: u32, bits: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "bitmap must not be empty, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize;
        if bits.len() != expected {
            return Err(Error::InvalidInput(format!(
                "expected {} bits for {}x{}, got {}",
                expected,
                width,
                height,
                bits.len()
            )));
        }
        let bits = bits.into_iter().map(|b| (b != 0) as u8).collect();
        Ok(BitBuffer {
            width,
            height,
            bits,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 1 if (x, y) is marked, 0 if blank.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.bits[start..start + self.width as usize]
    }

    /// Render the bitmap as an 8-bit image, marks black on white paper.
    pub fn to_image(&self) -> image::GrayImage {
        image::GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) == 1 { 0 } else { 255 }])
        })
    }
}

/// Dither `gray` in place and return the resulting bitmap.
///
/// Takes ownership of the grayscale buffer; its values are overwritten with
/// accumulated error and are not meaningful afterwards.
pub fn dither(gray: GrayscaleBuffer) -> BitBuffer {
    let GrayscaleBuffer {
        width,
        height,
        mut values,
    } = gray;
    let (w, h) = (width as usize, height as usize);
    let mut bits = vec![0u8; w * h];

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let old = values[i];
            let (bit, new) = if old < THRESHOLD { (1, 0.0) } else { (0, 255.0) };
            bits[i] = bit;
            let err = old - new;

            if x + 1 < w {
                values[i + 1] += err * 7.0 / 16.0;
            }
            if y + 1 < h {
                let below = i + w;
                if x > 0 {
                    values[below - 1] += err * 3.0 / 16.0;
                }
                values[below] += err * 5.0 / 16.0;
                if x + 1 < w {
                    values[below + 1] += err * 1.0 / 16.0;
                }
            }
        }
    }

    debug!("dithered {}x{}", width, height);

    BitBuffer {
        width,
        height,
        bits,
    }
}
