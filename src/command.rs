//! # Raster Image Command (GS v 0)
//!
//! | Format  | Bytes |
//! |---------|-------|
//! | ASCII   | GS v 0 m xL xH yL yH d1...dk |
//! | Hex     | 1D 76 30 m xL xH yL yH d1...dk |
//!
//! - `m`: density/size mode, passed through untouched
//! - `xL xH`: bytes per row, little endian
//! - `yL yH`: number of rows, little endian
//! - `d1...dk`: packed rows, k = bytes per row × rows

use log::debug;

use crate::{error::Error, pack::PackedRaster};

const GS: u8 = 0x1D;
const RASTER_IMAGE: [u8; 2] = [0x76, 0x30];

/// Length of the command header preceding the raster data.
pub const HEADER_LEN: usize = 8;

/// Header plus packed rows, ready to hand to a transport.
#[derive(Debug, PartialEq, Eq)]
pub struct CommandBuffer {
    bytes: Vec<u8>,
}

impl CommandBuffer {
    pub fn header(&self) -> &[u8] {
        &self.bytes[..HEADER_LEN]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn u16_field(value: u32, name: &str) -> Result<[u8; 2], Error> {
    u16::try_from(value)
        .map(u16::to_le_bytes)
        .map_err(|_| Error::InvalidInput(format!("{} {} exceeds 0xFFFF", name, value)))
}

/// Wrap `raster` in a raster image command using density `mode`.
pub fn frame(raster: PackedRaster, mode: u8) -> Result<CommandBuffer, Error> {
    let [xl, xh] = u16_field(raster.bytes_per_row(), "bytes per row")?;
    let [yl, yh] = u16_field(raster.height(), "height")?;

    let data = raster.into_data();
    let mut bytes = Vec::with_capacity(HEADER_LEN + data.len());
    bytes.push(GS);
    bytes.extend_from_slice(&RASTER_IMAGE);
    bytes.extend_from_slice(&[mode, xl, xh, yl, yh]);
    bytes.extend(data);

    debug!("framed raster command: {} bytes", bytes.len());

    Ok(CommandBuffer { bytes })
}
