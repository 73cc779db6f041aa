//! Thermal Receipt Printer Raster Encoder
//!
//! This crate turns an RGBA image into the `GS v 0` raster command understood
//! by ESC/POS thermal receipt printers, and delivers it over a serial line, a
//! USB bulk endpoint, or a WebSocket relay.
//!
//! # Example
//!
//! ```rust,no_run
//! use thermal_raster::{print, Config, Connection, ImageCapture, DOT_WIDTH_58MM};
//!
//! let mut source = ImageCapture::open("receipt.png").unwrap();
//! let config = Config::new(DOT_WIDTH_58MM);
//! let handle = Connection::Serial {
//!     path: "/dev/ttyUSB0".into(),
//!     baud: 9600,
//! }
//! .open()
//! .unwrap();
//! print(&mut source, &config, handle).unwrap();
//! ```

mod capture;
mod command;
mod dither;
mod error;
mod luminance;
mod pack;
mod printer;
mod raster;
pub mod transport;

pub use crate::{
    capture::{Capture, ImageCapture},
    command::{frame, CommandBuffer, HEADER_LEN},
    dither::{dither, BitBuffer},
    error::{Error, TransportError},
    luminance::{to_grayscale, GrayscaleBuffer},
    pack::{pack, pack_row, PackedRaster},
    printer::{print, render, Config},
    raster::{resize, PixelBuffer},
    transport::{available, Capabilities, Connection, Transport, TransportHandle, TransportKind},
};

/// Print head width of 58 mm printers, in dots.
///
/// 384 dots pack into 48 bytes per row.
pub const DOT_WIDTH_58MM: u32 = 384;

/// Print head width of 80 mm printers, in dots.
///
/// 576 dots pack into 72 bytes per row.
pub const DOT_WIDTH_80MM: u32 = 576;
