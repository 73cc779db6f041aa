//! Capture sources: anything that can hand the encoder an RGBA buffer.

use std::path::Path;

use image::DynamicImage;
use log::debug;

use crate::{error::Error, raster::PixelBuffer};

/// Producer of the pixels to print.
pub trait Capture {
    /// Grab the current content. Fails with [`Error::CaptureInvalid`] when
    /// either dimension resolves to zero.
    fn capture(&mut self) -> Result<PixelBuffer, Error>;
}

impl Capture for PixelBuffer {
    fn capture(&mut self) -> Result<PixelBuffer, Error> {
        Ok(self.clone())
    }
}

/// Capture source backed by a decoded image.
pub struct ImageCapture {
    image: DynamicImage,
}

impl ImageCapture {
    pub fn new(image: DynamicImage) -> Self {
        ImageCapture { image }
    }

    /// Decode an image file (PNG, JPEG, GIF or BMP).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|err| {
            Error::InvalidInput(format!("failed to load {}: {}", path.display(), err))
        })?;
        debug!("loaded {} ({}x{})", path.display(), image.width(), image.height());
        Ok(Self::new(image))
    }
}

impl Capture for ImageCapture {
    fn capture(&mut self) -> Result<PixelBuffer, Error> {
        let (width, height) = (self.image.width(), self.image.height());
        if width == 0 || height == 0 {
            return Err(Error::CaptureInvalid { width, height });
        }
        let rgba = self.image.to_rgba8();
        PixelBuffer::new(width, height, rgba.into_raw())
    }
}
