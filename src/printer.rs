use log::{debug, info};

use crate::{
    capture::Capture,
    command::{frame, CommandBuffer},
    dither::dither,
    error::Error,
    luminance::to_grayscale,
    pack::pack,
    raster::{resize, target_height, PixelBuffer},
    transport::TransportHandle,
    DOT_WIDTH_58MM,
};

/// Widest row the raster command can describe, in dots.
const MAX_DOT_WIDTH: u32 = 0xFFFF * 8;

/// Most rows the raster command can describe.
const MAX_ROWS: u64 = u16::MAX as u64;

/// Print parameters.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    dot_width: u32,
    mode: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config::new(DOT_WIDTH_58MM)
    }
}

impl Config {
    /// Initialize configuration for a print head `dot_width` dots wide.
    ///
    /// # Example
    ///
    /// ```
    /// use thermal_raster::{Config, DOT_WIDTH_80MM};
    ///
    /// let config = Config::new(DOT_WIDTH_80MM).mode(1);
    /// assert_eq!(config.dot_width(), 576);
    /// ```
    ///
    pub fn new(dot_width: u32) -> Config {
        Config { dot_width, mode: 0 }
    }

    /// Density/size mode byte of the raster command. Printer specific.
    pub fn mode(self, mode: u8) -> Self {
        Config { mode, ..self }
    }

    pub fn dot_width(&self) -> u32 {
        self.dot_width
    }

    pub fn mode_byte(&self) -> u8 {
        self.mode
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.dot_width == 0 || self.dot_width > MAX_DOT_WIDTH {
            return Err(Error::InvalidInput(format!(
                "dot width must be between 1 and {}, got {}",
                MAX_DOT_WIDTH, self.dot_width
            )));
        }
        Ok(())
    }
}

/// Encode `pixels` into a raster command for the configured printer.
///
/// Resize, convert to luminance, dither, pack and frame, in that order.
pub fn render(pixels: PixelBuffer, config: &Config) -> Result<CommandBuffer, Error> {
    config.validate()?;
    debug!("{:?}", config);
    let rows = target_height(&pixels, config.dot_width);
    if rows > MAX_ROWS {
        return Err(Error::InvalidInput(format!(
            "{}x{} image scales to {} rows at {} dots, more than {}",
            pixels.width(),
            pixels.height(),
            rows,
            config.dot_width,
            MAX_ROWS
        )));
    }
    let resized = resize(&pixels, config.dot_width)?;
    let bits = dither(to_grayscale(&resized));
    frame(pack(&bits), config.mode)
}

/// Capture, encode and send one print.
///
/// The handle is consumed by the send. Nothing is retried; on failure the
/// caller can start over with a new handle.
pub fn print<C: Capture + ?Sized>(
    source: &mut C,
    config: &Config,
    handle: TransportHandle,
) -> Result<(), Error> {
    let pixels = source.capture()?;
    info!(
        "printing {}x{} capture at {} dots",
        pixels.width(),
        pixels.height(),
        config.dot_width
    );
    let command = render(pixels, config)?;
    handle.send(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_58mm_mode_0() {
        let config = Config::default();
        assert_eq!(config.dot_width(), 384);
        assert_eq!(config.mode_byte(), 0);
    }

    #[test]
    fn zero_width_is_invalid() {
        let pixels = PixelBuffer::filled(8, 1, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            render(pixels, &Config::new(0)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn too_tall_capture_is_rejected_before_resizing() {
        // 1x200 at 384 dots would be 76800 rows
        let pixels = PixelBuffer::filled(1, 200, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            render(pixels, &Config::new(384)),
            Err(Error::InvalidInput(_))
        ));

        // would need over a terabyte if resized first
        let pixels = PixelBuffer::filled(1, 2_000_000, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            render(pixels, &Config::new(384)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn tallest_describable_capture_still_renders() {
        let pixels = PixelBuffer::filled(1, 0xFFFF, [255, 255, 255, 255]).unwrap();
        let cmd = render(pixels, &Config::new(1)).unwrap();
        assert_eq!(cmd.header(), &[0x1D, 0x76, 0x30, 0x00, 0x01, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn black_row_renders_to_ff() {
        let pixels = PixelBuffer::filled(8, 1, [0, 0, 0, 255]).unwrap();
        let cmd = render(pixels, &Config::new(8)).unwrap();
        assert_eq!(cmd.as_bytes(), &[0x1D, 0x76, 0x30, 0x00, 0x01, 0x00, 0x01, 0x00, 0xFF]);
    }

    #[test]
    fn white_row_renders_to_00() {
        let pixels = PixelBuffer::filled(8, 1, [255, 255, 255, 255]).unwrap();
        let cmd = render(pixels, &Config::new(8).mode(2)).unwrap();
        assert_eq!(cmd.as_bytes(), &[0x1D, 0x76, 0x30, 0x02, 0x01, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn capture_errors_stop_the_print() {
        struct Empty;
        impl Capture for Empty {
            fn capture(&mut self) -> Result<PixelBuffer, Error> {
                Err(Error::CaptureInvalid {
                    width: 0,
                    height: 0,
                })
            }
        }
        let handle = TransportHandle::Relay(crate::transport::RelaySocket::new("ws://127.0.0.1:1"));
        assert!(matches!(
            print(&mut Empty, &Config::default(), handle),
            Err(Error::CaptureInvalid { .. })
        ));
    }
}
