//! Alpha compositing over white paper and reduction to luminance.

use log::debug;

use crate::raster::PixelBuffer;

const WEIGHT_R: f32 = 0.299;
const WEIGHT_G: f32 = 0.587;
const WEIGHT_B: f32 = 0.114;

/// Row-major luminance values in `[0, 255]`, 0 = black.
///
/// The dithering pass consumes this buffer and accumulates error into it,
/// so once handed over its original values are gone.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleBuffer {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) values: Vec<f32>,
}

impl GrayscaleBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Composite every pixel over opaque white, then apply the Rec. 601 weights.
///
/// Fully transparent pixels come out as 255 regardless of their color, so
/// empty regions of a capture print as blank paper.
pub fn to_grayscale(px: &PixelBuffer) -> GrayscaleBuffer {
    let values: Vec<f32> = px
        .samples()
        .chunks_exact(4)
        .map(|p| {
            let alpha = p[3] as f32 / 255.0;
            let over_white = |c: u8| c as f32 * alpha + 255.0 * (1.0 - alpha);
            WEIGHT_R * over_white(p[0]) + WEIGHT_G * over_white(p[1]) + WEIGHT_B * over_white(p[2])
        })
        .collect();

    debug!("grayscale {}x{}", px.width(), px.height());

    GrayscaleBuffer {
        width: px.width(),
        height: px.height(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all(gray: &GrayscaleBuffer, expected: f32, tolerance: f32) {
        for (i, &v) in gray.values().iter().enumerate() {
            assert!(
                (v - expected).abs() <= tolerance,
                "value {} at {} is not ~{}",
                v,
                i,
                expected
            );
        }
    }

    #[test]
    fn opaque_white_is_255() {
        let px = PixelBuffer::filled(4, 3, [255, 255, 255, 255]).unwrap();
        assert_all(&to_grayscale(&px), 255.0, 1e-3);
    }

    #[test]
    fn opaque_black_is_0() {
        let px = PixelBuffer::filled(4, 3, [0, 0, 0, 255]).unwrap();
        let gray = to_grayscale(&px);
        assert!(gray.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn half_transparent_black_is_mid_gray() {
        let px = PixelBuffer::filled(2, 2, [0, 0, 0, 128]).unwrap();
        assert_all(&to_grayscale(&px), 127.5, 1.0);
    }

    #[test]
    fn transparent_pixels_print_white_whatever_their_color() {
        let px = PixelBuffer::filled(2, 1, [0, 0, 0, 0]).unwrap();
        assert_all(&to_grayscale(&px), 255.0, 1e-3);
    }

    #[test]
    fn uses_perceptual_weights() {
        let px = PixelBuffer::new(3, 1, vec![255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255]).unwrap();
        let gray = to_grayscale(&px);
        assert!((gray.values()[0] - 0.299 * 255.0).abs() < 1e-2);
        assert!((gray.values()[1] - 0.587 * 255.0).abs() < 1e-2);
        assert!((gray.values()[2] - 0.114 * 255.0).abs() < 1e-2);
    }
}
