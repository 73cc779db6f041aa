//! RGBA source buffers and nearest-neighbor resizing to the print head width.

use log::debug;

use crate::error::Error;

/// Dense row-major RGBA image, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA samples.
    ///
    /// Fails with [`Error::InvalidInput`] if a dimension is zero or
    /// `samples.len() != width * height * 4`.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "pixel buffer must not be empty, got {}x{}",
                width, height
            )));
        }
        let expected = width as usize * height as usize * 4;
        if samples.len() != expected {
            return Err(Error::InvalidInput(format!(
                "expected {} RGBA bytes for {}x{}, got {}",
                expected,
                width,
                height,
                samples.len()
            )));
        }
        Ok(PixelBuffer {
            width,
            height,
            samples,
        })
    }

    /// A buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, Error> {
        let count = width as usize * height as usize;
        Self::new(width, height, rgba.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// RGBA value at (x, y). Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.samples[i],
            self.samples[i + 1],
            self.samples[i + 2],
            self.samples[i + 3],
        ]
    }
}

/// Height of `src` once scaled to `target_width`: `round(height * target_width / width)`,
/// at least 1.
pub fn target_height(src: &PixelBuffer, target_width: u32) -> u64 {
    let (sw, sh) = (src.width as u64, src.height as u64);
    let tw = target_width as u64;
    // round-half-up in integer arithmetic
    ((sh * tw * 2 + sw) / (sw.max(1) * 2)).max(1)
}

/// Nearest-neighbor resize to `target_width`, keeping the aspect ratio.
///
/// The output height is `round(height * target_width / width)`, at least 1.
/// No smoothing is applied, so hard black/white edges stay hard.
pub fn resize(src: &PixelBuffer, target_width: u32) -> Result<PixelBuffer, Error> {
    if src.width == 0 || target_width == 0 {
        return Err(Error::InvalidInput(format!(
            "cannot resize {} px wide image to {} px",
            src.width, target_width
        )));
    }

    let (sw, sh) = (src.width as u64, src.height as u64);
    let tw = target_width as u64;
    let th = target_height(src, target_width);
    let height = u32::try_from(th).map_err(|_| {
        Error::InvalidInput(format!("resized height {} does not fit in 32 bits", th))
    })?;

    let mut samples = Vec::with_capacity((tw * th * 4) as usize);
    for y in 0..th {
        let sy = (y * sh / th).min(sh - 1);
        let row = (sy * sw * 4) as usize;
        for x in 0..tw {
            let sx = (x * sw / tw).min(sw - 1);
            let i = row + (sx * 4) as usize;
            samples.extend_from_slice(&src.samples[i..i + 4]);
        }
    }

    debug!(
        "resized {}x{} -> {}x{}",
        src.width, src.height, target_width, th
    );

    PixelBuffer::new(target_width, height, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(width: u32, height: u32) -> PixelBuffer {
        let mut samples = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 0 } else { 255 };
                samples.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::new(width, height, samples).unwrap()
    }

    #[test]
    fn rejects_mismatched_sample_count() {
        assert!(matches!(
            PixelBuffer::new(2, 2, vec![0; 15]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            PixelBuffer::new(0, 2, vec![]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_zero_target_width() {
        let src = checkerboard(4, 4);
        assert!(matches!(resize(&src, 0), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn output_dimensions_follow_aspect_ratio() {
        for &(w, h, target) in &[
            (1, 1, 384),
            (3, 7, 384),
            (640, 480, 576),
            (1000, 1, 384),
            (7, 1000, 8),
            (384, 100, 384),
        ] {
            let out = resize(&checkerboard(w, h), target).unwrap();
            assert_eq!(out.width(), target);
            let exact = h as f64 * target as f64 / w as f64;
            assert!(
                (out.height() as f64 - exact).abs() <= 1.0,
                "{}x{} -> {}: got height {}, expected ~{}",
                w,
                h,
                target,
                out.height(),
                exact
            );
            assert!(out.height() >= 1);
        }
    }

    #[test]
    fn target_height_matches_resize() {
        let src = checkerboard(40, 20);
        assert_eq!(target_height(&src, 384), 192);
        assert_eq!(resize(&src, 384).unwrap().height(), 192);
        assert_eq!(target_height(&checkerboard(1, 200), 384), 76800);
    }

    #[test]
    fn very_wide_image_keeps_one_row() {
        let out = resize(&checkerboard(2000, 1), 8).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn upscale_duplicates_pixels_without_blending() {
        let src = checkerboard(2, 1);
        let out = resize(&src, 4).unwrap();
        assert_eq!(out.height(), 2);
        for y in 0..2 {
            assert_eq!(out.pixel(0, y), [0, 0, 0, 255]);
            assert_eq!(out.pixel(1, y), [0, 0, 0, 255]);
            assert_eq!(out.pixel(2, y), [255, 255, 255, 255]);
            assert_eq!(out.pixel(3, y), [255, 255, 255, 255]);
        }
    }

    #[test]
    fn same_width_is_identity() {
        let src = checkerboard(5, 3);
        assert_eq!(resize(&src, 5).unwrap(), src);
    }
}
