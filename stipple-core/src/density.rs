//! Density image preparation: optional integer supersampling plus
//! conversion to 8-bit luminance, and the per-pixel weight function shared
//! by the cell accumulator.

use image::{imageops::FilterType, DynamicImage, GrayImage};

use crate::error::{Error, Result};

/// 8-bit grayscale density image, immutable for the lifetime of one
/// stippling run. Darker pixels carry higher density weight.
#[derive(Debug, Clone)]
pub struct DensityImage {
    gray: GrayImage,
}

impl DensityImage {
    /// Build a density image from a decoded input, upscaling by
    /// `super_sampling_factor` (1, 2 or 3) before converting to grayscale.
    ///
    /// The `image` crate's `Triangle` filter stands in for the reference
    /// tool's `Qt::SmoothTransformation`; both are a smooth, non-nearest
    /// resampling and the stippling result only depends on it through the
    /// coarse per-pixel weight, not on exact resampling kernel choice.
    pub fn prepare(input: &DynamicImage, super_sampling_factor: u32) -> Result<Self> {
        let (w, h) = (input.width(), input.height());
        if w == 0 || h == 0 {
            return Err(Error::EmptyDensity);
        }

        let gray = if super_sampling_factor <= 1 {
            input.to_luma8()
        } else {
            let scaled = input.resize_exact(
                w * super_sampling_factor,
                h * super_sampling_factor,
                FilterType::Triangle,
            );
            scaled.to_luma8()
        };

        Ok(Self { gray })
    }

    /// Wrap an already-prepared 8-bit grayscale buffer directly (used by
    /// tests and callers that build synthetic density images).
    pub fn from_luma(gray: GrayImage) -> Result<Self> {
        if gray.width() == 0 || gray.height() == 0 {
            return Err(Error::EmptyDensity);
        }
        Ok(Self { gray })
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        self.gray.get_pixel(x, y).0[0]
    }

    /// Per-pixel density weight: `max(1 - gray/255, epsilon)`, so no pixel
    /// a cell owns ever contributes exactly zero weight.
    #[inline]
    pub fn weight(&self, x: u32, y: u32) -> f64 {
        let gray = self.luma(x, y) as f64 / 255.0;
        (1.0 - gray).max(f64::EPSILON)
    }

    pub fn as_raw(&self) -> &[u8] {
        self.gray.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_is_high_for_black_and_floored_for_white() {
        let img = GrayImage::from_raw(2, 1, vec![0, 255]).unwrap();
        let density = DensityImage::from_luma(img).unwrap();
        assert!((density.weight(0, 0) - 1.0).abs() < 1e-12);
        assert!(density.weight(1, 0) > 0.0);
        assert!(density.weight(1, 0) <= f64::EPSILON * 1.0001);
    }

    #[test]
    fn prepare_rejects_empty_input() {
        let input = DynamicImage::new_luma8(0, 0);
        let err = DensityImage::prepare(&input, 1).unwrap_err();
        assert!(matches!(err, Error::EmptyDensity));
    }

    #[test]
    fn prepare_supersamples_by_integer_factor() {
        let input = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, image::Luma([128])));
        let density = DensityImage::prepare(&input, 2).unwrap();
        assert_eq!(density.width(), 8);
        assert_eq!(density.height(), 8);
    }
}
