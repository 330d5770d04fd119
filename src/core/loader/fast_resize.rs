//! SIMD-accelerated downscaling for the reduced decode modes.
//!
//! Uses fast_image_resize with a box filter, so every output pixel is the
//! average of the source pixels it covers.

use crate::core::frame::DecodedImage;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

/// Reusable downscaler
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Shrink both axes by `factor`, never below one pixel.
    ///
    /// A factor of 1 returns the image unchanged.
    pub fn downscale(&mut self, image: DecodedImage, factor: u32) -> Result<DecodedImage, String> {
        if factor <= 1 {
            return Ok(image);
        }

        let (width, height, channels) = (image.width(), image.height(), image.channels());
        let target_width = (width / factor).max(1);
        let target_height = (height / factor).max(1);
        if target_width == width && target_height == height {
            return Ok(image);
        }

        let pixel_type = match channels {
            1 => PixelType::U8,
            3 => PixelType::U8x3,
            other => return Err(format!("cannot resize {}-channel image", other)),
        };

        let src = Image::from_vec_u8(width, height, image.into_raw(), pixel_type)
            .map_err(|e| format!("Failed to create source image: {}", e))?;
        let mut dst = Image::new(target_width, target_height, pixel_type);

        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
        self.resizer
            .resize(&src, &mut dst, &options)
            .map_err(|e| format!("Resize failed: {}", e))?;

        DecodedImage::from_raw(target_width, target_height, channels, dst.into_vec())
            .ok_or_else(|| "resized buffer has unexpected size".to_string())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[(x * 2) as u8, (y * 2) as u8, 50]);
            }
        }
        DecodedImage::from_raw(width, height, 3, pixels).unwrap()
    }

    #[test]
    fn quarter_scale_dimensions() {
        let resized = FastResizer::new().downscale(gradient(100, 60), 4).unwrap();
        assert_eq!((resized.width(), resized.height(), resized.channels()), (25, 15, 3));
    }

    #[test]
    fn tiny_image_keeps_one_pixel() {
        let image = DecodedImage::filled(3, 2, &[42]).unwrap();
        let resized = FastResizer::new().downscale(image, 8).unwrap();

        assert_eq!((resized.width(), resized.height()), (1, 1));
        assert!(resized.as_bytes()[0].abs_diff(42) <= 1);
    }

    #[test]
    fn factor_one_is_identity() {
        let image = gradient(10, 10);
        let resized = FastResizer::new().downscale(image.clone(), 1).unwrap();
        assert_eq!(resized, image);
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let image = DecodedImage::filled(64, 64, &[90, 120, 150]).unwrap();
        let resized = FastResizer::new().downscale(image, 2).unwrap();

        let expected = [90u8, 120, 150];
        assert!(resized
            .as_bytes()
            .chunks(3)
            .all(|p| p.iter().zip(expected).all(|(a, b)| a.abs_diff(b) <= 1)));
    }
}
