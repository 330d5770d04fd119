//! 3x3 smoothing pre-pass.
//!
//! Each channel is convolved independently. The outermost one-pixel ring
//! is copied through unchanged because it has no full neighbourhood.
//!
//! Images above the pixel ceiling are returned as an unmodified copy. This
//! is a deliberate degraded mode for constrained devices: the comparison
//! still runs, just without noise reduction.

use crate::core::frame::DecodedImage;
use crate::core::params::Smoothing;

/// Largest image (in pixels) that will be convolved: 8K UHD
pub const DEFAULT_PIXEL_CEILING: u64 = 7680 * 4320;

const GAUSSIAN: [u32; 9] = [1, 2, 1, 2, 4, 2, 1, 2, 1];
const BOX: [u32; 9] = [1; 9];

#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    pixel_ceiling: u64,
}

impl Smoother {
    pub fn new() -> Self {
        Self {
            pixel_ceiling: DEFAULT_PIXEL_CEILING,
        }
    }

    pub fn with_pixel_ceiling(pixel_ceiling: u64) -> Self {
        Self { pixel_ceiling }
    }

    pub fn pixel_ceiling(&self) -> u64 {
        self.pixel_ceiling
    }

    /// Return a smoothed copy of `image` with the same shape.
    pub fn smooth(&self, image: &DecodedImage, kind: Smoothing) -> DecodedImage {
        let kernel = match kind {
            Smoothing::Off => return image.clone(),
            Smoothing::Gaussian => &GAUSSIAN,
            Smoothing::Box => &BOX,
        };

        let pixels = image.shape().pixel_count();
        if pixels > self.pixel_ceiling {
            tracing::warn!(
                pixels,
                ceiling = self.pixel_ceiling,
                "Image too large for smoothing, comparing unsmoothed"
            );
            return image.clone();
        }

        let (width, height) = (image.width() as usize, image.height() as usize);
        if width < 3 || height < 3 {
            return image.clone();
        }

        let mut out = image.clone();

        for y in 1..height as u32 - 1 {
            for x in 1..width as u32 - 1 {
                let Some(target) = out.pixel_mut(x, y) else {
                    continue;
                };
                for (c, value) in target.iter_mut().enumerate() {
                    let Some(sum) = weighted_sum(image, kernel, x, y, c) else {
                        continue;
                    };
                    *value = match kind {
                        Smoothing::Box => (sum / 9) as u8,
                        _ => ((sum + 8) >> 4) as u8,
                    };
                }
            }
        }

        out
    }
}

/// Kernel-weighted sum of channel `c` over the 3x3 neighbourhood of
/// `(x, y)`; `None` if any neighbour is out of range.
fn weighted_sum(image: &DecodedImage, kernel: &[u32; 9], x: u32, y: u32, c: usize) -> Option<u32> {
    kernel.iter().enumerate().try_fold(0u32, |sum, (k, weight)| {
        let nx = (x + k as u32 % 3).checked_sub(1)?;
        let ny = (y + k as u32 / 3).checked_sub(1)?;
        let sample = *image.pixel(nx, ny)?.get(c)?;
        Some(sum + weight * sample as u32)
    })
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new()
    }
}
