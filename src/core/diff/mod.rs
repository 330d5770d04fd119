//! # Difference Engine
//!
//! Turns two equally shaped frames into a motion percentage.
//!
//! ## Algorithm
//! 1. Reject frames whose width, height or channel count differ
//! 2. Optionally smooth both frames (3x3 Gaussian or box)
//! 3. Visit `(x, y)` with step `spatial_stride` on both axes
//! 4. Count a sample as changed when the fused luminance (RGB frames in
//!    fused mode) or any channel (otherwise) differs by strictly more than
//!    `pixel_threshold`
//! 5. Report `100 * changed / sampled`, or 0 when nothing was sampled
//!
//! Every sample goes through a checked pixel lookup. A lookup that falls
//! outside the buffer is skipped and counted neither as changed nor sampled.

mod luminance;
mod smoothing;

pub use luminance::{any_channel_changed, luma, luminance_changed};
pub use smoothing::{Smoother, DEFAULT_PIXEL_CEILING};

use crate::core::frame::DecodedImage;
use crate::core::params::{ChannelMode, MotionParameters};
use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Counters from one comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Samples whose difference exceeded the threshold
    pub changed: u64,
    /// Samples actually compared
    pub sampled: u64,
    /// Samples dropped by the bounds check
    pub skipped: u64,
    /// `100 * changed / sampled`, in `[0, 100]`
    pub motion_percent: f64,
}

/// Pixel comparison with a configurable smoothing pre-pass
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferenceEngine {
    smoother: Smoother,
}

impl DifferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_smoother(smoother: Smoother) -> Self {
        Self { smoother }
    }

    /// Compare two frames under `params`
    pub fn compare(
        &self,
        a: &DecodedImage,
        b: &DecodedImage,
        params: &MotionParameters,
    ) -> Result<DiffStats, CompareError> {
        if a.shape() != b.shape() {
            return Err(CompareError::DimensionMismatch {
                first: a.shape(),
                second: b.shape(),
            });
        }

        let (a, b) = if params.smoothing.is_enabled() {
            (
                Cow::Owned(self.smoother.smooth(a, params.smoothing)),
                Cow::Owned(self.smoother.smooth(b, params.smoothing)),
            )
        } else {
            (Cow::Borrowed(a), Cow::Borrowed(b))
        };

        let stats = count_changes(&a, &b, params);
        if stats.skipped > 0 {
            tracing::debug!(skipped = stats.skipped, "Skipped out-of-range samples");
        }
        Ok(stats)
    }
}

/// Compare with the default smoother
pub fn compare(
    a: &DecodedImage,
    b: &DecodedImage,
    params: &MotionParameters,
) -> Result<DiffStats, CompareError> {
    DifferenceEngine::new().compare(a, b, params)
}

fn count_changes(a: &DecodedImage, b: &DecodedImage, params: &MotionParameters) -> DiffStats {
    let stride = params.spatial_stride.max(1) as usize;
    let threshold = params.pixel_threshold;
    let fused = params.channel_mode == ChannelMode::FusedLuminance && a.channels() == 3;

    let mut stats = DiffStats::default();
    for y in (0..a.height()).step_by(stride) {
        for x in (0..a.width()).step_by(stride) {
            let (Some(pa), Some(pb)) = (a.pixel(x, y), b.pixel(x, y)) else {
                stats.skipped += 1;
                continue;
            };
            stats.sampled += 1;

            let changed = if fused {
                luminance_changed(pa, pb, threshold)
            } else {
                any_channel_changed(pa, pb, threshold)
            };
            if changed {
                stats.changed += 1;
            }
        }
    }

    stats.motion_percent = if stats.sampled == 0 {
        0.0
    } else {
        100.0 * stats.changed as f64 / stats.sampled as f64
    };
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::FrameShape;
    use crate::core::params::Smoothing;

    fn solid(width: u32, height: u32, pixel: &[u8]) -> DecodedImage {
        DecodedImage::filled(width, height, pixel).unwrap()
    }

    fn params() -> MotionParameters {
        MotionParameters::default()
    }

    #[test]
    fn identical_frames_have_no_motion() {
        let a = solid(16, 9, &[30, 60, 90]);
        let stats = compare(&a, &a.clone(), &params()).unwrap();

        assert_eq!(stats.changed, 0);
        assert_eq!(stats.sampled, 144);
        assert_eq!(stats.motion_percent, 0.0);
    }

    #[test]
    fn red_vs_blue_is_full_motion() {
        let red = solid(64, 48, &[255, 0, 0]);
        let blue = solid(64, 48, &[0, 0, 255]);
        let stats = compare(&red, &blue, &params()).unwrap();

        assert_eq!(stats.motion_percent, 100.0);
    }

    #[test]
    fn mismatch_is_reported_before_sampling() {
        let a = solid(10, 10, &[0, 0, 0]);
        let b = solid(10, 11, &[0, 0, 0]);
        let gray = solid(10, 10, &[0]);

        let error = compare(&a, &b, &params()).unwrap_err();
        let CompareError::DimensionMismatch { first, second } = error;
        assert_eq!(first, FrameShape::new(10, 10, 3));
        assert_eq!(second, FrameShape::new(10, 11, 3));

        assert!(compare(&a, &gray, &params()).is_err());
    }

    #[test]
    fn stride_sample_count_is_ceiling_product() {
        let a = solid(10, 7, &[1]);
        for stride in 1..=12 {
            let p = MotionParameters::builder().spatial_stride(stride).build();
            let stats = compare(&a, &a, &p).unwrap();
            let expected = 10u64.div_ceil(stride as u64) * 7u64.div_ceil(stride as u64);
            assert_eq!(stats.sampled, expected, "stride {}", stride);
        }
    }

    #[test]
    fn threshold_is_strict() {
        let a = solid(4, 4, &[100]);
        let b = solid(4, 4, &[125]);

        let at = MotionParameters::builder().pixel_threshold(25).build();
        let below = MotionParameters::builder().pixel_threshold(24).build();
        assert_eq!(compare(&a, &b, &at).unwrap().changed, 0);
        assert_eq!(compare(&a, &b, &below).unwrap().changed, 16);
    }

    #[test]
    fn half_changed_frame_reports_fifty_percent() {
        let a = solid(8, 8, &[0]);
        let mut b = a.clone();
        for y in 0..8 {
            for x in 0..4 {
                b.pixel_mut(x, y).unwrap()[0] = 200;
            }
        }
        let stats = compare(&a, &b, &params()).unwrap();
        assert_eq!(stats.motion_percent, 50.0);
    }

    #[test]
    fn per_channel_sees_chroma_change() {
        // Swapping red and green keeps luma close but moves two channels
        let a = solid(4, 4, &[120, 130, 50]);
        let b = solid(4, 4, &[130, 120, 50]);

        let fused = compare(&a, &b, &params()).unwrap();
        let per_channel = MotionParameters::builder()
            .channel_mode(ChannelMode::PerChannel)
            .pixel_threshold(5)
            .build();

        assert_eq!(fused.changed, 0);
        assert_eq!(compare(&a, &b, &per_channel).unwrap().changed, 16);
    }

    #[test]
    fn fused_mode_on_grayscale_uses_the_single_channel() {
        let a = solid(4, 4, &[10]);
        let b = solid(4, 4, &[100]);
        assert_eq!(compare(&a, &b, &params()).unwrap().motion_percent, 100.0);
    }

    #[test]
    fn smoothing_suppresses_isolated_noise() {
        let a = solid(9, 9, &[100]);
        let mut b = a.clone();
        b.pixel_mut(4, 4).unwrap()[0] = 140;

        let raw = compare(&a, &b, &params()).unwrap();
        let smoothed = MotionParameters::builder()
            .smoothing(Smoothing::Gaussian)
            .build();

        assert_eq!(raw.changed, 1);
        assert_eq!(compare(&a, &b, &smoothed).unwrap().changed, 0);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = solid(12, 12, &[10, 20, 30]);
        let mut b = a.clone();
        b.pixel_mut(3, 3).unwrap().copy_from_slice(&[200, 200, 200]);
        b.pixel_mut(7, 2).unwrap().copy_from_slice(&[0, 90, 0]);

        for mode in [ChannelMode::FusedLuminance, ChannelMode::PerChannel] {
            let p = MotionParameters::builder().channel_mode(mode).build();
            assert_eq!(
                compare(&a, &b, &p).unwrap().motion_percent,
                compare(&b, &a, &p).unwrap().motion_percent
            );
        }
    }

    #[test]
    fn empty_sampling_reports_zero() {
        let stats = count_changes(&solid(0, 0, &[0]), &solid(0, 0, &[0]), &params());
        assert_eq!(stats.sampled, 0);
        assert_eq!(stats.motion_percent, 0.0);
    }
}
