//! # Parameters Module
//!
//! The immutable configuration for one comparison run.
//!
//! ## Example
//! ```rust,ignore
//! use frame_motion::core::params::{MotionParameters, ChannelMode, DecodeMode};
//!
//! let params = MotionParameters::builder()
//!     .pixel_threshold(30)
//!     .spatial_stride(2)
//!     .channel_mode(ChannelMode::PerChannel)
//!     .decode_mode(DecodeMode::Quarter)
//!     .build();
//! ```

use serde::{Deserialize, Serialize};

/// Requested output fidelity for an image load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecodeMode {
    /// Native resolution
    #[default]
    Full,
    /// Both axes halved
    Half,
    /// Both axes quartered
    Quarter,
    /// Both axes divided by eight
    Eighth,
    /// One pixel per 8x8 JPEG block, from the DC coefficient only
    DcOnly,
}

impl DecodeMode {
    /// Linear downscale factor applied to each axis
    pub fn scale_factor(&self) -> u32 {
        match self {
            DecodeMode::Full => 1,
            DecodeMode::Half => 2,
            DecodeMode::Quarter => 4,
            DecodeMode::Eighth | DecodeMode::DcOnly => 8,
        }
    }

    /// What to try when an image is too large for this mode
    pub fn larger_image_hint(&self) -> &'static str {
        match self {
            DecodeMode::Full => "Try DC-only mode (-d) or a reduced decode mode",
            DecodeMode::Half | DecodeMode::Quarter => {
                "Try DC-only mode (-d) or reduce the image size"
            }
            DecodeMode::Eighth | DecodeMode::DcOnly => "Reduce the image size",
        }
    }
}

impl std::fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeMode::Full => write!(f, "full resolution"),
            DecodeMode::Half => write!(f, "1/2 scale"),
            DecodeMode::Quarter => write!(f, "1/4 scale"),
            DecodeMode::Eighth => write!(f, "1/8 scale"),
            DecodeMode::DcOnly => write!(f, "DC-only"),
        }
    }
}

/// How pixels are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Fuse RGB into one integer luminance value (falls back to per-channel
    /// for single-channel frames)
    #[default]
    FusedLuminance,
    /// A pixel changed if any channel changed
    PerChannel,
}

impl std::fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelMode::FusedLuminance => write!(f, "fused luminance"),
            ChannelMode::PerChannel => write!(f, "per channel"),
        }
    }
}

/// Optional 3x3 noise-reduction pre-pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Smoothing {
    #[default]
    Off,
    /// `[1,2,1; 2,4,2; 1,2,1] / 16`
    Gaussian,
    /// Uniform 3x3 average
    Box,
}

impl Smoothing {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Smoothing::Off)
    }
}

impl std::fmt::Display for Smoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Smoothing::Off => write!(f, "off"),
            Smoothing::Gaussian => write!(f, "3x3 gaussian"),
            Smoothing::Box => write!(f, "3x3 box"),
        }
    }
}

/// Configuration for one comparison run.
///
/// Numeric fields are clamped by [`MotionParametersBuilder::build`], so a
/// constructed value is always in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParameters {
    /// Minimum per-pixel difference counted as changed (strictly greater)
    pub pixel_threshold: u8,
    /// Sample every Nth pixel on each axis
    pub spatial_stride: u32,
    /// Percentage of sampled pixels that must change to report motion
    pub motion_percent_threshold: f64,
    pub channel_mode: ChannelMode,
    pub smoothing: Smoothing,
    pub decode_mode: DecodeMode,
    /// Compare file sizes only, never decode
    pub file_size_only: bool,
    /// Content-size change percentage that counts as motion in file-size mode
    pub file_size_threshold_percent: f64,
    /// Fail with `DcIncompatible` instead of falling back to a full decode
    pub strict_dc: bool,
}

impl MotionParameters {
    /// Create a builder with default values
    pub fn builder() -> MotionParametersBuilder {
        MotionParametersBuilder::new()
    }

    /// Parameters for a file-size-only pre-screen
    pub fn file_size(threshold_percent: f64) -> Self {
        Self::builder()
            .file_size_only(true)
            .file_size_threshold_percent(threshold_percent)
            .build()
    }
}

impl Default for MotionParameters {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`MotionParameters`]
#[derive(Debug, Clone)]
pub struct MotionParametersBuilder {
    pixel_threshold: i64,
    spatial_stride: i64,
    motion_percent_threshold: f64,
    channel_mode: ChannelMode,
    smoothing: Smoothing,
    decode_mode: DecodeMode,
    file_size_only: bool,
    file_size_threshold_percent: f64,
    strict_dc: bool,
}

impl MotionParametersBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            pixel_threshold: 25,
            spatial_stride: 1,
            motion_percent_threshold: 1.0,
            channel_mode: ChannelMode::FusedLuminance,
            smoothing: Smoothing::Off,
            decode_mode: DecodeMode::Full,
            file_size_only: false,
            file_size_threshold_percent: 5.0,
            strict_dc: false,
        }
    }

    /// Per-pixel sensitivity (clamped to 0-255)
    pub fn pixel_threshold(mut self, threshold: i64) -> Self {
        self.pixel_threshold = threshold;
        self
    }

    /// Sampling step in pixels (clamped to at least 1)
    ///
    /// Work drops quadratically: stride 2 samples a quarter of the pixels.
    pub fn spatial_stride(mut self, stride: i64) -> Self {
        self.spatial_stride = stride;
        self
    }

    pub fn motion_percent_threshold(mut self, percent: f64) -> Self {
        self.motion_percent_threshold = percent;
        self
    }

    pub fn channel_mode(mut self, mode: ChannelMode) -> Self {
        self.channel_mode = mode;
        self
    }

    pub fn smoothing(mut self, smoothing: Smoothing) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    pub fn file_size_only(mut self, enabled: bool) -> Self {
        self.file_size_only = enabled;
        self
    }

    pub fn file_size_threshold_percent(mut self, percent: f64) -> Self {
        self.file_size_threshold_percent = percent;
        self
    }

    pub fn strict_dc(mut self, strict: bool) -> Self {
        self.strict_dc = strict;
        self
    }

    /// Clamp every field into range and freeze the parameters
    pub fn build(self) -> MotionParameters {
        MotionParameters {
            pixel_threshold: self.pixel_threshold.clamp(0, 255) as u8,
            spatial_stride: self.spatial_stride.clamp(1, u32::MAX as i64) as u32,
            motion_percent_threshold: non_negative(self.motion_percent_threshold),
            channel_mode: self.channel_mode,
            smoothing: self.smoothing,
            decode_mode: self.decode_mode,
            file_size_only: self.file_size_only,
            file_size_threshold_percent: non_negative(self.file_size_threshold_percent),
            strict_dc: self.strict_dc,
        }
    }
}

impl Default for MotionParametersBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}
