//! Outcome types for one comparison.

use crate::core::frame::FrameShape;
use crate::core::params::{DecodeMode, MotionParameters};
use crate::core::prescreen::SizeComparison;
use crate::error::{ErrorKind, MotionError};
use serde::{Deserialize, Serialize};

/// Ternary verdict of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    NoMotion,
    Motion,
    Error,
}

impl Decision {
    /// Process exit code: 0 no motion, 1 motion, 2 error
    pub fn exit_code(&self) -> u8 {
        match self {
            Decision::NoMotion => 0,
            Decision::Motion => 1,
            Decision::Error => 2,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::NoMotion => write!(f, "NO MOTION"),
            Decision::Motion => write!(f, "MOTION DETECTED"),
            Decision::Error => write!(f, "ERROR"),
        }
    }
}

/// Optional measurements gathered while comparing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Time spent loading both frames (or stat-ing them in file-size mode)
    pub load_ms: f64,
    /// Time spent in smoothing and the difference engine
    pub compute_ms: f64,
    pub total_ms: f64,
    pub pixels_sampled: u64,
    pub pixels_changed: u64,
    /// Samples dropped by the bounds check
    pub pixels_skipped: u64,
    /// Shape both frames were compared at
    pub compared_shape: Option<FrameShape>,
    /// Mode that produced the compared frames
    pub mode_used: Option<DecodeMode>,
    /// A DC-only request was served by a full decode
    pub dc_fallback: bool,
    /// Present in file-size mode
    pub size_comparison: Option<SizeComparison>,
}

impl Diagnostics {
    /// Processing speed in megapixels per second over the compute phase
    pub fn megapixels_per_second(&self) -> Option<f64> {
        let shape = self.compared_shape?;
        if self.compute_ms <= 0.0 {
            return None;
        }
        let megapixels = shape.pixel_count() as f64 / 1_000_000.0;
        Some(megapixels / (self.compute_ms / 1000.0))
    }
}

/// The result of one `run`; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// `None` exactly when `decision` is `Error`
    pub motion_percent: Option<f64>,
    pub decision: Decision,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub parameters: MotionParameters,
    pub diagnostics: Diagnostics,
}

impl ComparisonResult {
    /// A decided outcome. Motion when `percent >= threshold`.
    pub(crate) fn decided(
        percent: f64,
        threshold: f64,
        parameters: MotionParameters,
        diagnostics: Diagnostics,
    ) -> Self {
        let decision = if percent >= threshold {
            Decision::Motion
        } else {
            Decision::NoMotion
        };
        Self {
            motion_percent: Some(percent),
            decision,
            error_kind: None,
            error_message: None,
            parameters,
            diagnostics,
        }
    }

    /// An error outcome; never carries a motion percentage
    pub(crate) fn failed(
        error: &MotionError,
        parameters: MotionParameters,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            motion_percent: None,
            decision: Decision::Error,
            error_kind: Some(error.kind()),
            error_message: Some(error.to_string()),
            parameters,
            diagnostics,
        }
    }

    pub fn is_motion(&self) -> bool {
        self.decision == Decision::Motion
    }

    pub fn exit_code(&self) -> u8 {
        self.decision.exit_code()
    }
}
