//! Multi-stage confirmation: cheap checks first, expensive ones only when
//! the cheap ones see something.

use super::executor::MotionDetector;
use super::result::{ComparisonResult, Decision};
use crate::core::params::{DecodeMode, MotionParameters};
use crate::error::MotionError;
use crate::events::{null_sender, EventSender, PipelineEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An ordered list of comparison stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cascade {
    stages: Vec<MotionParameters>,
}

/// Every stage that ran, in order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    pub stages: Vec<ComparisonResult>,
    /// Stages configured, including those that never ran
    pub total_stages: usize,
}

impl CascadeResult {
    /// The last executed stage decides
    pub fn decision(&self) -> Decision {
        self.final_result()
            .map(|r| r.decision)
            .unwrap_or(Decision::NoMotion)
    }

    pub fn final_result(&self) -> Option<&ComparisonResult> {
        self.stages.last()
    }

    /// True when a stage short-circuited the rest
    pub fn stopped_early(&self) -> bool {
        self.stages.len() < self.total_stages
    }
}

impl Cascade {
    /// Build a cascade from explicit stages
    pub fn new(stages: Vec<MotionParameters>) -> Result<Self, MotionError> {
        if stages.is_empty() {
            return Err(MotionError::Config(
                "a cascade needs at least one stage".to_string(),
            ));
        }
        Ok(Self { stages })
    }

    /// File-size gate, then a reduced-fidelity pass, then full resolution.
    ///
    /// `reduced` and `full` are used as given except that their file-size
    /// flag is cleared.
    pub fn standard(
        size_threshold_percent: f64,
        reduced: MotionParameters,
        full: MotionParameters,
    ) -> Self {
        let mut reduced = reduced;
        let mut full = full;
        reduced.file_size_only = false;
        full.file_size_only = false;
        Self {
            stages: vec![MotionParameters::file_size(size_threshold_percent), reduced, full],
        }
    }

    pub fn stages(&self) -> &[MotionParameters] {
        &self.stages
    }

    pub fn run(&self, detector: &MotionDetector, a: &Path, b: &Path) -> CascadeResult {
        self.run_with_events(detector, a, b, &null_sender())
    }

    /// Run stages in order, stopping at the first `NoMotion` or `Error`
    pub fn run_with_events(
        &self,
        detector: &MotionDetector,
        a: &Path,
        b: &Path,
        events: &EventSender,
    ) -> CascadeResult {
        let total_stages = self.stages.len();
        let mut results = Vec::with_capacity(total_stages);

        for (index, params) in self.stages.iter().enumerate() {
            let stage = index + 1;
            let description = describe(params);
            tracing::debug!(stage, total_stages, %description, "Cascade stage");
            events.pipeline(PipelineEvent::StageStarted {
                stage,
                total_stages,
                description,
            });

            let result = detector.run_with_events(a, b, params, events);
            events.pipeline(PipelineEvent::StageFinished {
                stage,
                decision: result.decision,
                motion_percent: result.motion_percent,
            });

            let decision = result.decision;
            results.push(result);
            if decision != Decision::Motion {
                break;
            }
        }

        CascadeResult {
            stages: results,
            total_stages,
        }
    }
}

impl Default for Cascade {
    fn default() -> Self {
        Self::standard(
            5.0,
            MotionParameters::builder()
                .decode_mode(DecodeMode::Quarter)
                .spatial_stride(2)
                .build(),
            MotionParameters::default(),
        )
    }
}

fn describe(params: &MotionParameters) -> String {
    if params.file_size_only {
        format!("file size, {}% threshold", params.file_size_threshold_percent)
    } else {
        format!(
            "{}, stride {}, {}% threshold",
            params.decode_mode, params.spatial_stride, params.motion_percent_threshold
        )
    }
}
