//! Event type definitions for progress reporting.

use crate::core::pipeline::Decision;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Single comparison and cascade events
    Pipeline(PipelineEvent),
    /// Directory batch events
    Batch(BatchEvent),
}

/// Events from one comparison or cascade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A comparison has started
    Started { first: PathBuf, second: PathBuf },
    /// Moving to a new phase of the comparison
    PhaseChanged { phase: PipelinePhase },
    /// A cascade stage is about to run
    StageStarted {
        stage: usize,
        total_stages: usize,
        description: String,
    },
    /// A cascade stage produced its verdict
    StageFinished {
        stage: usize,
        decision: Decision,
        motion_percent: Option<f64>,
    },
    /// The comparison reached a verdict
    Completed {
        decision: Decision,
        motion_percent: Option<f64>,
        duration_ms: u64,
    },
    /// The comparison failed
    Error { message: String },
}

/// Phases of a single comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Prescreen,
    Loading,
    Comparing,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Prescreen => write!(f, "Pre-screening"),
            PipelinePhase::Loading => write!(f, "Loading"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
        }
    }
}

/// Events from a directory batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchEvent {
    /// Frames discovered and pairing done
    Started { total_frames: usize, total_pairs: usize },
    /// A file could not be listed; discovery continues
    DiscoveryError { path: PathBuf, message: String },
    /// One pair finished
    Progress(BatchProgress),
    /// All pairs finished
    Completed {
        pairs: usize,
        motion_count: usize,
        error_count: usize,
        duration_ms: u64,
    },
}

/// Progress information during a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Pairs finished so far
    pub completed: usize,
    pub total: usize,
    /// Second frame of the pair that just finished
    pub current_path: PathBuf,
    pub decision: Decision,
}
