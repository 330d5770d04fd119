//! # Batch Module
//!
//! Compares every consecutive pair of frames in a directory.
//!
//! Frames are discovered with walkdir and sorted by path, so a camera that
//! names snapshots by sequence number or timestamp yields pairs in capture
//! order. Pairs run in parallel on rayon; each pair is an independent
//! comparison with its own buffers.

mod discover;

pub use discover::{discover_frames, FrameFilter};

use crate::core::params::MotionParameters;
use crate::core::pipeline::{ComparisonResult, Decision, MotionDetector};
use crate::error::BatchError;
use crate::events::{null_sender, BatchEvent, BatchProgress, EventSender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// One compared pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub first: PathBuf,
    pub second: PathBuf,
    pub result: ComparisonResult,
}

/// Summary of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// In frame order
    pub pairs: Vec<PairOutcome>,
    pub motion_count: usize,
    pub error_count: usize,
    pub duration_ms: u64,
}

impl BatchReport {
    /// 1 if any pair moved, else 2 if any pair failed, else 0
    pub fn exit_code(&self) -> u8 {
        if self.motion_count > 0 {
            Decision::Motion.exit_code()
        } else if self.error_count > 0 {
            Decision::Error.exit_code()
        } else {
            Decision::NoMotion.exit_code()
        }
    }
}

/// Runs a [`MotionDetector`] over a directory of frames
pub struct BatchRunner {
    detector: MotionDetector,
    params: MotionParameters,
    filter: FrameFilter,
    recursive: bool,
}

impl BatchRunner {
    pub fn new(detector: MotionDetector, params: MotionParameters) -> Self {
        Self {
            detector,
            params,
            filter: FrameFilter::new(),
            recursive: false,
        }
    }

    pub fn filter(mut self, filter: FrameFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn run(&self, root: &Path) -> Result<BatchReport, BatchError> {
        self.run_with_events(root, &null_sender())
    }

    pub fn run_with_events(
        &self,
        root: &Path,
        events: &EventSender,
    ) -> Result<BatchReport, BatchError> {
        let started = Instant::now();
        let frames = discover_frames(root, &self.filter, self.recursive, events)?;
        let pairs: Vec<(&PathBuf, &PathBuf)> =
            frames.windows(2).map(|w| (&w[0], &w[1])).collect();
        let total = pairs.len();

        tracing::info!(frames = frames.len(), pairs = total, "Starting batch comparison");
        events.batch(BatchEvent::Started {
            total_frames: frames.len(),
            total_pairs: total,
        });

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<PairOutcome> = pairs
            .par_iter()
            .map(|&(first, second)| {
                let result = self.detector.run(first, second, &self.params);

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                events.batch(BatchEvent::Progress(BatchProgress {
                    completed: done,
                    total,
                    current_path: second.clone(),
                    decision: result.decision,
                }));

                PairOutcome {
                    first: first.clone(),
                    second: second.clone(),
                    result,
                }
            })
            .collect();

        let motion_count = outcomes.iter().filter(|o| o.result.is_motion()).count();
        let error_count = outcomes
            .iter()
            .filter(|o| o.result.decision == Decision::Error)
            .count();
        let duration_ms = started.elapsed().as_millis() as u64;

        events.batch(BatchEvent::Completed {
            pairs: total,
            motion_count,
            error_count,
            duration_ms,
        });

        Ok(BatchReport {
            pairs: outcomes,
            motion_count,
            error_count,
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventChannel};
    use image::{ImageBuffer, Luma};
    use tempfile::TempDir;

    fn save_gray(dir: &TempDir, name: &str, value: u8) {
        let img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_pixel(16, 16, Luma([value]));
        img.save(dir.path().join(name)).unwrap();
    }

    fn runner() -> BatchRunner {
        BatchRunner::new(MotionDetector::default(), MotionParameters::default())
    }

    #[test]
    fn consecutive_pairs_in_name_order() {
        let dir = TempDir::new().unwrap();
        save_gray(&dir, "0001.png", 10);
        save_gray(&dir, "0002.png", 10);
        save_gray(&dir, "0003.png", 200);
        save_gray(&dir, "0004.png", 200);

        let report = runner().run(dir.path()).unwrap();

        assert_eq!(report.pairs.len(), 3);
        assert!(report.pairs[0].second.ends_with("0002.png"));
        assert_eq!(report.pairs[0].result.decision, Decision::NoMotion);
        assert_eq!(report.pairs[1].result.decision, Decision::Motion);
        assert_eq!(report.pairs[2].result.decision, Decision::NoMotion);
        assert_eq!(report.motion_count, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn errors_without_motion_exit_with_two() {
        let dir = TempDir::new().unwrap();
        save_gray(&dir, "0001.png", 10);
        std::fs::write(dir.path().join("0002.png"), b"truncated").unwrap();

        let report = runner().run(dir.path()).unwrap();

        assert_eq!(report.error_count, 1);
        assert_eq!(report.motion_count, 0);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn single_frame_has_no_pairs() {
        let dir = TempDir::new().unwrap();
        save_gray(&dir, "0001.png", 10);

        let report = runner().run(dir.path()).unwrap();
        assert!(report.pairs.is_empty());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn progress_events_count_every_pair() {
        let dir = TempDir::new().unwrap();
        for (i, value) in [10u8, 20, 30, 40, 50].iter().enumerate() {
            save_gray(&dir, &format!("{:04}.png", i), *value);
        }

        let (sender, receiver) = EventChannel::new();
        runner().run_with_events(dir.path(), &sender).unwrap();
        drop(sender);

        let progress = receiver
            .iter()
            .filter(|e| matches!(e, Event::Batch(BatchEvent::Progress(_))))
            .count();
        assert_eq!(progress, 4);
    }
}
