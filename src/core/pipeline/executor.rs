//! Single-comparison execution.

use super::result::{ComparisonResult, Diagnostics};
use crate::core::cache::FrameCache;
use crate::core::diff::{DiffStats, DifferenceEngine, Smoother};
use crate::core::loader::{DecodeLimits, FrameSource, ImageLoader, LoadedFrame};
use crate::core::params::MotionParameters;
use crate::core::prescreen;
use crate::error::MotionError;
use crate::events::{null_sender, EventSender, PipelineEvent, PipelinePhase};
use std::path::Path;
use std::time::Instant;

/// Builder for [`MotionDetector`]
pub struct MotionDetectorBuilder {
    limits: DecodeLimits,
    smoother: Smoother,
    source: Option<Box<dyn FrameSource>>,
}

impl MotionDetectorBuilder {
    pub fn new() -> Self {
        Self {
            limits: DecodeLimits::default(),
            smoother: Smoother::default(),
            source: None,
        }
    }

    /// Memory ceilings for the default loader
    pub fn limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Largest image (in pixels) the smoothing pre-pass will convolve
    pub fn smoothing_pixel_ceiling(mut self, pixels: u64) -> Self {
        self.smoother = Smoother::with_pixel_ceiling(pixels);
        self
    }

    /// Replace the image loader (limits are then ignored)
    pub fn source(mut self, source: Box<dyn FrameSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> MotionDetector {
        let limits = self.limits;
        MotionDetector {
            source: self
                .source
                .unwrap_or_else(|| Box::new(ImageLoader::with_limits(limits))),
            engine: DifferenceEngine::with_smoother(self.smoother),
        }
    }
}

impl Default for MotionDetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decision policy for one pair of frames.
///
/// Holds no per-comparison state, so one detector can be shared across
/// threads. The optional reuse buffers are passed in by the caller.
pub struct MotionDetector {
    source: Box<dyn FrameSource>,
    engine: DifferenceEngine,
}

impl MotionDetector {
    pub fn builder() -> MotionDetectorBuilder {
        MotionDetectorBuilder::new()
    }

    /// Compare two files without event reporting
    pub fn run(&self, a: &Path, b: &Path, params: &MotionParameters) -> ComparisonResult {
        self.run_with_events(a, b, params, &null_sender())
    }

    /// Compare two files.
    ///
    /// File-size mode never decodes. Otherwise both frames are loaded in the
    /// requested mode, shape-checked, optionally smoothed and diffed. Any
    /// failure becomes a `Decision::Error` result.
    pub fn run_with_events(
        &self,
        a: &Path,
        b: &Path,
        params: &MotionParameters,
        events: &EventSender,
    ) -> ComparisonResult {
        self.execute(a, b, params, events, |diagnostics| {
            events.pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Loading,
            });
            let started = Instant::now();
            let loaded = self.load(a, params).and_then(|first| Ok((first, self.load(b, params)?)));
            diagnostics.load_ms = elapsed_ms(started);
            let (first, second) = loaded?;
            self.compare_loaded(&first, &second, params, diagnostics, events)
        })
    }

    /// Like [`run_with_events`](Self::run_with_events), reusing one cache
    /// per input.
    ///
    /// Useful in polling loops where one side is the same reference frame
    /// every time.
    pub fn run_cached(
        &self,
        a: &Path,
        b: &Path,
        params: &MotionParameters,
        cache_a: &mut FrameCache,
        cache_b: &mut FrameCache,
        events: &EventSender,
    ) -> ComparisonResult {
        self.execute(a, b, params, events, |diagnostics| {
            events.pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Loading,
            });
            let (mode, strict) = (params.decode_mode, params.strict_dc);
            let started = Instant::now();
            let first = cache_a.get_or_load(a, mode, strict, || self.source.load(a, mode, strict));
            let loaded = first.and_then(|first| {
                let second =
                    cache_b.get_or_load(b, mode, strict, || self.source.load(b, mode, strict))?;
                Ok((first, second))
            });
            diagnostics.load_ms = elapsed_ms(started);
            let (first, second) = loaded?;
            self.compare_loaded(first, second, params, diagnostics, events)
        })
    }

    /// Shared frame of every run: file-size shortcut, timing, verdict and
    /// completion events. `decode` produces the motion percentage.
    fn execute<F>(
        &self,
        a: &Path,
        b: &Path,
        params: &MotionParameters,
        events: &EventSender,
        decode: F,
    ) -> ComparisonResult
    where
        F: FnOnce(&mut Diagnostics) -> Result<f64, MotionError>,
    {
        let started = Instant::now();
        events.pipeline(PipelineEvent::Started {
            first: a.to_path_buf(),
            second: b.to_path_buf(),
        });

        let mut diagnostics = Diagnostics::default();
        let (outcome, threshold) = if params.file_size_only {
            (
                self.prescreen(a, b, &mut diagnostics, events),
                params.file_size_threshold_percent,
            )
        } else {
            (decode(&mut diagnostics), params.motion_percent_threshold)
        };
        diagnostics.total_ms = elapsed_ms(started);

        let result = match outcome {
            Ok(percent) => ComparisonResult::decided(percent, threshold, *params, diagnostics),
            Err(error) => {
                tracing::debug!(error = %error, "Comparison failed");
                events.pipeline(PipelineEvent::Error {
                    message: error.to_string(),
                });
                ComparisonResult::failed(&error, *params, diagnostics)
            }
        };

        tracing::debug!(
            decision = %result.decision,
            motion_percent = ?result.motion_percent,
            threshold,
            "Comparison decided"
        );
        events.pipeline(PipelineEvent::Completed {
            decision: result.decision,
            motion_percent: result.motion_percent,
            duration_ms: started.elapsed().as_millis() as u64,
        });
        result
    }

    fn prescreen(
        &self,
        a: &Path,
        b: &Path,
        diagnostics: &mut Diagnostics,
        events: &EventSender,
    ) -> Result<f64, MotionError> {
        events.pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Prescreen,
        });
        let started = Instant::now();
        let comparison = prescreen::estimate_change(a, b);
        diagnostics.load_ms = elapsed_ms(started);

        let comparison = comparison?;
        diagnostics.size_comparison = Some(comparison);
        Ok(comparison.percent)
    }

    fn load(&self, path: &Path, params: &MotionParameters) -> Result<LoadedFrame, MotionError> {
        Ok(self
            .source
            .load(path, params.decode_mode, params.strict_dc)?)
    }

    fn compare_loaded(
        &self,
        first: &LoadedFrame,
        second: &LoadedFrame,
        params: &MotionParameters,
        diagnostics: &mut Diagnostics,
        events: &EventSender,
    ) -> Result<f64, MotionError> {
        diagnostics.dc_fallback = first.dc_fallback() || second.dc_fallback();
        diagnostics.mode_used = Some(first.mode_used);

        events.pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Comparing,
        });
        let started = Instant::now();
        let stats = self.engine.compare(&first.image, &second.image, params);
        diagnostics.compute_ms = elapsed_ms(started);

        let stats: DiffStats = stats?;
        diagnostics.compared_shape = Some(first.image.shape());
        diagnostics.pixels_sampled = stats.sampled;
        diagnostics.pixels_changed = stats.changed;
        diagnostics.pixels_skipped = stats.skipped;
        Ok(stats.motion_percent)
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
