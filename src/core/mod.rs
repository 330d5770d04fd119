//! # Core Module
//!
//! The presentation-agnostic motion detection engine.
//!
//! ## Modules
//! - `frame` - Owned, length-checked raster
//! - `params` - Comparison configuration
//! - `loader` - Decodes a file at the requested fidelity
//! - `diff` - Pixel difference engine and smoothing pre-pass
//! - `prescreen` - File-size heuristic
//! - `cache` - Caller-owned reuse buffer
//! - `pipeline` - Decision policy and cascade
//! - `batch` - Consecutive-pair comparison over a directory

pub mod batch;
pub mod cache;
pub mod diff;
pub mod frame;
pub mod loader;
pub mod params;
pub mod pipeline;
pub mod prescreen;

// Re-export commonly used types
pub use frame::{DecodedImage, FrameShape};
pub use params::{ChannelMode, DecodeMode, MotionParameters, Smoothing};
pub use pipeline::{ComparisonResult, Decision, MotionDetector};
