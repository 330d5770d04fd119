//! # Frame Motion
//!
//! Decides whether motion happened between two still frames, cheaply enough
//! for a Raspberry Pi Zero polling a camera.
//!
//! ## Approach
//! - **Decode only what is needed** - full, half, quarter, eighth scale, or
//!   a DC-coefficient preview straight from the JPEG entropy data
//! - **Refuse before allocating** - the header is probed and oversized
//!   images are rejected against a per-mode memory ceiling
//! - **Count, don't guess** - the verdict is the share of sampled pixels
//!   whose difference exceeds a threshold
//! - **Gate with file sizes** - an optional pre-screen that never decodes
//!
//! ## Architecture
//! - `core` - loader, difference engine, pre-screen, decision pipeline, batch
//! - `events` - progress reporting over crossbeam channels
//! - `error` - error taxonomy

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::core::params::MotionParameters;
pub use crate::core::pipeline::{ComparisonResult, Decision, MotionDetector};
pub use error::{MotionError, Result};

/// Initialize tracing from `RUST_LOG`, defaulting to errors only.
///
/// Called by the binary; library users install their own subscriber.
pub fn init_tracing() {
    init_tracing_with_default("error");
}

/// Initialize tracing from `RUST_LOG`, or `directive` when it is unset.
///
/// Logs go to stderr. A second call is a no-op.
pub fn init_tracing_with_default(directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
