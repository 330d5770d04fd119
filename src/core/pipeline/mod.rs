//! # Pipeline Module
//!
//! The decision policy: turns two paths and a [`MotionParameters`] into a
//! [`ComparisonResult`].
//!
//! ## States
//! 1. **File-size mode** - pre-screen only, straight to a verdict
//! 2. **Load** - both frames in the requested decode mode (a DC-only
//!    request on an incompatible file silently retries at full resolution
//!    unless strict)
//! 3. **Compare** - shape check, optional smoothing, difference engine
//! 4. **Decide** - motion when the percentage reaches the threshold
//!
//! Any failure ends in `Decision::Error` with no motion percentage.
//!
//! ## Cascade
//! [`Cascade`] chains several runs (file size, reduced fidelity, full) and
//! stops at the first stage that does not see motion.
//!
//! [`MotionParameters`]: crate::core::params::MotionParameters

mod cascade;
mod executor;
mod result;

pub use cascade::{Cascade, CascadeResult};
pub use executor::{MotionDetector, MotionDetectorBuilder};
pub use result::{ComparisonResult, Decision, Diagnostics};
