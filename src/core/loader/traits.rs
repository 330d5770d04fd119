//! Frame source trait definition.

use super::LoadedFrame;
use crate::core::params::DecodeMode;
use crate::error::LoadError;
use std::path::Path;

/// Anything that can turn a path into a decoded frame
pub trait FrameSource: Send + Sync {
    /// Load one frame at the requested fidelity.
    ///
    /// When `strict_dc` is false, a DC-only request on a file that cannot be
    /// DC-decoded is retried at full resolution and the returned
    /// [`LoadedFrame`] records the fallback.
    fn load(&self, path: &Path, mode: DecodeMode, strict_dc: bool)
        -> Result<LoadedFrame, LoadError>;
}
