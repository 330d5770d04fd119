//! # Cache Module
//!
//! A caller-owned reuse buffer for polling loops that compare the same path
//! over and over.
//!
//! ## Behaviour
//! - One slot, keyed by path, decode mode, strict-DC flag, file size and
//!   modification time
//! - A hit returns the cached frame without touching the decoder
//! - A miss decodes and replaces the stored frame
//! - A failed load leaves the previous entry in place
//!
//! ## Threading
//! `FrameCache` is not thread-safe. Every method that changes it takes
//! `&mut self`, and each pipeline (or batch pair) owns its own caches.

use crate::core::loader::LoadedFrame;
use crate::core::params::DecodeMode;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Identity of a cached frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameKey {
    pub path: PathBuf,
    pub mode: DecodeMode,
    pub strict_dc: bool,
    pub file_size: u64,
    pub file_modified: Option<SystemTime>,
}

impl FrameKey {
    /// Build the key for a file as it is on disk right now
    pub fn for_file(path: &Path, mode: DecodeMode, strict_dc: bool) -> Result<Self, LoadError> {
        let metadata = std::fs::metadata(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            strict_dc,
            file_size: metadata.len(),
            file_modified: metadata.modified().ok(),
        })
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct CachedFrame {
    key: FrameKey,
    frame: LoadedFrame,
}

/// Single-slot frame cache
#[derive(Debug, Default)]
pub struct FrameCache {
    slot: Option<CachedFrame>,
    stats: CacheStats,
}

impl FrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached frame for `path` in `mode`, or run `load` and cache
    /// its result.
    pub fn get_or_load<F>(
        &mut self,
        path: &Path,
        mode: DecodeMode,
        strict_dc: bool,
        load: F,
    ) -> Result<&LoadedFrame, LoadError>
    where
        F: FnOnce() -> Result<LoadedFrame, LoadError>,
    {
        let key = FrameKey::for_file(path, mode, strict_dc)?;

        let cached = match self.slot.take() {
            Some(cached) if cached.key == key => {
                self.stats.hits += 1;
                tracing::debug!(path = %path.display(), mode = %mode, "Frame cache hit");
                cached
            }
            previous => {
                self.stats.misses += 1;
                let fresh = match load() {
                    Ok(frame) => frame,
                    Err(e) => {
                        self.slot = previous;
                        return Err(e);
                    }
                };
                CachedFrame { key, frame: fresh }
            }
        };

        Ok(&self.slot.insert(cached).frame)
    }

    /// Key of the current entry, if any
    pub fn key(&self) -> Option<&FrameKey> {
        self.slot.as_ref().map(|c| &c.key)
    }

    /// Bytes held by the cached raster allocation
    pub fn retained_bytes(&self) -> usize {
        self.slot
            .as_ref()
            .map(|c| c.frame.image.capacity())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop the cached frame and release its buffer
    pub fn clear(&mut self) {
        self.slot = None;
    }
}
