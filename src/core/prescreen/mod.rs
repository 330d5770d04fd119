//! # Pre-screen Module
//!
//! A cheap "did anything change" gate based on file sizes alone.
//!
//! Compressed size tracks image content: a static scene re-encoded at the
//! same quality lands within a few percent of the previous size. The
//! estimated header overhead is removed first so that small files are not
//! dominated by fixed metadata.
//!
//! This is a heuristic. Use it to skip decodes, never as the final verdict.

use crate::error::PrescreenError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sizes and the resulting change estimate for two files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeComparison {
    pub size_a: u64,
    pub size_b: u64,
    pub header_a: u64,
    pub header_b: u64,
    pub content_a: u64,
    pub content_b: u64,
    /// `100 * |content_a - content_b| / max(content_a, content_b)`
    pub percent: f64,
}

/// Estimate the non-pixel overhead of a file from its extension and size.
///
/// The result never exceeds half of `file_size`.
pub fn estimate_header_size(path: &Path, file_size: u64) -> u64 {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let estimate = match extension.as_deref() {
        None => (file_size / 4).min(1024),
        Some("jpg" | "jpeg") => match file_size {
            0..=1999 => 600,
            2000..=9999 => 1000,
            _ => 1500,
        },
        Some("png") => {
            if file_size < 5000 {
                200
            } else {
                1000
            }
        }
        // 54-byte header + 256-entry palette
        Some("bmp") => 1078,
        Some(_) => (file_size / 10).min(1024),
    };

    estimate.min(file_size / 2)
}

/// Compare the content sizes of two files without opening them.
pub fn estimate_change(a: &Path, b: &Path) -> Result<SizeComparison, PrescreenError> {
    let size_a = file_size(a)?;
    let size_b = file_size(b)?;

    let header_a = estimate_header_size(a, size_a);
    let header_b = estimate_header_size(b, size_b);
    let content_a = size_a.saturating_sub(header_a).max(1);
    let content_b = size_b.saturating_sub(header_b).max(1);

    let percent = 100.0 * content_a.abs_diff(content_b) as f64 / content_a.max(content_b) as f64;

    tracing::debug!(
        size_a,
        size_b,
        content_a,
        content_b,
        percent,
        "File size pre-screen"
    );

    Ok(SizeComparison {
        size_a,
        size_b,
        header_a,
        header_b,
        content_a,
        content_b,
        percent,
    })
}

fn file_size(path: &Path) -> Result<u64, PrescreenError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| PrescreenError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
