//! Frame discovery using walkdir.

use crate::error::BatchError;
use crate::events::{BatchEvent, EventSender};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which files in a directory count as frames
#[derive(Debug, Clone)]
pub struct FrameFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl FrameFilter {
    /// JPEG, PNG and BMP; hidden files excluded
    pub fn new() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "bmp"]
                .into_iter()
                .map(String::from)
                .collect(),
            include_hidden: false,
        }
    }

    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn should_include(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// List frames under `root`, sorted by path.
///
/// Unreadable entries are reported through `events` and skipped. Only a
/// missing or non-directory root is an error.
pub fn discover_frames(
    root: &Path,
    filter: &FrameFilter,
    recursive: bool,
    events: &EventSender,
) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut frames = Vec::new();
    let walk = walker.into_iter().filter_entry(|entry| {
        // Never descend into hidden directories (the root itself is exempt)
        entry.depth() == 0
            || !entry.file_type().is_dir()
            || !entry.file_name().to_string_lossy().starts_with('.')
    });

    for entry in walk {
        match entry {
            Ok(entry) if entry.file_type().is_file() && filter.should_include(entry.path()) => {
                frames.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                if e.depth() == 0 {
                    return Err(BatchError::ReadDirectory {
                        path,
                        reason: e.to_string(),
                    });
                }
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                events.batch(BatchEvent::DiscoveryError {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    frames.sort();
    Ok(frames)
}
