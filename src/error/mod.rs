//! # Error Module
//!
//! Error types for the motion detector.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, dimensions, what went wrong
//! - **Classify** - every failure maps onto one [`ErrorKind`], which is what
//!   the decision policy records in an Error outcome
//! - **Recovery hints** - suggest a cheaper decode mode when possible

use crate::core::frame::FrameShape;
use crate::core::params::DecodeMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum MotionError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Pre-screen error: {0}")]
    Prescreen(#[from] PrescreenError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MotionError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MotionError::Load(e) => e.kind(),
            MotionError::Compare(CompareError::DimensionMismatch { .. }) => {
                ErrorKind::DimensionMismatch
            }
            MotionError::Prescreen(PrescreenError::Io { .. }) => ErrorKind::Io,
            MotionError::Batch(BatchError::DirectoryNotFound { .. }) => ErrorKind::Io,
            MotionError::Batch(BatchError::ReadDirectory { .. }) => ErrorKind::Io,
            MotionError::Config(_) => ErrorKind::Config,
        }
    }
}

/// Coarse failure classes reported in a comparison result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// File missing or unreadable
    Io,
    /// Corrupt or unsupported image data
    Format,
    /// The two frames do not share width, height and channel count
    DimensionMismatch,
    /// JPEG not suited to DC-only decoding
    DcIncompatible,
    /// Predicted decode memory exceeds the configured ceiling
    ImageTooLarge,
    /// Invalid parameters
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Io => "IOError",
            ErrorKind::Format => "FormatError",
            ErrorKind::DimensionMismatch => "DimensionMismatch",
            ErrorKind::DcIncompatible => "DCIncompatible",
            ErrorKind::ImageTooLarge => "ImageTooLarge",
            ErrorKind::Config => "ConfigError",
        };
        write!(f, "{}", name)
    }
}

/// Errors that occur while loading a frame
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("{path} cannot be decoded in DC-only mode: {reason}. Use -d instead of --dc-strict for automatic fallback")]
    DcIncompatible { path: PathBuf, reason: String },

    #[error("Image {path} is too large for {mode} decoding: {width}x{height} needs ~{predicted_bytes} bytes, limit is {limit_bytes}. {}", .mode.larger_image_hint())]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        predicted_bytes: u64,
        limit_bytes: u64,
        mode: DecodeMode,
    },
}

impl LoadError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Io { .. } => ErrorKind::Io,
            LoadError::Format { .. } => ErrorKind::Format,
            LoadError::DcIncompatible { .. } => ErrorKind::DcIncompatible,
            LoadError::ImageTooLarge { .. } => ErrorKind::ImageTooLarge,
        }
    }
}

/// Errors raised by the difference engine
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Images must have the same dimensions and format: {first} vs {second}")]
    DimensionMismatch { first: FrameShape, second: FrameShape },
}

/// Errors raised by the file-size pre-screen
#[derive(Error, Debug)]
pub enum PrescreenError {
    #[error("Could not get file size for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while discovering frames for a batch run
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to read directory {path}: {reason}")]
    ReadDirectory { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, MotionError>;
