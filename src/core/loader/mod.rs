//! # Loader Module
//!
//! Turns a file path into a [`DecodedImage`] at the requested decode mode.
//!
//! ## Decode paths
//! - **Full / Half / Quarter / Eighth**: full decode (zune-jpeg for JPEG,
//!   `image` crate otherwise), then a box-filter downscale to
//!   `max(1, w/f) x max(1, h/f)`
//! - **DcOnly**: baseline JPEG entropy decode keeping only DC terms, giving
//!   one pixel per 8x8 block
//!
//! ## Memory ceiling
//! The header is probed before any pixel allocation. If the predicted
//! source raster (`width * height * components`) exceeds the limit for the
//! requested mode, the load fails with `ImageTooLarge`. Limits grow with the
//! aggressiveness of the mode.

mod dc_decode;
mod fast_decode;
mod fast_resize;
mod header;
mod mmap_decode;
mod traits;

pub use dc_decode::decode_dc;
pub use fast_decode::FastDecoder;
pub use fast_resize::FastResizer;
pub use header::{ComponentSpec, FrameCoding, JpegHeader};
pub use mmap_decode::{read_file_bytes, FileBytes, SourceFormat};
pub use traits::FrameSource;

use crate::core::frame::DecodedImage;
use crate::core::params::DecodeMode;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-mode ceilings on predicted source raster bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeLimits {
    pub full: u64,
    pub half: u64,
    pub quarter: u64,
    pub eighth: u64,
    pub dc_only: u64,
}

impl DecodeLimits {
    /// Ceiling for one mode
    pub fn for_mode(&self, mode: DecodeMode) -> u64 {
        match mode {
            DecodeMode::Full => self.full,
            DecodeMode::Half => self.half,
            DecodeMode::Quarter => self.quarter,
            DecodeMode::Eighth => self.eighth,
            DecodeMode::DcOnly => self.dc_only,
        }
    }

    /// Replace the ceiling for one mode
    pub fn with_limit(mut self, mode: DecodeMode, bytes: u64) -> Self {
        match mode {
            DecodeMode::Full => self.full = bytes,
            DecodeMode::Half => self.half = bytes,
            DecodeMode::Quarter => self.quarter = bytes,
            DecodeMode::Eighth => self.eighth = bytes,
            DecodeMode::DcOnly => self.dc_only = bytes,
        }
        self
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            full: 1920 * 1080 * 3,
            half: 3840 * 2160 * 3,
            quarter: 41_472_000,
            eighth: 82_944_000,
            dc_only: 165_888_000,
        }
    }
}

/// A decoded frame plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFrame {
    pub image: DecodedImage,
    /// Mode the caller asked for
    pub requested: DecodeMode,
    /// Mode that actually produced `image`
    pub mode_used: DecodeMode,
}

impl LoadedFrame {
    /// True when a DC-only request was served by a full decode
    pub fn dc_fallback(&self) -> bool {
        self.requested != self.mode_used
    }
}

/// The production [`FrameSource`]
#[derive(Debug, Clone, Default)]
pub struct ImageLoader {
    limits: DecodeLimits,
}

impl ImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Load in exactly `mode`, with no fallback
    pub fn load_exact(&self, path: &Path, mode: DecodeMode) -> Result<DecodedImage, LoadError> {
        let bytes = read_file_bytes(path)?;
        let format = SourceFormat::sniff(&bytes);

        if mode == DecodeMode::DcOnly {
            return self.load_dc(path, &bytes, format);
        }

        let (width, height, components) = match format {
            SourceFormat::Jpeg => {
                let header =
                    JpegHeader::parse(&bytes).map_err(|reason| format_error(path, reason))?;
                (header.width, header.height, header.components.len() as u8)
            }
            _ => FastDecoder::probe(&bytes).map_err(|reason| format_error(path, reason))?,
        };
        self.check_ceiling(path, mode, width, height, components)?;

        let image = FastDecoder::decode(&bytes).map_err(|reason| format_error(path, reason))?;
        let image = FastResizer::new()
            .downscale(image, mode.scale_factor())
            .map_err(|reason| format_error(path, reason))?;

        tracing::debug!(
            path = %path.display(),
            mode = %mode,
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            "Decoded frame"
        );
        Ok(image)
    }

    fn load_dc(
        &self,
        path: &Path,
        bytes: &[u8],
        format: SourceFormat,
    ) -> Result<DecodedImage, LoadError> {
        let incompatible = |reason: String| LoadError::DcIncompatible {
            path: path.to_path_buf(),
            reason,
        };

        if format != SourceFormat::Jpeg {
            return Err(incompatible(format!("{:?} is not a JPEG file", format)));
        }
        let header = JpegHeader::parse(bytes).map_err(incompatible)?;
        header.dc_compatibility().map_err(incompatible)?;
        self.check_ceiling(
            path,
            DecodeMode::DcOnly,
            header.width,
            header.height,
            header.components.len() as u8,
        )?;

        let image = decode_dc(bytes).map_err(incompatible)?;
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Decoded DC-only preview"
        );
        Ok(image)
    }

    fn check_ceiling(
        &self,
        path: &Path,
        mode: DecodeMode,
        width: u32,
        height: u32,
        components: u8,
    ) -> Result<(), LoadError> {
        let predicted_bytes = width as u64 * height as u64 * components as u64;
        let limit_bytes = self.limits.for_mode(mode);
        if predicted_bytes > limit_bytes {
            tracing::warn!(
                path = %path.display(),
                predicted_bytes,
                limit_bytes,
                mode = %mode,
                "Refusing to decode oversized image"
            );
            return Err(LoadError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                predicted_bytes,
                limit_bytes,
                mode,
            });
        }
        Ok(())
    }
}

impl FrameSource for ImageLoader {
    fn load(
        &self,
        path: &Path,
        mode: DecodeMode,
        strict_dc: bool,
    ) -> Result<LoadedFrame, LoadError> {
        match self.load_exact(path, mode) {
            Ok(image) => Ok(LoadedFrame {
                image,
                requested: mode,
                mode_used: mode,
            }),
            Err(LoadError::DcIncompatible { reason, .. }) if !strict_dc => {
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "DC-only decode unavailable, falling back to full decode"
                );
                let image = self.load_exact(path, DecodeMode::Full)?;
                Ok(LoadedFrame {
                    image,
                    requested: mode,
                    mode_used: DecodeMode::Full,
                })
            }
            Err(e) => Err(e),
        }
    }
}

fn format_error(path: &Path, reason: String) -> LoadError {
    LoadError::Format {
        path: path.to_path_buf(),
        reason,
    }
}
