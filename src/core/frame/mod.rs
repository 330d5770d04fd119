//! # Frame Module
//!
//! The decoded raster shared by the loader and the difference engine.
//!
//! A [`DecodedImage`] owns a row-major, top-to-bottom byte buffer whose
//! length always equals `width * height * channels`. The constructor rejects
//! any buffer that breaks this, and every pixel accessor returns `Option`
//! instead of indexing blindly, so a bad index is skipped rather than read.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Width, height and channel count of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl FrameShape {
    pub fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// Number of pixels (not bytes)
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Expected buffer length in bytes, or `None` if it does not fit in memory
    pub fn byte_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.channels as usize)
    }
}

impl std::fmt::Display for FrameShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// A decoded frame: 1 channel (luminance) or 3 channels (RGB)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    shape: FrameShape,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wrap a raw buffer.
    ///
    /// Returns `None` when the channel count is not 1 or 3, or when the
    /// buffer length differs from `width * height * channels`.
    pub fn from_raw(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Option<Self> {
        if channels != 1 && channels != 3 {
            return None;
        }
        let shape = FrameShape::new(width, height, channels);
        if shape.byte_len()? != pixels.len() {
            return None;
        }
        Some(Self { shape, pixels })
    }

    /// Build an image where every pixel has the same value
    pub fn filled(width: u32, height: u32, pixel: &[u8]) -> Option<Self> {
        let channels = u8::try_from(pixel.len()).ok()?;
        let count = (width as usize).checked_mul(height as usize)?;
        let pixels = pixel.repeat(count);
        Self::from_raw(width, height, channels, pixels)
    }

    /// Convert an `image` crate raster, dropping alpha and keeping
    /// grayscale sources single-channel.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        if image.color().has_color() {
            let rgb = image.into_rgb8();
            Self {
                shape: FrameShape::new(width, height, 3),
                pixels: rgb.into_raw(),
            }
        } else {
            let luma = image.into_luma8();
            Self {
                shape: FrameShape::new(width, height, 1),
                pixels: luma.into_raw(),
            }
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn width(&self) -> u32 {
        self.shape.width
    }

    pub fn height(&self) -> u32 {
        self.shape.height
    }

    pub fn channels(&self) -> u8 {
        self.shape.channels
    }

    /// The whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Give up ownership of the buffer
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels
    }

    /// Byte offset of pixel `(x, y)`, checked against the buffer length.
    ///
    /// Returns `None` if the coordinate is outside the image, the offset
    /// overflows, or the pixel's last channel would fall past the end.
    pub fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.shape.width || y >= self.shape.height {
            return None;
        }
        let channels = self.shape.channels as usize;
        let base = (y as usize)
            .checked_mul(self.shape.width as usize)?
            .checked_add(x as usize)?
            .checked_mul(channels)?;
        let end = base.checked_add(channels)?;
        (end <= self.pixels.len()).then_some(base)
    }

    /// Channel values of pixel `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        let base = self.offset(x, y)?;
        self.pixels.get(base..base + self.shape.channels as usize)
    }

    /// Mutable channel values of pixel `(x, y)`
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [u8]> {
        let base = self.offset(x, y)?;
        let channels = self.shape.channels as usize;
        self.pixels.get_mut(base..base + channels)
    }

    /// Bytes currently reserved by the buffer
    pub(crate) fn capacity(&self) -> usize {
        self.pixels.capacity()
    }
}
