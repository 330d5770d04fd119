//! Full-resolution decoding with format-specific fast paths.
//!
//! JPEG goes through zune-jpeg in strict mode, so a truncated or corrupt
//! JPEG is an error rather than a padded raster. Everything else goes
//! through the `image` crate. The output is always one luma channel or three
//! RGB channels.

use super::mmap_decode::SourceFormat;
use crate::core::frame::DecodedImage;
use std::io::Cursor;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Decoder that picks the fastest backend for the sniffed format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode a complete image from memory.
    pub fn decode(bytes: &[u8]) -> Result<DecodedImage, String> {
        match SourceFormat::sniff(bytes) {
            SourceFormat::Jpeg => Self::decode_jpeg(bytes),
            _ => Self::decode_fallback(bytes),
        }
    }

    /// Width, height and channel count without decoding pixel data
    pub fn probe(bytes: &[u8]) -> Result<(u32, u32, u8), String> {
        use image::ImageDecoder;

        let decoder = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .into_decoder()
            .map_err(|e| e.to_string())?;
        let (width, height) = decoder.dimensions();
        let channels = decoder.color_type().channel_count();
        Ok((width, height, channels))
    }

    fn decode_jpeg(bytes: &[u8]) -> Result<DecodedImage, String> {
        let options = DecoderOptions::new_fast()
            .set_strict_mode(true)
            .jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder
            .decode()
            .map_err(|e| format!("zune-jpeg decode failed: {:?}", e))?;
        let info = decoder
            .info()
            .ok_or_else(|| "zune-jpeg returned no image info".to_string())?;
        let (width, height) = (info.width as u32, info.height as u32);

        let channels = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => 3,
            ColorSpace::Luma => 1,
            other => return Err(format!("unexpected output colorspace {:?}", other)),
        };

        DecodedImage::from_raw(width, height, channels, pixels)
            .ok_or_else(|| format!("decoded buffer does not match {}x{}x{}", width, height, channels))
    }

    fn decode_fallback(bytes: &[u8]) -> Result<DecodedImage, String> {
        let image = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
        Ok(DecodedImage::from_dynamic(image))
    }
}
