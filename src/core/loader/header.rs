//! JPEG marker parsing.
//!
//! Walks the segment structure of a JPEG stream without touching the
//! entropy-coded data. Used to predict decode memory before allocating and
//! to decide whether a file can be decoded in DC-only mode.

/// Start of image
pub(crate) const SOI: u8 = 0xD8;
/// End of image
pub(crate) const EOI: u8 = 0xD9;
/// Start of scan
pub(crate) const SOS: u8 = 0xDA;
/// Define quantization tables
pub(crate) const DQT: u8 = 0xDB;
/// Define Huffman tables
pub(crate) const DHT: u8 = 0xC4;
/// Define restart interval
pub(crate) const DRI: u8 = 0xDD;

/// How the frame's coefficients are coded, from the SOF marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCoding {
    /// SOF0
    Baseline,
    /// SOF1
    ExtendedSequential,
    /// SOF2
    Progressive,
    /// SOF3
    Lossless,
    /// SOF9-SOF15 except the differential Huffman ones
    Arithmetic,
    /// SOF5-SOF7
    Hierarchical,
}

impl FrameCoding {
    pub(crate) fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            0xC0 => Some(FrameCoding::Baseline),
            0xC1 => Some(FrameCoding::ExtendedSequential),
            0xC2 => Some(FrameCoding::Progressive),
            0xC3 => Some(FrameCoding::Lossless),
            0xC5..=0xC7 => Some(FrameCoding::Hierarchical),
            0xC9..=0xCB | 0xCD..=0xCF => Some(FrameCoding::Arithmetic),
            _ => None,
        }
    }

    fn is_sequential_huffman(&self) -> bool {
        matches!(
            self,
            FrameCoding::Baseline | FrameCoding::ExtendedSequential
        )
    }
}

/// One component declared in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSpec {
    pub id: u8,
    /// Horizontal sampling factor (1-4)
    pub h: u8,
    /// Vertical sampling factor (1-4)
    pub v: u8,
    /// Quantization table selector
    pub tq: u8,
}

/// Frame-level information from the SOF segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JpegHeader {
    pub width: u32,
    pub height: u32,
    pub precision: u8,
    pub coding: FrameCoding,
    pub components: Vec<ComponentSpec>,
}

impl JpegHeader {
    /// Parse segments up to and including the first SOF.
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let mut pos = expect_soi(bytes)?;
        while let Some(segment) = next_segment(bytes, pos)? {
            if let Some(coding) = FrameCoding::from_marker(segment.marker) {
                return Self::from_sof(coding, segment.payload);
            }
            if segment.marker == SOS || segment.marker == EOI {
                break;
            }
            pos = segment.end;
        }
        Err("no frame header (SOF) before image data".to_string())
    }

    /// Parse an SOF payload (everything after the length field)
    pub(crate) fn from_sof(coding: FrameCoding, payload: &[u8]) -> Result<Self, String> {
        if payload.len() < 6 {
            return Err("truncated frame header".to_string());
        }
        let precision = payload[0];
        let height = u16::from_be_bytes([payload[1], payload[2]]) as u32;
        let width = u16::from_be_bytes([payload[3], payload[4]]) as u32;
        let count = payload[5] as usize;

        if width == 0 || height == 0 {
            return Err(format!("invalid frame size {}x{}", width, height));
        }
        if count == 0 {
            return Err("frame declares no components".to_string());
        }

        let specs = payload
            .get(6..6 + count * 3)
            .ok_or_else(|| "truncated component list".to_string())?;
        let mut components = Vec::with_capacity(count);
        for chunk in specs.chunks_exact(3) {
            let h = chunk[1] >> 4;
            let v = chunk[1] & 0x0F;
            if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
                return Err(format!("invalid sampling factors {}x{}", h, v));
            }
            components.push(ComponentSpec {
                id: chunk[0],
                h,
                v,
                tq: chunk[2],
            });
        }

        Ok(Self {
            width,
            height,
            precision,
            coding,
            components,
        })
    }

    /// Bytes a full-resolution decode of this frame would need
    pub fn predicted_bytes(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.components.len() as u64
    }

    pub fn max_sampling(&self) -> (u8, u8) {
        let h = self.components.iter().map(|c| c.h).max().unwrap_or(1);
        let v = self.components.iter().map(|c| c.v).max().unwrap_or(1);
        (h, v)
    }

    /// Check whether the DC coefficients can be read directly.
    ///
    /// Requires sequential Huffman coding, 8-bit samples, and one
    /// (grayscale) or three (YCbCr) components.
    pub fn dc_compatibility(&self) -> Result<(), String> {
        if !self.coding.is_sequential_huffman() {
            return Err(format!("{:?} JPEG is not supported", self.coding));
        }
        if self.precision != 8 {
            return Err(format!("{}-bit samples are not supported", self.precision));
        }
        if self.components.len() != 1 && self.components.len() != 3 {
            return Err(format!(
                "{} color components are not supported",
                self.components.len()
            ));
        }
        Ok(())
    }
}

/// A marker segment
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment<'a> {
    pub marker: u8,
    /// Payload without the two length bytes (empty for standalone markers)
    pub payload: &'a [u8],
    /// Offset of the first byte after the segment
    pub end: usize,
}

/// Check the SOI marker and return the offset after it
pub(crate) fn expect_soi(bytes: &[u8]) -> Result<usize, String> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != SOI {
        return Err("missing JPEG start-of-image marker".to_string());
    }
    Ok(2)
}

/// Read the marker segment starting at `pos`.
///
/// Fill bytes (`0xFF` runs) before a marker are skipped. Returns `Ok(None)`
/// at end of data.
pub(crate) fn next_segment(bytes: &[u8], pos: usize) -> Result<Option<Segment<'_>>, String> {
    let mut pos = pos;
    if pos >= bytes.len() {
        return Ok(None);
    }
    if bytes[pos] != 0xFF {
        return Err(format!("expected marker at offset {}", pos));
    }
    while pos < bytes.len() && bytes[pos] == 0xFF {
        pos += 1;
    }
    let marker = *bytes
        .get(pos)
        .ok_or_else(|| "truncated marker".to_string())?;
    pos += 1;

    // Standalone markers carry no length field
    if marker == SOI || marker == EOI || marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
        return Ok(Some(Segment {
            marker,
            payload: &[],
            end: pos,
        }));
    }

    let length_bytes = bytes
        .get(pos..pos + 2)
        .ok_or_else(|| format!("truncated length for marker {:02X}", marker))?;
    let length = u16::from_be_bytes([length_bytes[0], length_bytes[1]]) as usize;
    if length < 2 {
        return Err(format!("invalid length {} for marker {:02X}", length, marker));
    }
    let payload = bytes
        .get(pos + 2..pos + length)
        .ok_or_else(|| format!("segment {:02X} runs past end of file", marker))?;

    Ok(Some(Segment {
        marker,
        payload,
        end: pos + length,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sof(marker: u8, precision: u8, width: u16, height: u16, components: &[(u8, u8, u8)]) -> Vec<u8> {
        let mut segment = vec![0xFF, marker];
        let length = 8 + components.len() * 3;
        segment.extend_from_slice(&(length as u16).to_be_bytes());
        segment.push(precision);
        segment.extend_from_slice(&height.to_be_bytes());
        segment.extend_from_slice(&width.to_be_bytes());
        segment.push(components.len() as u8);
        for &(id, sampling, tq) in components {
            segment.extend_from_slice(&[id, sampling, tq]);
        }
        segment
    }

    fn jpeg_with(frame: Vec<u8>) -> Vec<u8> {
        let mut bytes = vec![0xFF, SOI];
        // APP0 with a short payload, to check that segments are skipped
        bytes.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46]);
        bytes.extend_from_slice(&frame);
        bytes.extend_from_slice(&[0xFF, EOI]);
        bytes
    }

    #[test]
    fn parses_baseline_frame() {
        let bytes = jpeg_with(sof(0xC0, 8, 640, 480, &[(1, 0x22, 0), (2, 0x11, 1), (3, 0x11, 1)]));
        let header = JpegHeader::parse(&bytes).unwrap();

        assert_eq!(header.width, 640);
        assert_eq!(header.height, 480);
        assert_eq!(header.coding, FrameCoding::Baseline);
        assert_eq!(header.components.len(), 3);
        assert_eq!(header.max_sampling(), (2, 2));
        assert_eq!(header.predicted_bytes(), 640 * 480 * 3);
        assert!(header.dc_compatibility().is_ok());
    }

    #[test]
    fn progressive_is_not_dc_compatible() {
        let bytes = jpeg_with(sof(0xC2, 8, 64, 64, &[(1, 0x11, 0)]));
        let header = JpegHeader::parse(&bytes).unwrap();

        assert_eq!(header.coding, FrameCoding::Progressive);
        assert!(header.dc_compatibility().is_err());
    }

    #[test]
    fn twelve_bit_is_not_dc_compatible() {
        let bytes = jpeg_with(sof(0xC1, 12, 64, 64, &[(1, 0x11, 0)]));
        let header = JpegHeader::parse(&bytes).unwrap();
        assert!(header.dc_compatibility().is_err());
    }

    #[test]
    fn rejects_missing_soi() {
        assert!(JpegHeader::parse(b"not a jpeg at all").is_err());
    }

    #[test]
    fn rejects_truncated_segment() {
        let mut bytes = jpeg_with(sof(0xC0, 8, 64, 64, &[(1, 0x11, 0)]));
        bytes.truncate(12);
        assert!(JpegHeader::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_zero_sampling_factor() {
        let bytes = jpeg_with(sof(0xC0, 8, 64, 64, &[(1, 0x01, 0)]));
        assert!(JpegHeader::parse(&bytes).is_err());
    }

    #[test]
    fn next_segment_skips_fill_bytes() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xD9];
        let segment = next_segment(&bytes, 0).unwrap().unwrap();
        assert_eq!(segment.marker, EOI);
        assert_eq!(segment.end, 4);
    }
}
