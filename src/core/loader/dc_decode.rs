//! DC-only JPEG decoding.
//!
//! Reads the entropy-coded data of a sequential Huffman JPEG, keeps the DC
//! coefficient of every 8x8 block and discards the AC coefficients without
//! running an inverse DCT. The DC term is the block average, so the result
//! is a blocky preview at `ceil(width/8) x ceil(height/8)`.
//!
//! Memory stays proportional to the number of blocks: a full-resolution
//! raster is never allocated.

use super::header::{self, ComponentSpec, FrameCoding, JpegHeader, DHT, DQT, DRI, EOI, SOS};
use crate::core::frame::DecodedImage;

/// Decode a JPEG to one pixel per luma-resolution 8x8 block.
///
/// Grayscale input yields one channel; YCbCr input yields RGB. Errors are
/// returned as a human-readable reason.
pub fn decode_dc(bytes: &[u8]) -> Result<DecodedImage, String> {
    let mut state = DecoderState::default();
    let mut pos = header::expect_soi(bytes)?;

    loop {
        let segment = header::next_segment(bytes, pos)?
            .ok_or_else(|| "unexpected end of data before end-of-image".to_string())?;
        pos = segment.end;

        if let Some(coding) = FrameCoding::from_marker(segment.marker) {
            state.read_frame(coding, segment.payload)?;
            continue;
        }

        match segment.marker {
            DQT => state.read_quant_tables(segment.payload)?,
            DHT => state.read_huffman_tables(segment.payload)?,
            DRI => state.read_restart_interval(segment.payload)?,
            SOS => {
                let scan = state.read_scan_header(segment.payload)?;
                pos = state.decode_scan(bytes, pos, &scan)?;
            }
            EOI => break,
            _ => {}
        }
    }

    state.into_image()
}

/// Huffman decoding table in the form of JPEG Annex F.2.2.3
#[derive(Debug, Clone)]
struct HuffmanTable {
    mincode: [i32; 17],
    maxcode: [i32; 18],
    valptr: [usize; 17],
    values: Vec<u8>,
}

impl HuffmanTable {
    fn new(counts: &[u8; 16], values: Vec<u8>) -> Result<Self, String> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total != values.len() || total > 256 {
            return Err("inconsistent Huffman table".to_string());
        }

        let mut mincode = [0i32; 17];
        let mut maxcode = [-1i32; 18];
        let mut valptr = [0usize; 17];
        let mut code = 0i32;
        let mut k = 0usize;

        for length in 1..=16 {
            let count = counts[length - 1] as i32;
            valptr[length] = k;
            mincode[length] = code;
            code += count;
            k += count as usize;
            maxcode[length] = if count > 0 { code - 1 } else { -1 };
            if code > (1 << length) {
                return Err("Huffman table overflows its code space".to_string());
            }
            code <<= 1;
        }
        maxcode[17] = i32::MAX;

        Ok(Self {
            mincode,
            maxcode,
            valptr,
            values,
        })
    }

    fn decode(&self, reader: &mut BitReader<'_>) -> Result<u8, String> {
        let mut code = reader.bit()? as i32;
        let mut length = 1;
        while code > self.maxcode[length] {
            length += 1;
            if length > 16 {
                return Err("invalid Huffman code".to_string());
            }
            code = (code << 1) | reader.bit()? as i32;
        }
        let index = self.valptr[length] + (code - self.mincode[length]) as usize;
        self.values
            .get(index)
            .copied()
            .ok_or_else(|| "Huffman code out of table range".to_string())
    }
}

/// Bit reader over entropy-coded data, undoing `FF 00` byte stuffing
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    current: u8,
    remaining: u8,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            current: 0,
            remaining: 0,
        }
    }

    fn bit(&mut self) -> Result<u32, String> {
        if self.remaining == 0 {
            self.current = self.next_byte()?;
            self.remaining = 8;
        }
        self.remaining -= 1;
        Ok(((self.current >> self.remaining) & 1) as u32)
    }

    fn bits(&mut self, count: u8) -> Result<u32, String> {
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.bit()?;
        }
        Ok(value)
    }

    /// Read `size` bits and sign-extend them (JPEG `EXTEND` procedure)
    fn receive_extend(&mut self, size: u8) -> Result<i32, String> {
        if size == 0 {
            return Ok(0);
        }
        if size > 16 {
            return Err(format!("invalid coefficient size {}", size));
        }
        let value = self.bits(size)? as i32;
        if value < (1 << (size - 1)) {
            Ok(value - (1 << size) + 1)
        } else {
            Ok(value)
        }
    }

    fn next_byte(&mut self) -> Result<u8, String> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| "entropy-coded data ends early".to_string())?;
        if byte != 0xFF {
            self.pos += 1;
            return Ok(byte);
        }
        match self.data.get(self.pos + 1) {
            Some(0x00) => {
                self.pos += 2;
                Ok(0xFF)
            }
            Some(marker) => Err(format!("marker {:02X} inside entropy-coded data", marker)),
            None => Err("entropy-coded data ends early".to_string()),
        }
    }

    /// Drop buffered bits and consume the expected RSTn marker
    fn restart(&mut self) -> Result<(), String> {
        self.remaining = 0;
        while self.data.get(self.pos) == Some(&0xFF) && self.data.get(self.pos + 1) == Some(&0xFF) {
            self.pos += 1;
        }
        match (self.data.get(self.pos), self.data.get(self.pos + 1)) {
            (Some(0xFF), Some(marker)) if (0xD0..=0xD7).contains(marker) => {
                self.pos += 2;
                Ok(())
            }
            _ => Err("missing restart marker".to_string()),
        }
    }

    /// Offset of the marker that ends this scan
    fn end_of_scan(&self) -> usize {
        let mut pos = self.pos;
        while pos + 1 < self.data.len() {
            let next = self.data[pos + 1];
            if self.data[pos] == 0xFF && next != 0x00 && next != 0xFF && !(0xD0..=0xD7).contains(&next) {
                return pos;
            }
            pos += 1;
        }
        self.data.len()
    }
}

/// DC values for one component, on its MCU-padded block grid
#[derive(Debug, Clone)]
struct DcPlane {
    spec: ComponentSpec,
    blocks_wide: usize,
    blocks_high: usize,
    values: Vec<i32>,
    seen: bool,
}

impl DcPlane {
    fn set(&mut self, bx: usize, by: usize, value: i32) {
        if bx < self.blocks_wide && by < self.blocks_high {
            self.values[by * self.blocks_wide + bx] = value;
        }
    }

    fn get(&self, bx: usize, by: usize) -> i32 {
        let bx = bx.min(self.blocks_wide - 1);
        let by = by.min(self.blocks_high - 1);
        self.values[by * self.blocks_wide + bx]
    }
}

/// Components taking part in one scan
#[derive(Debug)]
struct ScanHeader {
    /// (plane index, DC table, AC table)
    components: Vec<(usize, usize, usize)>,
}

#[derive(Default)]
struct DecoderState {
    dc_quant: [Option<u16>; 4],
    dc_tables: [Option<HuffmanTable>; 4],
    ac_tables: [Option<HuffmanTable>; 4],
    restart_interval: u16,
    frame: Option<JpegHeader>,
    planes: Vec<DcPlane>,
}

impl DecoderState {
    fn read_quant_tables(&mut self, payload: &[u8]) -> Result<(), String> {
        let mut rest = payload;
        while !rest.is_empty() {
            let precision = rest[0] >> 4;
            let id = (rest[0] & 0x0F) as usize;
            let table_len = if precision == 0 { 64 } else { 128 };
            let table = rest
                .get(1..1 + table_len)
                .ok_or_else(|| "truncated quantization table".to_string())?;
            if id > 3 {
                return Err(format!("invalid quantization table id {}", id));
            }
            // Only the first (DC) entry is needed
            self.dc_quant[id] = Some(if precision == 0 {
                table[0] as u16
            } else {
                u16::from_be_bytes([table[0], table[1]])
            });
            rest = &rest[1 + table_len..];
        }
        Ok(())
    }

    fn read_huffman_tables(&mut self, payload: &[u8]) -> Result<(), String> {
        let mut rest = payload;
        while !rest.is_empty() {
            let class = rest[0] >> 4;
            let id = (rest[0] & 0x0F) as usize;
            let counts: [u8; 16] = rest
                .get(1..17)
                .and_then(|c| c.try_into().ok())
                .ok_or_else(|| "truncated Huffman table".to_string())?;
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let values = rest
                .get(17..17 + total)
                .ok_or_else(|| "truncated Huffman values".to_string())?
                .to_vec();
            if id > 3 || class > 1 {
                return Err(format!("invalid Huffman table {}/{}", class, id));
            }
            let table = HuffmanTable::new(&counts, values)?;
            if class == 0 {
                self.dc_tables[id] = Some(table);
            } else {
                self.ac_tables[id] = Some(table);
            }
            rest = &rest[17 + total..];
        }
        Ok(())
    }

    fn read_restart_interval(&mut self, payload: &[u8]) -> Result<(), String> {
        let bytes = payload
            .get(0..2)
            .ok_or_else(|| "truncated restart interval".to_string())?;
        self.restart_interval = u16::from_be_bytes([bytes[0], bytes[1]]);
        Ok(())
    }

    fn read_frame(&mut self, coding: FrameCoding, payload: &[u8]) -> Result<(), String> {
        if self.frame.is_some() {
            return Err("multiple frame headers".to_string());
        }
        let frame = JpegHeader::from_sof(coding, payload)?;
        frame.dc_compatibility()?;

        let (hmax, vmax) = frame.max_sampling();
        let mcus_wide = (frame.width as usize).div_ceil(8 * hmax as usize);
        let mcus_high = (frame.height as usize).div_ceil(8 * vmax as usize);

        self.planes = frame
            .components
            .iter()
            .map(|&spec| {
                let blocks_wide = mcus_wide * spec.h as usize;
                let blocks_high = mcus_high * spec.v as usize;
                DcPlane {
                    spec,
                    blocks_wide,
                    blocks_high,
                    values: vec![0; blocks_wide * blocks_high],
                    seen: false,
                }
            })
            .collect();
        self.frame = Some(frame);
        Ok(())
    }

    fn read_scan_header(&self, payload: &[u8]) -> Result<ScanHeader, String> {
        if self.frame.is_none() {
            return Err("scan before frame header".to_string());
        }
        let count = *payload
            .first()
            .ok_or_else(|| "empty scan header".to_string())? as usize;
        let selectors = payload
            .get(1..1 + count * 2)
            .ok_or_else(|| "truncated scan header".to_string())?;

        let mut components = Vec::with_capacity(count);
        for pair in selectors.chunks_exact(2) {
            let plane = self
                .planes
                .iter()
                .position(|p| p.spec.id == pair[0])
                .ok_or_else(|| format!("scan references unknown component {}", pair[0]))?;
            let dc = (pair[1] >> 4) as usize;
            let ac = (pair[1] & 0x0F) as usize;
            if dc > 3 || ac > 3 {
                return Err("invalid Huffman table selector".to_string());
            }
            components.push((plane, dc, ac));
        }
        if components.is_empty() {
            return Err("scan has no components".to_string());
        }
        Ok(ScanHeader { components })
    }

    /// Decode one scan starting at `pos`, returning the offset of the
    /// marker that follows it.
    fn decode_scan(&mut self, bytes: &[u8], pos: usize, scan: &ScanHeader) -> Result<usize, String> {
        let DecoderState {
            dc_quant,
            dc_tables,
            ac_tables,
            restart_interval,
            frame,
            planes,
        } = self;
        let frame = frame
            .as_ref()
            .ok_or_else(|| "scan before frame header".to_string())?;
        let (hmax, vmax) = frame.max_sampling();
        let (width, height) = (frame.width as usize, frame.height as usize);

        // Resolve tables up front so a missing one fails before any decoding
        let mut tables = Vec::with_capacity(scan.components.len());
        for &(plane, dc, ac) in &scan.components {
            let dc_table = dc_tables[dc]
                .as_ref()
                .ok_or_else(|| format!("missing DC Huffman table {}", dc))?;
            let ac_table = ac_tables[ac]
                .as_ref()
                .ok_or_else(|| format!("missing AC Huffman table {}", ac))?;
            let spec = planes[plane].spec;
            let quant = dc_quant[spec.tq as usize & 3]
                .ok_or_else(|| format!("missing quantization table {}", spec.tq))?;
            tables.push((dc_table, ac_table, quant as i32));
        }

        let single = scan.components.len() == 1;

        // Single-component scans are not interleaved: one block per MCU,
        // covering only the component's own block grid.
        let (mcus_wide, mcus_high) = if single {
            let spec = planes[scan.components[0].0].spec;
            let comp_width = (width * spec.h as usize).div_ceil(hmax as usize);
            let comp_height = (height * spec.v as usize).div_ceil(vmax as usize);
            (comp_width.div_ceil(8), comp_height.div_ceil(8))
        } else {
            (
                width.div_ceil(8 * hmax as usize),
                height.div_ceil(8 * vmax as usize),
            )
        };

        let mut reader = BitReader::new(bytes, pos);
        let mut predictors = vec![0i32; scan.components.len()];
        let restart_interval = *restart_interval as usize;

        for mcu in 0..mcus_wide * mcus_high {
            if restart_interval > 0 && mcu > 0 && mcu % restart_interval == 0 {
                reader.restart()?;
                predictors.iter_mut().for_each(|p| *p = 0);
            }
            let (mcu_x, mcu_y) = (mcu % mcus_wide, mcu / mcus_wide);

            for (index, &(plane, _, _)) in scan.components.iter().enumerate() {
                let (dc_table, ac_table, quant) = tables[index];
                let target = &mut planes[plane];
                let (blocks_h, blocks_v) = if single {
                    (1, 1)
                } else {
                    (target.spec.h as usize, target.spec.v as usize)
                };

                for v in 0..blocks_v {
                    for h in 0..blocks_h {
                        let size = dc_table.decode(&mut reader)?;
                        let diff = reader.receive_extend(size)?;
                        predictors[index] = predictors[index]
                            .checked_add(diff)
                            .ok_or_else(|| "DC coefficient out of range".to_string())?;
                        let dc = predictors[index]
                            .checked_mul(quant)
                            .ok_or_else(|| "DC coefficient out of range".to_string())?;
                        skip_ac(&mut reader, ac_table)?;
                        target.set(mcu_x * blocks_h + h, mcu_y * blocks_v + v, dc);
                    }
                }
            }
        }

        for &(plane, _, _) in &scan.components {
            planes[plane].seen = true;
        }

        Ok(reader.end_of_scan())
    }

    fn into_image(self) -> Result<DecodedImage, String> {
        let frame = self
            .frame
            .ok_or_else(|| "no frame header".to_string())?;
        if let Some(missing) = self.planes.iter().find(|p| !p.seen) {
            return Err(format!("component {} has no scan data", missing.spec.id));
        }

        let (hmax, vmax) = frame.max_sampling();
        let out_width = (frame.width as usize).div_ceil(8);
        let out_height = (frame.height as usize).div_ceil(8);
        let channels = self.planes.len();
        let mut pixels = Vec::with_capacity(out_width * out_height * channels);

        for oy in 0..out_height {
            for ox in 0..out_width {
                let mut samples = [0u8; 3];
                for (sample, plane) in samples.iter_mut().zip(&self.planes) {
                    let bx = ox * plane.spec.h as usize / hmax as usize;
                    let by = oy * plane.spec.v as usize / vmax as usize;
                    *sample = dc_to_sample(plane.get(bx, by));
                }
                if channels == 1 {
                    pixels.push(samples[0]);
                } else {
                    pixels.extend_from_slice(&ycbcr_to_rgb(samples[0], samples[1], samples[2]));
                }
            }
        }

        DecodedImage::from_raw(out_width as u32, out_height as u32, channels as u8, pixels)
            .ok_or_else(|| "DC preview buffer has unexpected size".to_string())
    }
}

/// Walk the 63 AC coefficients of a block without keeping them
fn skip_ac(reader: &mut BitReader<'_>, table: &HuffmanTable) -> Result<(), String> {
    let mut k = 1;
    while k < 64 {
        let symbol = table.decode(reader)?;
        let run = (symbol >> 4) as usize;
        let size = symbol & 0x0F;
        if size == 0 {
            if run == 15 {
                k += 16;
                continue;
            }
            break;
        }
        k += run;
        reader.bits(size)?;
        k += 1;
    }
    Ok(())
}

/// Block average from a dequantized DC coefficient, level-shifted
fn dc_to_sample(dc: i32) -> u8 {
    (((dc as i64 + 4) >> 3) + 128).clamp(0, 255) as u8
}

/// JFIF YCbCr to RGB in 16.16 fixed point
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = (y as i32) << 16;
    let cb = cb as i32 - 128;
    let cr = cr as i32 - 128;
    let round = 1 << 15;

    let r = (y + 91_881 * cr + round) >> 16;
    let g = (y - 22_554 * cb - 46_802 * cr + round) >> 16;
    let b = (y + 116_130 * cb + round) >> 16;

    [
        r.clamp(0, 255) as u8,
        g.clamp(0, 255) as u8,
        b.clamp(0, 255) as u8,
    ]
}
