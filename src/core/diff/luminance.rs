//! Integer luminance and per-pixel change tests.

/// BT.601 luma weights scaled by 256 (77 + 150 + 29 = 256)
const R_WEIGHT: u32 = 77;
const G_WEIGHT: u32 = 150;
const B_WEIGHT: u32 = 29;

/// Fused luminance of an RGB triple, `(77R + 150G + 29B) >> 8`
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((R_WEIGHT * r as u32 + G_WEIGHT * g as u32 + B_WEIGHT * b as u32) >> 8) as u8
}

/// Whether the luminance of two RGB pixels differs by more than `threshold`.
///
/// Both slices must hold at least three channels; shorter input never counts
/// as changed.
#[inline]
pub fn luminance_changed(a: &[u8], b: &[u8], threshold: u8) -> bool {
    match (a, b) {
        ([ar, ag, ab, ..], [br, bg, bb, ..]) => {
            let diff = luma(*ar, *ag, *ab) as i16 - luma(*br, *bg, *bb) as i16;
            diff.unsigned_abs() > threshold as u16
        }
        _ => false,
    }
}

/// Whether any channel differs by more than `threshold`
#[inline]
pub fn any_channel_changed(a: &[u8], b: &[u8], threshold: u8) -> bool {
    a.iter()
        .zip(b)
        .any(|(&x, &y)| (x as i16 - y as i16).unsigned_abs() > threshold as u16)
}
