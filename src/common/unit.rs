//! Unit conversion utilities.
//!
//! Shape geometry is expressed in English Metric Units (EMU), the integer
//! distance unit of DrawingML.

pub const EMUS_PER_INCH: i64 = 914_400;
pub const EMUS_PER_CM: i64 = 360_000;
pub const EMUS_PER_PT: i64 = 12_700;

/// Width of a 4:3 slide (10 inches), used when `p:sldSz` is absent.
pub const DEFAULT_SLIDE_WIDTH: i64 = 10 * EMUS_PER_INCH;

/// Height of a 4:3 slide (7.5 inches), used when `p:sldSz` is absent.
pub const DEFAULT_SLIDE_HEIGHT: i64 = 6_858_000;

#[inline]
pub fn pt_to_emu_f64(pt: f64) -> i64 {
    (pt * EMUS_PER_PT as f64) as i64
}

#[inline]
pub fn emu_to_pt_f64(emu: i64) -> f64 {
    emu as f64 / EMUS_PER_PT as f64
}

#[inline]
pub fn emu_to_inches_f64(emu: i64) -> f64 {
    emu as f64 / EMUS_PER_INCH as f64
}

#[inline]
pub fn cm_to_emu_f64(cm: f64) -> i64 {
    (cm * EMUS_PER_CM as f64).round() as i64
}

/// Parse a DrawingML coordinate attribute.
///
/// Coordinates are signed 64-bit integers; anything else is rejected.
#[inline]
pub fn parse_emu(value: &str) -> Option<i64> {
    atoi_simd::parse::<i64, false, false>(value.trim().as_bytes()).ok()
}
