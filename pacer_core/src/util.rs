//! Unit conversion helpers shared by the estimator stages.

/// Number of centimetres in one metre.
pub const CM_PER_M: f64 = 100.0;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: f64 = 1_000.0;

/// Convert metres to whole centimetres, rounding to nearest.
/// Returns `None` for non-finite, negative, or out-of-range input.
#[inline]
pub fn m_to_cm(m: f64) -> Option<u32> {
    if !m.is_finite() || m < 0.0 {
        return None;
    }
    let cm = (m * CM_PER_M).round();
    if cm > f64::from(u32::MAX) {
        None
    } else {
        Some(cm as u32)
    }
}

/// Convert centimetres to metres.
#[inline]
pub fn cm_to_m(cm: u32) -> f64 {
    f64::from(cm) / CM_PER_M
}

/// Convert milliseconds to seconds.
#[inline]
pub fn ms_to_sec(ms: u32) -> f64 {
    f64::from(ms) / MILLIS_PER_SEC
}

/// Clamp a floating-point millisecond value into `[0, cap]` as `u32`.
/// NaN maps to `None`; +Inf saturates to `cap`.
#[inline]
pub fn clamp_ms(ms: f64, cap: u32) -> Option<u32> {
    if ms.is_nan() {
        return None;
    }
    let clamped = ms.clamp(0.0, f64::from(cap));
    Some(clamped.round() as u32)
}
