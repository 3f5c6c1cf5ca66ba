//! Deterministic float ordering.
//!
//! Ray hits and depth sorts compare distances; these helpers give those
//! comparisons a total order so ties and NaNs never reorder between runs.

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or use them in ordered keys.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Keeps `v` within `[lo, hi]` without panicking when `lo > hi`.
///
/// Evaluates as `max(lo, min(hi, v))`: an inverted range yields `lo`, and a
/// NaN `v` yields the upper bound pulled back to `lo` if needed.
pub fn clamp_lenient(v: f64, lo: f64, hi: f64) -> f64 {
    v.min(hi).max(lo)
}
