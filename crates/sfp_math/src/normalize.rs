//! Normalization primitives.
//!
//! Raw style measurements span wildly different scales: element areas cover
//! three or more orders of magnitude, dispersion measures are unbounded,
//! pixel values sit in narrow bands. Each primitive here maps one of those
//! shapes into `[0, 1]` with an explicit guard for every degenerate input.

/// Clamp into `[0, 1]`, mapping non-finite input to `0.0`.
#[inline]
pub fn clamp01(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Linear map of `x` from `[lo, hi]` onto `[0, 1]`, clamped.
///
/// Returns `0.0` when the range is empty or inverted (`hi <= lo`).
pub fn normalize_linear(x: f64, lo: f64, hi: f64) -> f64 {
    if !x.is_finite() || !(hi > lo) {
        return 0.0;
    }
    clamp01((x - lo) / (hi - lo))
}

/// Logarithmic compression for ratios spanning several orders of magnitude.
///
/// `ln(1 + x) / (ln(1 + x) + ln(1 + midpoint))`: monotone in `x`, `0` at
/// zero, exactly `0.5` at the midpoint, and asymptotically below `1`.
/// Non-positive input or midpoint yields `0.0`.
pub fn normalize_log(x: f64, midpoint: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 || midpoint <= 0.0 {
        return 0.0;
    }
    let lx = x.ln_1p();
    let lm = midpoint.ln_1p();
    lx / (lx + lm)
}

/// Percentile-anchored map using observed 10th/90th percentile anchors.
///
/// `[0, p10]` maps linearly onto `[0, 0.1]`, `[p10, p90]` onto `[0.1, 0.9]`,
/// and values above `p90` approach `1.0` exponentially without reaching it.
/// Anchors must satisfy `p90 > p10 >= 0`; otherwise the result is `0.0`.
pub fn normalize_percentile(x: f64, p10: f64, p90: f64) -> f64 {
    if !x.is_finite() || x <= 0.0 || !(p90 > p10) || p10 < 0.0 {
        return 0.0;
    }
    if x < p10 {
        return 0.1 * (x / p10);
    }
    if x <= p90 {
        return 0.1 + 0.8 * (x - p10) / (p90 - p10);
    }
    let overshoot = (x - p90) / (p90 - p10);
    0.9 + 0.1 * (1.0 - (-overshoot).exp())
}

/// Falling logistic used to compress unbounded dispersion measures.
///
/// `1 / (1 + e^(steepness * (x - midpoint)))`: a small `x` (consistent
/// input) maps near `1`, a large `x` (chaotic input) decays toward a low
/// floor. The exponent is clamped so the result stays strictly inside
/// `(0, 1)` in f64 arithmetic.
pub fn sigmoid(x: f64, steepness: f64, midpoint: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    // Beyond |36| the logistic saturates to exactly 0.0 or 1.0 in f64.
    let t = (steepness * (x - midpoint)).clamp(-36.0, 36.0);
    1.0 / (1.0 + t.exp())
}
