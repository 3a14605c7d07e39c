//! Precision policies.
//!
//! Map-plane coordinates are web-mercator metres (magnitudes up to ~2e7), so
//! every comparison of derived extents goes through a relative tolerance.

use core::cmp::Ordering;

/// Default relative tolerance for extent arithmetic.
pub const EPSILON_REL: f64 = 1e-9;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
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

/// Relative comparison scaled by the larger magnitude (absolute near zero).
pub fn approx_eq(a: f64, b: f64, rel: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= rel * scale
}

#[cfg(test)]
mod tests {
    use super::{approx_eq, canonical_f64, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(canonical_f64(0.0), 0.0);
    }

    #[test]
    fn stable_cmp_is_total_and_deterministic() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
    }

    #[test]
    fn approx_eq_scales_with_magnitude() {
        assert!(approx_eq(2.0e7, 2.0e7 + 1.0e-3, 1e-9));
        assert!(!approx_eq(1.0, 1.001, 1e-9));
        assert!(approx_eq(0.0, 1e-12, 1e-9));
    }
}
