//! Consistency checks that only run in debug builds,
//! or when the `debug-checks` feature is on.

/// Tolerance for residuals that should vanish up to rounding.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

pub const fn enabled() -> bool {
    cfg!(any(debug_assertions, feature = "debug-checks"))
}

/// Warn when `residual` is above `tolerance`, returns whether it passed.
#[cfg(any(debug_assertions, feature = "debug-checks"))]
pub fn check_residual(what: &str, residual: f64, tolerance: f64) -> bool {
    if residual <= tolerance {
        return true;
    }
    tracing::warn!(residual, tolerance, "{} check failed", what);
    false
}

#[cfg(not(any(debug_assertions, feature = "debug-checks")))]
#[inline(always)]
pub fn check_residual(_what: &str, _residual: f64, _tolerance: f64) -> bool {
    true
}

/// Largest component-wise difference.
pub fn max_abs_difference(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
