use crate::PfError;

/// Floating point type used throughout system
pub type Real = f64;

/// Smallest magnitude treated as non-zero by balance and transport code.
pub const ZERO_APPROX: Real = 1e-10;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, PfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PfError::NonFinite { what, value: v })
    }
}

/// Percent difference of `calculated` against `expected`, relative to their mean.
///
/// Returns `Some(0.0)` when both are zero and `None` when the mean is zero
/// but the values differ (the difference is undefined).
pub fn percent_difference(expected: Real, calculated: Real) -> Option<Real> {
    if expected == 0.0 && calculated == 0.0 {
        return Some(0.0);
    }
    let average = 0.5 * (calculated + expected);
    if average == 0.0 {
        return None;
    }
    Some(((calculated - expected) / average).abs() * 100.0)
}

/// Clamp `v` into `[lo, hi]`, reporting whether the value moved.
pub fn clamp_flagged(v: Real, lo: Real, hi: Real) -> (Real, bool) {
    let clamped = v.clamp(lo, hi);
    (clamped, clamped != v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn percent_difference_cases() {
        assert_eq!(percent_difference(0.0, 0.0), Some(0.0));
        assert_eq!(percent_difference(1.0, -1.0), None);
        let d = percent_difference(100.0, 110.0).unwrap();
        assert!((d - 100.0 * 10.0 / 105.0).abs() < 1e-12);
        // Symmetric in magnitude
        assert_eq!(
            percent_difference(100.0, 110.0),
            percent_difference(110.0, 100.0)
        );
    }

    #[test]
    fn clamp_flagged_reports_movement() {
        assert_eq!(clamp_flagged(0.5, 0.0, 1.0), (0.5, false));
        assert_eq!(clamp_flagged(2.0, 0.0, 1.0), (1.0, true));
        assert_eq!(clamp_flagged(-2.0, 0.0, 1.0), (0.0, true));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn percent_difference_is_non_negative(a in 1e-6..1e6_f64, b in 1e-6..1e6_f64) {
            let d = percent_difference(a, b).unwrap();
            prop_assert!(d >= 0.0);
            prop_assert!(d <= 200.0 + 1e-9);
        }
    }
}
