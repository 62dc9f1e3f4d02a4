use crate::PfError;

/// Floating point type used throughout system
pub type Real = f64;

/// Smallest magnitude treated as a usable denominator.
pub const EPSILON_DENOM: Real = 1e-12;

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

/// Check every element of a slice, reporting the first offender.
pub fn ensure_all_finite(values: &[Real], what: &'static str) -> Result<(), PfError> {
    for &v in values {
        ensure_finite(v, what)?;
    }
    Ok(())
}

/// Clamp a value between min and max.
///
/// NaN maps to `min` so that saturating inputs never poison downstream math.
pub fn clamp(value: Real, min: Real, max: Real) -> Real {
    if value.is_nan() || value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Divide, returning `fallback` when the denominator is too small to trust.
pub fn safe_div(num: Real, den: Real, fallback: Real) -> Real {
    if den.abs() < EPSILON_DENOM {
        fallback
    } else {
        num / den
    }
}

/// Evenly spaced points over `[start, end]`, inclusive.
pub fn linspace(start: Real, end: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as Real;
            (0..n).map(|i| start + step * i as Real).collect()
        }
    }
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
    fn clamp_saturates_and_swallows_nan() {
        assert_eq!(clamp(5.0, 0.0, 10.0), 5.0);
        assert_eq!(clamp(-1.0, 0.0, 10.0), 0.0);
        assert_eq!(clamp(11.0, 0.0, 10.0), 10.0);
        assert_eq!(clamp(Real::NAN, 0.0, 1.0), 0.0);
    }

    #[test]
    fn safe_div_guards_zero() {
        assert_eq!(safe_div(1.0, 0.0, 7.0), 7.0);
        assert_eq!(safe_div(1.0, 2.0, 7.0), 0.5);
    }

    #[test]
    fn linspace_endpoints() {
        let v = linspace(0.0, 10.0, 5);
        assert_eq!(v, vec![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_stays_in_unit_interval(v in -10.0_f64..10.0_f64) {
            let c = clamp(v, 0.0, 1.0);
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
