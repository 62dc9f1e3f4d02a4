//! Common utilities for component calculations.

use crate::error::{ComponentError, ComponentResult};
use pf_core::numeric::ensure_finite;

/// Angular velocity below which a shaft is treated as stalled (rad/s)
pub const OMEGA_STALL: f64 = 1e-3;

/// Small epsilon for mass flow rate (kg/s)
pub const EPSILON_MDOT: f64 = 1e-9;

/// Small epsilon for power (W)
pub const EPSILON_POWER: f64 = 1e-9;

/// Ensure a value is finite, returning ComponentError if not.
pub fn check_finite(value: f64, what: &'static str) -> ComponentResult<()> {
    ensure_finite(value, what).map_err(|_| ComponentError::NonPhysical { what })?;
    Ok(())
}

/// Require `value` in `(0, 1]`.
pub fn check_efficiency(value: f64, what: &'static str) -> ComponentResult<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ComponentError::InvalidArg { what });
    }
    Ok(())
}

/// Require a strictly positive finite value.
pub fn check_positive(value: f64, what: &'static str) -> ComponentResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ComponentError::InvalidArg { what });
    }
    Ok(())
}

/// Require a finite, non-negative value.
pub fn check_non_negative(value: f64, what: &'static str) -> ComponentResult<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ComponentError::InvalidArg { what });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_finite() {
        assert!(check_finite(1.0, "test").is_ok());
        assert!(check_finite(f64::INFINITY, "test").is_err());
        assert!(check_finite(f64::NAN, "test").is_err());
    }

    #[test]
    fn test_check_efficiency() {
        assert!(check_efficiency(1.0, "eta").is_ok());
        assert!(check_efficiency(0.0, "eta").is_err());
        assert!(check_efficiency(1.2, "eta").is_err());
        assert!(check_efficiency(f64::NAN, "eta").is_err());
    }
}
