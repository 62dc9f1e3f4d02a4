//! Error types for component operations.

use pf_core::error::PfError;
use thiserror::Error;

/// Errors that can occur during component calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Angular velocity too small to divide by.
    #[error("Stall singularity in {tag}: omega = {omega} rad/s")]
    StallSingularity { tag: String, omega: f64 },

    #[error("Design point infeasible: {what}")]
    Infeasible { what: String },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<ComponentError> for PfError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::NonPhysical { what } => PfError::InvalidArg { what },
            ComponentError::InvalidArg { what } => PfError::InvalidArg { what },
            ComponentError::StallSingularity { omega, .. } => PfError::NonFinite {
                what: "angular velocity at stall",
                value: omega,
            },
            ComponentError::Infeasible { .. } => PfError::InvalidArg {
                what: "infeasible design point",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::StallSingularity {
            tag: "motor".into(),
            omega: 0.0,
        };
        assert!(err.to_string().contains("motor"));
    }

    #[test]
    fn error_conversion() {
        let comp_err = ComponentError::InvalidArg { what: "test" };
        let pf_err: PfError = comp_err.into();
        assert!(matches!(pf_err, PfError::InvalidArg { .. }));
    }
}
