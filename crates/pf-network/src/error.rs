//! Error types for energy-network operations.

use pf_components::ComponentError;
use pf_core::error::PfError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// No seed for an unknown: no segment override, rotor design value or
    /// rotor-model default.
    #[error("segment '{segment}', line '{line}', propulsor '{propulsor}': missing {what}")]
    MissingDesignValue {
        segment: String,
        line: String,
        propulsor: String,
        what: &'static str,
    },

    /// A seed was found but cannot start Newton iteration.
    #[error("segment '{segment}', line '{line}', propulsor '{propulsor}': invalid {what} {value}")]
    InvalidDesignValue {
        segment: String,
        line: String,
        propulsor: String,
        what: &'static str,
        value: f64,
    },

    #[error("line '{line}': propulsor '{propulsor}' differs from '{first}' ({what})")]
    NotIdentical {
        line: String,
        first: String,
        propulsor: String,
        what: &'static str,
    },

    #[error("Configuration error: {what}")]
    Configuration { what: String },

    #[error("network '{network}' cannot fly a {kind} segment")]
    UnsupportedSegment { network: String, kind: &'static str },

    #[error("State vector error: {what}")]
    StateVector { what: String },

    #[error("Invariant violated: {what}")]
    Invariant { what: String },

    #[error("Component error: {0}")]
    Component(#[from] ComponentError),

    #[error("Core error: {0}")]
    Core(#[from] PfError),
}

pub type NetworkResult<T> = Result<T, NetworkError>;

impl From<NetworkError> for PfError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::MissingDesignValue { .. } => PfError::InvalidArg {
                what: "missing design value",
            },
            NetworkError::InvalidDesignValue { .. } => PfError::InvalidArg {
                what: "invalid design value",
            },
            NetworkError::NotIdentical { .. } => PfError::InvalidArg {
                what: "propulsors not identical",
            },
            NetworkError::Configuration { .. } => PfError::InvalidArg {
                what: "network configuration",
            },
            NetworkError::UnsupportedSegment { .. } => PfError::InvalidArg {
                what: "unsupported segment",
            },
            NetworkError::StateVector { .. } => PfError::InvalidArg {
                what: "state vector",
            },
            NetworkError::Invariant { .. } => PfError::Invariant {
                what: "network invariant",
            },
            NetworkError::Component(c) => c.into(),
            NetworkError::Core(c) => c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_design_value_names_location() {
        let err = NetworkError::MissingDesignValue {
            segment: "cruise".into(),
            line: "bus".into(),
            propulsor: "prop_2".into(),
            what: "rotor power coefficient",
        };
        let msg = err.to_string();
        assert!(msg.contains("cruise"));
        assert!(msg.contains("bus"));
        assert!(msg.contains("prop_2"));
    }
}
