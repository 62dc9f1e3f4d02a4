//! Error types for solver operations.

use pf_core::error::PfError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Residual evaluation failed: {what}")]
    Evaluation { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for PfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { .. } => PfError::InvalidArg {
                what: "problem setup",
            },
            SolverError::Evaluation { .. } => PfError::InvalidArg {
                what: "residual evaluation",
            },
            SolverError::Numeric { .. } => PfError::InvalidArg { what: "numeric" },
        }
    }
}
