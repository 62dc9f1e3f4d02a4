//! Error types for mission evaluation.

use pf_assembly::AssemblyError;
use pf_core::error::PfError;
use pf_network::NetworkError;
use pf_solver::SolverError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MissionError {
    #[error("segment '{segment}': {what}")]
    InvalidSegment { segment: String, what: String },

    #[error("vehicle '{vehicle}': {what}")]
    InvalidVehicle { vehicle: String, what: String },

    #[error("segment '{segment}' did not converge (residual {residual_norm:e})")]
    NotConverged { segment: String, residual_norm: f64 },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Core error: {0}")]
    Core(#[from] PfError),
}

pub type MissionResult<T> = Result<T, MissionError>;

impl From<MissionError> for SolverError {
    fn from(e: MissionError) -> Self {
        SolverError::Evaluation { what: e.to_string() }
    }
}
