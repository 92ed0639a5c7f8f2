//! Error types for simulation runs.

use pf_circuit::CircuitError;
use pf_solver::SolverError;
use pf_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),

    #[error("Model error: {message}")]
    Model { message: String },
}

pub type SimResult<T> = Result<T, SimError>;
