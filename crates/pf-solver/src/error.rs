//! Error types for circuit solving.

use pf_circuit::CircuitError;
use pf_core::error::PfError;
use thiserror::Error;

/// Errors raised while solving a circuit step.
///
/// Every runtime variant names the circuit and the step it happened on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid time step {dt} s")]
    InvalidTimeStep { dt: f64 },

    #[error("Circuit '{circuit}': node '{node}' has no conducting path to a reference node")]
    FloatingNode { circuit: String, node: String },

    #[error("Circuit '{circuit}' step {step}: system matrix is singular")]
    SingularMatrix { circuit: String, step: u64 },

    #[error("Circuit '{circuit}' step {step}: non-finite {what}")]
    NonFinite {
        circuit: String,
        step: u64,
        what: String,
    },

    #[error(
        "Circuit '{circuit}' step {step}: valve states did not settle after {iterations} solves (oscillating: {oscillating})"
    )]
    ValveNonConvergence {
        circuit: String,
        step: u64,
        iterations: usize,
        oscillating: bool,
    },

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for PfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::InvalidTimeStep { .. } => PfError::InvalidArg { what: "time step" },
            SolverError::FloatingNode { .. } => PfError::Invariant {
                what: "floating node",
            },
            SolverError::SingularMatrix { .. } => PfError::Invariant {
                what: "singular matrix",
            },
            SolverError::NonFinite { .. } => PfError::Invariant {
                what: "non-finite solution",
            },
            SolverError::ValveNonConvergence { .. } => PfError::Invariant {
                what: "valve convergence",
            },
            SolverError::Circuit(inner) => inner.into(),
        }
    }
}
