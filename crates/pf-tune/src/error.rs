//! Error types for tuning.

use pf_circuit::CircuitError;
use pf_sim::SimError;
use pf_solver::SolverError;
use thiserror::Error;

use crate::report::TuneReport;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TuneError {
    #[error("Invalid tuning configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Knob '{knob}' expects {expected} paths but '{path}' is a {found}")]
    KnobElementMismatch {
        knob: String,
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Tuning failed: {}", .report.summary())]
    Fatal { report: Box<TuneReport> },

    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),
}

impl From<SolverError> for TuneError {
    fn from(e: SolverError) -> Self {
        TuneError::Sim(e.into())
    }
}

pub type TuneResult<T> = Result<T, TuneError>;
