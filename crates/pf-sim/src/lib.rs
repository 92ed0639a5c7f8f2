//! Fixed-step simulation framework for physioflow networks.
//!
//! Provides:
//! - the `SimModel` trait and a plain `Network` model
//! - strict per-step ordering: pre-process, solve, transport, commit
//! - a decimated recorder and a parallel batch runner for independent instances

pub mod error;
pub mod model;
pub mod sim;

pub use error::{SimError, SimResult};
pub use model::{Network, NetworkSample, SimModel, TransportLayer};
pub use sim::{SimOptions, SimRecord, StepReport, run_batch, run_sim, step};
