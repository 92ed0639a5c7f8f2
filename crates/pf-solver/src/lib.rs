//! pf-solver: step-wise solution of lumped-parameter circuits.
//!
//! Each step assembles a modified nodal analysis system from the circuit's
//! next-state element values, solves it with an LU factorization, and
//! repeats while valve states change. Capacitors and inductors use backward
//! Euler companion models on a fixed time step.

pub mod calculator;
pub mod config;
pub mod error;
mod mna;
pub mod valve;

pub use calculator::{CircuitCalculator, SolveReport, closed_valves};
pub use config::SolverConfig;
pub use error::{SolverError, SolverResult};
pub use valve::ValveTermination;
