use serde::{Deserialize, Serialize};

/// Circuit solver configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum full solves per step while valve states settle.
    pub max_valve_iterations: usize,
    /// Reverse flux (native units) an open valve tolerates before closing.
    pub valve_flux_tolerance: f64,
    /// Forward potential difference a closed valve needs before opening.
    pub valve_potential_tolerance: f64,
    /// Reject circuits with nodes that cannot reach a reference node.
    pub check_connectivity: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_valve_iterations: 50,
            valve_flux_tolerance: 1e-10,
            valve_potential_tolerance: 0.0,
            check_connectivity: true,
        }
    }
}
