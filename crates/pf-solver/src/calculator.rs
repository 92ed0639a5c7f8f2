//! Step-wise circuit calculator.

use pf_circuit::{Circuit, Element, GateState};
use pf_core::{CircuitDomain, Real, Time};

use crate::config::SolverConfig;
use crate::error::{SolverError, SolverResult};
use crate::mna::{self, Layout, SolveOutcome, Solution};
use crate::valve::{SweepStep, ValveSweep, ValveTermination};

/// Summary of one `process` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolveReport {
    pub step: u64,
    pub valve_iterations: usize,
    pub valves_flipped: usize,
    /// Stored quantities that would have gone negative and were clamped to zero.
    pub quantities_clamped: usize,
}

/// Solves a circuit one time step at a time.
///
/// `process` fills the circuit's next state from its next-state element values
/// and reference potentials; `post_process` commits it and advances the step.
#[derive(Clone, Debug)]
pub struct CircuitCalculator {
    dt: Real,
    config: SolverConfig,
    step: u64,
}

impl CircuitCalculator {
    /// Create a calculator with a fixed time step in seconds.
    pub fn new(dt_s: Real, config: SolverConfig) -> SolverResult<Self> {
        if !dt_s.is_finite() || dt_s <= 0.0 {
            return Err(SolverError::InvalidTimeStep { dt: dt_s });
        }
        Ok(Self {
            dt: dt_s,
            config,
            step: 0,
        })
    }

    pub fn with_time_step(dt: Time, config: SolverConfig) -> SolverResult<Self> {
        Self::new(dt.value, config)
    }

    pub fn dt(&self) -> Real {
        self.dt
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve the next state of `circuit` for this step.
    ///
    /// The unknown layout is derived from `circuit` on every call, so one
    /// calculator may drive several circuits.
    pub fn process<D: CircuitDomain>(&mut self, circuit: &mut Circuit<D>) -> SolverResult<SolveReport> {
        if self.config.check_connectivity {
            if let Some(&id) = circuit.find_floating_nodes().first() {
                let node = circuit.node(id).map(|n| n.name.clone()).unwrap_or_default();
                tracing::error!(circuit = %circuit.name(), %node, "floating node");
                return Err(SolverError::FloatingNode {
                    circuit: circuit.name().to_string(),
                    node,
                });
            }
        }

        let layout = Layout::new(circuit);
        let mut sweep = ValveSweep::new(circuit, &self.config);

        let (solution, iterations) = loop {
            let solution = match mna::solve_once(&layout, circuit, self.dt) {
                SolveOutcome::Solved(s) => s,
                SolveOutcome::Singular => {
                    tracing::error!(circuit = %circuit.name(), step = self.step, "singular system");
                    return Err(SolverError::SingularMatrix {
                        circuit: circuit.name().to_string(),
                        step: self.step,
                    });
                }
            };
            self.check_finite(circuit, &solution)?;

            match sweep.inspect(circuit, &solution) {
                SweepStep::Done(ValveTermination::Settled { iterations }) => {
                    break (solution, iterations);
                }
                SweepStep::Done(termination) => {
                    let (iterations, oscillating) = match termination {
                        ValveTermination::Oscillating { iterations } => (iterations, true),
                        ValveTermination::Exhausted { iterations }
                        | ValveTermination::Settled { iterations } => (iterations, false),
                    };
                    tracing::error!(
                        circuit = %circuit.name(),
                        step = self.step,
                        iterations,
                        oscillating,
                        "valve states did not settle"
                    );
                    return Err(SolverError::ValveNonConvergence {
                        circuit: circuit.name().to_string(),
                        step: self.step,
                        iterations,
                        oscillating,
                    });
                }
                SweepStep::Flip(ids) => {
                    let bounds = *circuit.bounds();
                    for id in ids {
                        if let Some(next) = circuit.path_next_mut(id) {
                            let state = next.gate.unwrap_or_default().flipped();
                            next.gate = Some(state);
                            next.value = bounds.gate_resistance(state);
                        }
                    }
                }
            }
        };

        self.write_solution(circuit, &solution);
        let quantities_clamped = self.update_quantities(circuit);

        let report = SolveReport {
            step: self.step,
            valve_iterations: iterations,
            valves_flipped: sweep.flipped(),
            quantities_clamped,
        };
        tracing::debug!(circuit = %circuit.name(), ?report, "solved");
        Ok(report)
    }

    /// Commit the solved next state and advance the step counter.
    ///
    /// Committing twice without an intervening `process` leaves the circuit unchanged.
    pub fn post_process<D: CircuitDomain>(&mut self, circuit: &mut Circuit<D>) {
        circuit.commit();
        self.step += 1;
    }

    fn check_finite<D: CircuitDomain>(&self, circuit: &Circuit<D>, solution: &Solution) -> SolverResult<()> {
        let bad_node = circuit
            .nodes()
            .iter()
            .zip(&solution.potentials)
            .find(|(_, v)| !v.is_finite())
            .map(|(n, _)| format!("potential at node '{}'", n.name));
        let bad_path = || {
            circuit
                .paths()
                .iter()
                .zip(&solution.fluxes)
                .find(|(_, v)| !v.is_finite())
                .map(|(p, _)| format!("flux on path '{}'", p.name))
        };
        match bad_node.or_else(bad_path) {
            Some(what) => {
                tracing::error!(circuit = %circuit.name(), step = self.step, %what, "non-finite solution");
                Err(SolverError::NonFinite {
                    circuit: circuit.name().to_string(),
                    step: self.step,
                    what,
                })
            }
            None => Ok(()),
        }
    }

    fn write_solution<D: CircuitDomain>(&self, circuit: &mut Circuit<D>, solution: &Solution) {
        for (slot, &potential) in solution.potentials.iter().enumerate() {
            if let Some(next) = circuit.node_next_mut(pf_core::NodeId::from_usize(slot)) {
                next.potential = potential;
            }
        }
        for (slot, &flux) in solution.fluxes.iter().enumerate() {
            if let Some(next) = circuit.path_next_mut(pf_core::PathId::from_usize(slot)) {
                next.flux = flux;
            }
        }
    }

    /// Integrate capacitor flux into the stored quantity of each capacitor's source node.
    fn update_quantities<D: CircuitDomain>(&self, circuit: &mut Circuit<D>) -> usize {
        let mut next_quantity: Vec<Option<Real>> =
            circuit.nodes().iter().map(|n| n.current.quantity).collect();
        for p in circuit.paths().iter().filter(|p| p.element == Element::Capacitor) {
            if let Some(q) = next_quantity[p.source.slot()].as_mut() {
                *q += p.next.flux * self.dt;
            }
        }

        let mut clamped = 0;
        for (slot, quantity) in next_quantity.into_iter().enumerate() {
            let id = pf_core::NodeId::from_usize(slot);
            let quantity = match quantity {
                Some(q) if q < 0.0 => {
                    clamped += 1;
                    let node = circuit.node(id).map(|n| n.name.as_str()).unwrap_or_default();
                    tracing::warn!(
                        circuit = %circuit.name(),
                        node,
                        quantity = q,
                        "negative stored quantity clamped to zero"
                    );
                    Some(0.0)
                }
                other => other,
            };
            if let Some(next) = circuit.node_next_mut(id) {
                next.quantity = quantity;
            }
        }
        clamped
    }
}

/// Count closed valves in the next state.
pub fn closed_valves<D: CircuitDomain>(circuit: &Circuit<D>) -> usize {
    circuit
        .paths()
        .iter()
        .filter(|p| p.element == Element::Valve && p.next.gate == Some(GateState::Closed))
        .count()
}
