//! Valve settling: re-solve until every valve agrees with its solution.

use std::collections::HashSet;

use pf_circuit::{Circuit, Element, GateState};
use pf_core::{CircuitDomain, PathId, Real};

use crate::config::SolverConfig;
use crate::mna::Solution;

/// How a settling sweep ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValveTermination {
    /// Every valve state is consistent with the last solve.
    Settled { iterations: usize },
    /// A valve configuration repeated without settling.
    Oscillating { iterations: usize },
    /// The iteration cap was reached.
    Exhausted { iterations: usize },
}

/// What the sweep wants after inspecting a solution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SweepStep {
    Done(ValveTermination),
    Flip(Vec<PathId>),
}

/// State of the valve loop within one step.
#[derive(Debug)]
pub(crate) struct ValveSweep {
    valves: Vec<PathId>,
    seen: HashSet<Vec<GateState>>,
    iterations: usize,
    flipped: usize,
    max_iterations: usize,
    flux_tol: Real,
    potential_tol: Real,
}

impl ValveSweep {
    pub fn new<D: CircuitDomain>(circuit: &Circuit<D>, config: &SolverConfig) -> Self {
        let valves = circuit
            .paths()
            .iter()
            .filter(|p| p.element == Element::Valve)
            .map(|p| p.id)
            .collect();
        Self {
            valves,
            seen: HashSet::new(),
            iterations: 0,
            flipped: 0,
            max_iterations: config.max_valve_iterations.max(1),
            flux_tol: config.valve_flux_tolerance,
            potential_tol: config.valve_potential_tolerance,
        }
    }

    pub fn flipped(&self) -> usize {
        self.flipped
    }

    fn configuration<D: CircuitDomain>(&self, circuit: &Circuit<D>) -> Vec<GateState> {
        self.valves
            .iter()
            .filter_map(|&id| circuit.path(id))
            .map(|p| p.next.gate.unwrap_or_default())
            .collect()
    }

    /// Inspect one solution. An open valve with reverse flux closes; a closed
    /// valve with a forward potential difference opens.
    pub fn inspect<D: CircuitDomain>(&mut self, circuit: &Circuit<D>, solution: &Solution) -> SweepStep {
        self.iterations += 1;
        self.seen.insert(self.configuration(circuit));

        let mut flips = Vec::new();
        for &id in &self.valves {
            let Some(p) = circuit.path(id) else { continue };
            let wrong = match p.next.gate.unwrap_or_default() {
                GateState::Open => solution.fluxes[id.slot()] < -self.flux_tol,
                GateState::Closed => {
                    let forward = solution.potentials[p.source.slot()]
                        - solution.potentials[p.target.slot()];
                    forward > self.potential_tol
                }
            };
            if wrong {
                flips.push(id);
            }
        }

        if flips.is_empty() {
            return SweepStep::Done(ValveTermination::Settled {
                iterations: self.iterations,
            });
        }
        if self.iterations >= self.max_iterations {
            return SweepStep::Done(ValveTermination::Exhausted {
                iterations: self.iterations,
            });
        }

        let mut proposed = self.configuration(circuit);
        for (slot, id) in self.valves.iter().enumerate() {
            if flips.contains(id) {
                proposed[slot] = proposed[slot].flipped();
            }
        }
        if self.seen.contains(&proposed) {
            return SweepStep::Done(ValveTermination::Oscillating {
                iterations: self.iterations,
            });
        }

        self.flipped += flips.len();
        SweepStep::Flip(flips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_circuit::CircuitBuilder;
    use pf_core::Fluid;

    fn one_valve() -> (Circuit<Fluid>, PathId) {
        let mut b = CircuitBuilder::<Fluid>::new("mitral");
        let g = b.add_reference_node("ground", 0.0);
        let a = b.add_node("atrium");
        let v = b.add_valve("valve", a, g);
        b.add_resistor("leak", a, g, 10.0);
        (b.build().unwrap(), v)
    }

    fn solution(atrium: Real, valve_flux: Real) -> Solution {
        Solution {
            potentials: vec![0.0, atrium],
            fluxes: vec![valve_flux, atrium / 10.0],
        }
    }

    fn set_gate(circuit: &mut Circuit<Fluid>, id: PathId, state: GateState) {
        let bounds = *circuit.bounds();
        let next = circuit.path_next_mut(id).unwrap();
        next.gate = Some(state);
        next.value = bounds.gate_resistance(state);
    }

    #[test]
    fn consistent_solution_settles() {
        let (c, _) = one_valve();
        let mut sweep = ValveSweep::new(&c, &SolverConfig::default());
        assert_eq!(
            sweep.inspect(&c, &solution(5.0, 1.0)),
            SweepStep::Done(ValveTermination::Settled { iterations: 1 })
        );
    }

    #[test]
    fn repeated_configuration_is_oscillating() {
        let (mut c, v) = one_valve();
        let mut sweep = ValveSweep::new(&c, &SolverConfig::default());

        // Open with reverse flux: close it.
        assert_eq!(sweep.inspect(&c, &solution(-5.0, -1.0)), SweepStep::Flip(vec![v]));
        set_gate(&mut c, v, GateState::Closed);

        // Closed with a forward gradient would reopen into the first configuration.
        assert_eq!(
            sweep.inspect(&c, &solution(5.0, 0.0)),
            SweepStep::Done(ValveTermination::Oscillating { iterations: 2 })
        );
        assert_eq!(sweep.flipped(), 1);
    }

    #[test]
    fn iteration_cap_exhausts() {
        let (c, _) = one_valve();
        let config = SolverConfig {
            max_valve_iterations: 1,
            ..SolverConfig::default()
        };
        let mut sweep = ValveSweep::new(&c, &config);
        assert_eq!(
            sweep.inspect(&c, &solution(-5.0, -1.0)),
            SweepStep::Done(ValveTermination::Exhausted { iterations: 1 })
        );
    }
}
