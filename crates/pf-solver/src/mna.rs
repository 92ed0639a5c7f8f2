//! Modified nodal analysis: assemble and solve one linear system per solve.
//!
//! Unknowns are the potentials of non-reference nodes followed by one branch
//! flux per potential source and inductor. Reference potentials enter the
//! right-hand side.

use nalgebra::{DMatrix, DVector};
use pf_circuit::{Circuit, Element, GateState};
use pf_core::{CircuitDomain, Real};

/// A node terminal as seen by the system: an unknown or an imposed potential.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Term {
    Unknown(usize),
    Fixed(Real),
}

/// Mapping from circuit entities to unknown indices, derived for each solve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Layout {
    pub node_index: Vec<Option<usize>>,
    pub branch_index: Vec<Option<usize>>,
    pub size: usize,
}

impl Layout {
    pub fn new<D: CircuitDomain>(circuit: &Circuit<D>) -> Self {
        let mut size = 0;
        let node_index = circuit
            .nodes()
            .iter()
            .map(|n| {
                (!n.reference).then(|| {
                    size += 1;
                    size - 1
                })
            })
            .collect();
        let branch_index = circuit
            .paths()
            .iter()
            .map(|p| {
                matches!(p.element, Element::PotentialSource | Element::Inductor).then(|| {
                    size += 1;
                    size - 1
                })
            })
            .collect();
        Self {
            node_index,
            branch_index,
            size,
        }
    }
}

pub(crate) struct MnaSystem {
    a: DMatrix<Real>,
    z: DVector<Real>,
}

impl MnaSystem {
    pub fn new(size: usize) -> Self {
        Self {
            a: DMatrix::zeros(size, size),
            z: DVector::zeros(size),
        }
    }

    fn add(&mut self, row: usize, col: Term, coef: Real) {
        match col {
            Term::Unknown(j) => self.a[(row, j)] += coef,
            Term::Fixed(v) => self.z[row] -= coef * v,
        }
    }

    /// Conductance `g` between two terminals.
    pub fn stamp_conductance(&mut self, n1: Term, n2: Term, g: Real) {
        if let Term::Unknown(i) = n1 {
            self.add(i, n1, g);
            self.add(i, n2, -g);
        }
        if let Term::Unknown(j) = n2 {
            self.add(j, n2, g);
            self.add(j, n1, -g);
        }
    }

    /// Flux `f` leaving `from` and entering `to`.
    pub fn stamp_flux(&mut self, from: Term, to: Term, f: Real) {
        if let Term::Unknown(i) = from {
            self.z[i] -= f;
        }
        if let Term::Unknown(j) = to {
            self.z[j] += f;
        }
    }

    /// Branch with its own flux unknown `br` running from `n1` to `n2`:
    /// P[n1] - P[n2] + own * F = rhs
    pub fn stamp_branch(&mut self, n1: Term, n2: Term, br: usize, own: Real, rhs: Real) {
        if let Term::Unknown(i) = n1 {
            self.a[(i, br)] += 1.0;
        }
        if let Term::Unknown(j) = n2 {
            self.a[(j, br)] -= 1.0;
        }
        self.add(br, n1, 1.0);
        self.add(br, n2, -1.0);
        self.a[(br, br)] += own;
        self.z[br] += rhs;
    }

    pub fn solve(self) -> Option<DVector<Real>> {
        self.a.lu().solve(&self.z)
    }
}

/// Potentials and fluxes of one solve, indexed by node and path slot.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Solution {
    pub potentials: Vec<Real>,
    pub fluxes: Vec<Real>,
}

/// Outcome of a single linear solve.
pub(crate) enum SolveOutcome {
    Solved(Solution),
    Singular,
}

fn term<D: CircuitDomain>(layout: &Layout, circuit: &Circuit<D>, slot: usize) -> Term {
    match layout.node_index[slot] {
        Some(i) => Term::Unknown(i),
        None => Term::Fixed(circuit.nodes()[slot].next.potential),
    }
}

/// Assemble the system for the circuit's next-state element values and solve it.
pub(crate) fn solve_once<D: CircuitDomain>(
    layout: &Layout,
    circuit: &Circuit<D>,
    dt: Real,
) -> SolveOutcome {
    let mut sys = MnaSystem::new(layout.size);

    for path in circuit.paths() {
        let s = term(layout, circuit, path.source.slot());
        let t = term(layout, circuit, path.target.slot());
        let value = path.next.value;
        match path.element {
            Element::Resistor | Element::Switch | Element::Valve => {
                sys.stamp_conductance(s, t, 1.0 / value);
            }
            Element::Capacitor => {
                // Backward Euler companion: conductance C/dt plus a history source.
                let g = value / dt;
                let history = g * committed_drop(circuit, path.source.slot(), path.target.slot());
                sys.stamp_conductance(s, t, g);
                sys.stamp_flux(t, s, history);
            }
            Element::FluxSource => sys.stamp_flux(s, t, value),
            Element::PotentialSource => {
                if let Some(br) = layout.branch_index[path.id.slot()] {
                    sys.stamp_branch(s, t, br, 0.0, -value);
                }
            }
            Element::Inductor => {
                if let Some(br) = layout.branch_index[path.id.slot()] {
                    let l_dt = value / dt;
                    sys.stamp_branch(s, t, br, -l_dt, -l_dt * path.current.flux);
                }
            }
        }
    }

    let x = if layout.size == 0 {
        DVector::zeros(0)
    } else {
        match sys.solve() {
            Some(x) => x,
            None => return SolveOutcome::Singular,
        }
    };

    let potentials: Vec<Real> = circuit
        .nodes()
        .iter()
        .zip(&layout.node_index)
        .map(|(n, idx)| idx.map_or(n.next.potential, |i| x[i]))
        .collect();

    let fluxes = circuit
        .paths()
        .iter()
        .map(|p| {
            let drop = potentials[p.source.slot()] - potentials[p.target.slot()];
            match p.element {
                Element::Valve if p.next.gate == Some(GateState::Closed) => 0.0,
                Element::Resistor | Element::Switch | Element::Valve => drop / p.next.value,
                Element::Capacitor => {
                    let g = p.next.value / dt;
                    g * (drop - committed_drop(circuit, p.source.slot(), p.target.slot()))
                }
                Element::FluxSource => p.next.value,
                Element::PotentialSource | Element::Inductor => layout.branch_index[p.id.slot()]
                    .map_or(0.0, |br| x[br]),
            }
        })
        .collect();

    SolveOutcome::Solved(Solution { potentials, fluxes })
}

fn committed_drop<D: CircuitDomain>(circuit: &Circuit<D>, s: usize, t: usize) -> Real {
    let nodes = circuit.nodes();
    nodes[s].current.potential - nodes[t].current.potential
}
