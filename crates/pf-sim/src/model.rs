//! The model trait driven by the step loop, and a ready-made fluid network model.

use pf_circuit::Circuit;
use pf_core::{CircuitDomain, Fluid, Real};
use pf_transport::{CompartmentGraph, CompartmentManager, TransportReport, transport};
use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// A simulated system built around one circuit.
///
/// Each step runs `pre_process` (write next-state sources and element values),
/// then the circuit solve, then `transport`, then the commit.
pub trait SimModel {
    type Domain: CircuitDomain;
    type Sample: Clone;

    fn circuit(&self) -> &Circuit<Self::Domain>;

    fn circuit_mut(&mut self) -> &mut Circuit<Self::Domain>;

    /// Set boundary conditions for the step that ends at `t`.
    fn pre_process(&mut self, _t: Real) -> SimResult<()> {
        Ok(())
    }

    /// Move substances along the freshly solved (not yet committed) fluxes.
    fn transport(&mut self, _dt: Real) -> SimResult<Option<TransportReport>> {
        Ok(None)
    }

    /// Snapshot of whatever the model wants recorded, taken after the commit.
    fn sample(&self, t: Real) -> Self::Sample;
}

/// Substance transport attached to a fluid circuit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportLayer {
    pub manager: CompartmentManager,
    pub graph: CompartmentGraph,
}

/// Committed potentials and fluxes in circuit order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub t: Real,
    pub potentials: Vec<Real>,
    pub fluxes: Vec<Real>,
}

/// A circuit with optional transport and no boundary-condition logic of its own.
#[derive(Clone, Debug)]
pub struct Network<D: CircuitDomain> {
    pub circuit: Circuit<D>,
    pub transport: Option<TransportLayer>,
}

impl<D: CircuitDomain> Network<D> {
    pub fn new(circuit: Circuit<D>) -> Self {
        Self {
            circuit,
            transport: None,
        }
    }
}

fn network_sample<D: CircuitDomain>(circuit: &Circuit<D>, t: Real) -> NetworkSample {
    NetworkSample {
        t,
        potentials: circuit.nodes().iter().map(|n| n.current.potential).collect(),
        fluxes: circuit.paths().iter().map(|p| p.current.flux).collect(),
    }
}

impl SimModel for Network<Fluid> {
    type Domain = Fluid;
    type Sample = NetworkSample;

    fn circuit(&self) -> &Circuit<Fluid> {
        &self.circuit
    }

    fn circuit_mut(&mut self) -> &mut Circuit<Fluid> {
        &mut self.circuit
    }

    fn transport(&mut self, dt: Real) -> SimResult<Option<TransportReport>> {
        let Some(layer) = self.transport.as_mut() else {
            return Ok(None);
        };
        layer.manager.sync_from_circuit(&self.circuit)?;
        Ok(Some(transport(&layer.graph, &mut layer.manager, dt)?))
    }

    fn sample(&self, t: Real) -> NetworkSample {
        network_sample(&self.circuit, t)
    }
}

impl SimModel for Network<pf_core::Thermal> {
    type Domain = pf_core::Thermal;
    type Sample = NetworkSample;

    fn circuit(&self) -> &Circuit<pf_core::Thermal> {
        &self.circuit
    }

    fn circuit_mut(&mut self) -> &mut Circuit<pf_core::Thermal> {
        &mut self.circuit
    }

    fn sample(&self, t: Real) -> NetworkSample {
        network_sample(&self.circuit, t)
    }
}
