//! Incremental circuit builder and circuit composition.

use std::collections::HashMap;
use std::marker::PhantomData;

use pf_core::{CircuitDomain, NodeId, PathId, Real};

use crate::circuit::Circuit;
use crate::element::{Element, ElementBounds, GateState};
use crate::error::{CircuitError, CircuitResult};
use crate::node::Node;
use crate::path::Path;
use crate::validate;

/// Builder for constructing a circuit incrementally.
///
/// Nodes and paths are added with `add_*`, then `build()` validates and
/// freezes the topology into a [`Circuit`].
#[derive(Debug, Clone)]
pub struct CircuitBuilder<D: CircuitDomain> {
    name: String,
    bounds: ElementBounds,
    nodes: Vec<Node>,
    paths: Vec<Path>,
    _domain: PhantomData<D>,
}

/// Where the nodes and paths of a composed circuit landed in the combined one.
///
/// Indexed by the slot of the id in the source circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitRemap {
    pub nodes: Vec<NodeId>,
    pub paths: Vec<PathId>,
}

impl CircuitRemap {
    pub fn node(&self, original: NodeId) -> Option<NodeId> {
        self.nodes.get(original.slot()).copied()
    }

    pub fn path(&self, original: PathId) -> Option<PathId> {
        self.paths.get(original.slot()).copied()
    }
}

impl<D: CircuitDomain> CircuitBuilder<D> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: ElementBounds::default(),
            nodes: Vec::new(),
            paths: Vec::new(),
            _domain: PhantomData,
        }
    }

    pub fn with_bounds(mut self, bounds: ElementBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a free node at zero potential.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId::from_usize(self.nodes.len());
        self.nodes.push(Node::new(id, name, 0.0));
        id
    }

    /// Add a reference node whose potential is imposed.
    pub fn add_reference_node(&mut self, name: impl Into<String>, potential: Real) -> NodeId {
        let id = NodeId::from_usize(self.nodes.len());
        let mut node = Node::new(id, name, potential);
        node.reference = true;
        self.nodes.push(node);
        id
    }

    /// Set the initial potential of a node (both time levels).
    pub fn set_potential(&mut self, node: NodeId, potential: Real) -> CircuitResult<()> {
        let n = self
            .nodes
            .get_mut(node.slot())
            .ok_or(CircuitError::UnknownNode { id: node })?;
        n.current.potential = potential;
        n.next.potential = potential;
        Ok(())
    }

    /// Set the baseline stored quantity of a node (both time levels).
    pub fn set_quantity(&mut self, node: NodeId, quantity: Real) -> CircuitResult<()> {
        let n = self
            .nodes
            .get_mut(node.slot())
            .ok_or(CircuitError::UnknownNode { id: node })?;
        n.baseline_quantity = Some(quantity);
        n.current.quantity = Some(quantity);
        n.next.quantity = Some(quantity);
        Ok(())
    }

    /// Add a path carrying `element` with the given baseline value.
    ///
    /// Gates ignore `value` and start at the resistance of their initial state.
    pub fn add_path(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        element: Element,
        value: Real,
    ) -> PathId {
        let id = PathId::from_usize(self.paths.len());
        let (value, gate) = if element.is_gate() {
            (self.bounds.gate_resistance(GateState::Open), Some(GateState::Open))
        } else {
            (value, None)
        };
        self.paths
            .push(Path::new(id, name, source, target, element, value, gate));
        id
    }

    pub fn add_resistor(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        resistance: Real,
    ) -> PathId {
        self.add_path(name, source, target, Element::Resistor, resistance)
    }

    pub fn add_capacitor(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        compliance: Real,
    ) -> PathId {
        self.add_path(name, source, target, Element::Capacitor, compliance)
    }

    pub fn add_inductor(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        inertance: Real,
    ) -> PathId {
        self.add_path(name, source, target, Element::Inductor, inertance)
    }

    pub fn add_potential_source(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        rise: Real,
    ) -> PathId {
        self.add_path(name, source, target, Element::PotentialSource, rise)
    }

    pub fn add_flux_source(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        flux: Real,
    ) -> PathId {
        self.add_path(name, source, target, Element::FluxSource, flux)
    }

    pub fn add_switch(
        &mut self,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        state: GateState,
    ) -> PathId {
        let id = self.add_path(name, source, target, Element::Switch, 0.0);
        self.set_gate(id, state);
        id
    }

    /// Add a valve. It conducts from `source` to `target` and blocks reverse flux.
    pub fn add_valve(&mut self, name: impl Into<String>, source: NodeId, target: NodeId) -> PathId {
        self.add_path(name, source, target, Element::Valve, 0.0)
    }

    pub(crate) fn set_gate(&mut self, id: PathId, state: GateState) {
        let resistance = self.bounds.gate_resistance(state);
        if let Some(p) = self.paths.get_mut(id.slot()) {
            p.baseline = resistance;
            for s in [&mut p.current, &mut p.next] {
                s.gate = Some(state);
                s.value = resistance;
            }
        }
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    /// Merge another circuit into this one.
    ///
    /// Nodes with the same name become one shared junction. If either side is a
    /// reference the junction is one and takes that side's imposed potential;
    /// two references held at different potentials conflict. Path names must
    /// be unique across both circuits. States and baselines are carried over
    /// as they are in `other`.
    pub fn add_circuit(&mut self, other: &Circuit<D>) -> CircuitResult<CircuitRemap> {
        for path in other.paths() {
            if self.paths.iter().any(|p| p.name == path.name) {
                return Err(CircuitError::DuplicatePath {
                    name: path.name.clone(),
                });
            }
        }

        let existing: HashMap<String, NodeId> = self
            .nodes
            .iter()
            .map(|n| (n.name.clone(), n.id))
            .collect();

        // Checked up front so a conflict leaves the builder untouched.
        for node in other.nodes().iter().filter(|n| n.reference) {
            if let Some(shared) = existing.get(&node.name).map(|id| &self.nodes[id.slot()]) {
                if shared.reference && shared.current.potential != node.current.potential {
                    return Err(CircuitError::ConflictingReference {
                        name: node.name.clone(),
                        existing: shared.current.potential,
                        incoming: node.current.potential,
                    });
                }
            }
        }

        let mut remap = CircuitRemap::default();
        for node in other.nodes() {
            let id = match existing.get(&node.name) {
                Some(&id) => {
                    let shared = &mut self.nodes[id.slot()];
                    if node.reference && !shared.reference {
                        shared.reference = true;
                        shared.current.potential = node.current.potential;
                        shared.next.potential = node.next.potential;
                    }
                    if shared.baseline_quantity.is_none() && node.baseline_quantity.is_some() {
                        shared.baseline_quantity = node.baseline_quantity;
                        shared.current.quantity = node.current.quantity;
                        shared.next.quantity = node.next.quantity;
                    }
                    id
                }
                None => {
                    let id = NodeId::from_usize(self.nodes.len());
                    let mut copy = node.clone();
                    copy.id = id;
                    self.nodes.push(copy);
                    id
                }
            };
            remap.nodes.push(id);
        }

        for path in other.paths() {
            let id = PathId::from_usize(self.paths.len());
            let mut copy = path.clone();
            copy.id = id;
            copy.source = remap.nodes[path.source.slot()];
            copy.target = remap.nodes[path.target.slot()];
            self.paths.push(copy);
            remap.paths.push(id);
        }

        tracing::debug!(
            into = %self.name,
            from = %other.name(),
            nodes = other.nodes().len(),
            paths = other.paths().len(),
            "composed circuit"
        );
        Ok(remap)
    }

    /// Validate and freeze into an immutable-topology circuit.
    pub fn build(self) -> CircuitResult<Circuit<D>> {
        validate::validate_structure(&self.name, &self.nodes, &self.paths, &self.bounds)?;
        Ok(Circuit::from_parts(
            self.name,
            self.bounds,
            self.nodes,
            self.paths,
        ))
    }
}
