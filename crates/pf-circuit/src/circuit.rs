//! The validated circuit: fixed topology, mutable two-level state.

use std::collections::HashMap;
use std::marker::PhantomData;

use pf_core::{CircuitDomain, NodeId, PathId, Real};

use crate::element::{Element, ElementBounds, GateState};
use crate::error::{CircuitError, CircuitResult};
use crate::node::{Node, NodeState};
use crate::path::{Path, PathState};
use crate::validate;

/// A circuit of nodes and paths in the domain `D`.
///
/// Topology is frozen at build time. Each node and path holds a `current`
/// state (last committed step) and a `next` state (being solved). Callers
/// write element values and reference potentials into `next` before a solve;
/// the solver fills in the rest of `next`; `post_process` commits it.
#[derive(Debug, Clone)]
pub struct Circuit<D: CircuitDomain> {
    name: String,
    bounds: ElementBounds,
    nodes: Vec<Node>,
    paths: Vec<Path>,
    node_by_name: HashMap<String, NodeId>,
    path_by_name: HashMap<String, PathId>,

    /// Node i's incident paths are in node_paths[node_path_offsets[i]..node_path_offsets[i+1]].
    node_path_offsets: Vec<usize>,
    node_paths: Vec<PathId>,
    _domain: PhantomData<D>,
}

impl<D: CircuitDomain> Circuit<D> {
    pub(crate) fn from_parts(
        name: String,
        bounds: ElementBounds,
        nodes: Vec<Node>,
        paths: Vec<Path>,
    ) -> Self {
        let node_by_name = nodes.iter().map(|n| (n.name.clone(), n.id)).collect();
        let path_by_name = paths.iter().map(|p| (p.name.clone(), p.id)).collect();

        let mut incident: Vec<Vec<PathId>> = vec![Vec::new(); nodes.len()];
        for p in &paths {
            incident[p.source.slot()].push(p.id);
            incident[p.target.slot()].push(p.id);
        }
        let mut node_path_offsets = Vec::with_capacity(nodes.len() + 1);
        let mut node_paths = Vec::with_capacity(paths.len() * 2);
        node_path_offsets.push(0);
        for list in incident {
            node_paths.extend(list);
            node_path_offsets.push(node_paths.len());
        }

        Self {
            name,
            bounds,
            nodes,
            paths,
            node_by_name,
            path_by_name,
            node_path_offsets,
            node_paths,
            _domain: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> &ElementBounds {
        &self.bounds
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.slot())
    }

    pub fn path(&self, id: PathId) -> Option<&Path> {
        self.paths.get(id.slot())
    }

    pub fn node_id(&self, name: &str) -> CircuitResult<NodeId> {
        self.node_by_name
            .get(name)
            .copied()
            .ok_or_else(|| CircuitError::NodeNotFound {
                name: name.to_string(),
            })
    }

    pub fn path_id(&self, name: &str) -> CircuitResult<PathId> {
        self.path_by_name
            .get(name)
            .copied()
            .ok_or_else(|| CircuitError::PathNotFound {
                name: name.to_string(),
            })
    }

    /// Paths incident to a node, in path id order.
    pub fn node_paths(&self, node: NodeId) -> &[PathId] {
        let idx = node.slot();
        if idx >= self.nodes.len() {
            return &[];
        }
        &self.node_paths[self.node_path_offsets[idx]..self.node_path_offsets[idx + 1]]
    }

    pub fn reference_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.reference)
    }

    pub fn find_floating_nodes(&self) -> Vec<NodeId> {
        validate::find_floating_nodes(&self.nodes, &self.paths)
    }

    fn node_ref(&self, id: NodeId) -> CircuitResult<&Node> {
        self.node(id).ok_or(CircuitError::UnknownNode { id })
    }

    fn path_ref(&self, id: PathId) -> CircuitResult<&Path> {
        self.path(id).ok_or(CircuitError::UnknownPath { id })
    }

    fn path_mut(&mut self, id: PathId) -> CircuitResult<&mut Path> {
        self.paths
            .get_mut(id.slot())
            .ok_or(CircuitError::UnknownPath { id })
    }

    // Typed reads of the committed state.

    pub fn potential(&self, node: NodeId) -> CircuitResult<D::Potential> {
        Ok(D::to_potential(self.node_ref(node)?.current.potential))
    }

    pub fn next_potential(&self, node: NodeId) -> CircuitResult<D::Potential> {
        Ok(D::to_potential(self.node_ref(node)?.next.potential))
    }

    pub fn quantity(&self, node: NodeId) -> CircuitResult<Option<D::Quantity>> {
        Ok(self.node_ref(node)?.current.quantity.map(D::to_quantity))
    }

    pub fn flux(&self, path: PathId) -> CircuitResult<D::Flux> {
        Ok(D::to_flux(self.path_ref(path)?.current.flux))
    }

    pub fn next_flux(&self, path: PathId) -> CircuitResult<D::Flux> {
        Ok(D::to_flux(self.path_ref(path)?.next.flux))
    }

    pub fn gate(&self, path: PathId) -> CircuitResult<Option<GateState>> {
        Ok(self.path_ref(path)?.current.gate)
    }

    /// Net flux into a node from its incident paths, next state.
    pub fn node_flux_balance(&self, node: NodeId) -> Real {
        self.node_paths(node)
            .iter()
            .filter_map(|&pid| self.path(pid))
            .map(|p| {
                if p.target == node {
                    p.next.flux
                } else {
                    -p.next.flux
                }
            })
            .sum()
    }

    // Caller-side writes into the next state.

    /// Impose the next potential of a reference node.
    pub fn set_reference_potential(&mut self, node: NodeId, potential: D::Potential) -> CircuitResult<()> {
        self.set_reference_potential_native(node, D::from_potential(potential))
    }

    pub fn set_reference_potential_native(&mut self, node: NodeId, potential: Real) -> CircuitResult<()> {
        pf_core::ensure_finite(potential, "reference potential")?;
        let n = self
            .nodes
            .get_mut(node.slot())
            .ok_or(CircuitError::UnknownNode { id: node })?;
        if !n.reference {
            return Err(CircuitError::NotReference {
                name: n.name.clone(),
            });
        }
        n.next.potential = potential;
        Ok(())
    }

    /// Set the next value of a non-gate element, clamped into bounds.
    pub fn set_next_value(&mut self, path: PathId, value: Real) -> CircuitResult<()> {
        let bounds = self.bounds;
        let p = self.path_mut(path)?;
        if p.element.is_gate() {
            return Err(CircuitError::ReadOnly {
                path: p.name.clone(),
                element: p.element.label(),
            });
        }
        validate::validate_value(p, value)?;
        p.next.value = clamp_logged(&bounds, p, value);
        Ok(())
    }

    /// Set a switch state for the next solve. Valves are driven by the solver.
    pub fn set_switch(&mut self, path: PathId, state: GateState) -> CircuitResult<()> {
        let resistance = self.bounds.gate_resistance(state);
        let p = self.path_mut(path)?;
        if p.element != Element::Switch {
            return Err(CircuitError::ReadOnly {
                path: p.name.clone(),
                element: p.element.label(),
            });
        }
        p.next.gate = Some(state);
        p.next.value = resistance;
        Ok(())
    }

    /// Replace the baseline value of an element; the next value follows it.
    pub fn set_baseline(&mut self, path: PathId, value: Real) -> CircuitResult<()> {
        let bounds = self.bounds;
        let p = self.path_mut(path)?;
        if p.element.is_gate() {
            return Err(CircuitError::ReadOnly {
                path: p.name.clone(),
                element: p.element.label(),
            });
        }
        validate::validate_value(p, value)?;
        let clamped = clamp_logged(&bounds, p, value);
        p.baseline = clamped;
        p.next.value = clamped;
        Ok(())
    }

    /// Multiply the baseline value of an element by `factor`.
    pub fn scale_baseline(&mut self, path: PathId, factor: Real) -> CircuitResult<Real> {
        let base = self.path_ref(path)?.baseline;
        self.set_baseline(path, base * factor)?;
        Ok(self.path_ref(path)?.baseline)
    }

    /// Restore every non-gate element's next value to its baseline.
    pub fn reset_to_baseline(&mut self) {
        for p in self.paths.iter_mut().filter(|p| !p.element.is_gate()) {
            p.next.value = p.baseline;
        }
    }

    /// Overwrite both time levels of a node's stored quantity (setup or reload).
    pub fn set_initial_quantity(&mut self, node: NodeId, quantity: Real) -> CircuitResult<()> {
        pf_core::ensure_finite(quantity, "node quantity")?;
        let n = self
            .nodes
            .get_mut(node.slot())
            .ok_or(CircuitError::UnknownNode { id: node })?;
        n.current.quantity = Some(quantity);
        n.next.quantity = Some(quantity);
        Ok(())
    }

    // Solver-side access.

    pub fn node_next_mut(&mut self, node: NodeId) -> Option<&mut NodeState> {
        self.nodes.get_mut(node.slot()).map(|n| &mut n.next)
    }

    pub fn path_next_mut(&mut self, path: PathId) -> Option<&mut PathState> {
        self.paths.get_mut(path.slot()).map(|p| &mut p.next)
    }

    /// Promote every next state to current. The next state is left as is, so
    /// repeating the call changes nothing.
    pub fn commit(&mut self) {
        for n in &mut self.nodes {
            n.current = n.next;
        }
        for p in &mut self.paths {
            p.current = p.next;
        }
    }

    /// Overwrite both time levels of nodes and paths from stored records.
    pub(crate) fn restore_states(
        &mut self,
        nodes: impl IntoIterator<Item = (NodeId, NodeState, NodeState)>,
        paths: impl IntoIterator<Item = (PathId, PathState, PathState)>,
    ) {
        for (id, current, next) in nodes {
            if let Some(n) = self.nodes.get_mut(id.slot()) {
                n.current = current;
                n.next = next;
            }
        }
        for (id, current, next) in paths {
            if let Some(p) = self.paths.get_mut(id.slot()) {
                p.current = current;
                p.next = next;
            }
        }
    }
}

fn clamp_logged(bounds: &ElementBounds, path: &Path, value: Real) -> Real {
    let (clamped, moved) = bounds.clamp(path.element, value);
    if moved {
        tracing::warn!(
            path = %path.name,
            element = path.element.label(),
            requested = value,
            clamped,
            "element value clamped to bounds"
        );
    }
    clamped
}
