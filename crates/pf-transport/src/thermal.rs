//! Thermal compartments over a `Circuit<Thermal>`.
//!
//! A thermal compartment reports the heat stored in its nodes (J) and their
//! mean temperature (K). Thermal links carry the heat flow (W) of a circuit
//! path; positive flow runs from `source` to `target`.

use pf_circuit::Circuit;
use pf_core::{CompartmentId, LinkId, NodeId, PathId, Real, Thermal};
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};
use crate::hierarchy::Hierarchy;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermalCompartment {
    pub id: CompartmentId,
    pub name: String,
    pub nodes: Vec<NodeId>,
    heat_j: Option<Real>,
    temperature_k: Option<Real>,
}

impl ThermalCompartment {
    pub fn new(id: CompartmentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            nodes: Vec::new(),
            heat_j: None,
            temperature_k: None,
        }
    }

    /// Stored heat; `None` until a node with storage has been synced.
    pub fn heat_j(&self) -> Option<Real> {
        self.heat_j
    }

    pub fn temperature_k(&self) -> Option<Real> {
        self.temperature_k
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermalLink {
    pub id: LinkId,
    pub name: String,
    pub source: CompartmentId,
    pub target: CompartmentId,
    pub path: Option<PathId>,
    heat_flow_w: Real,
}

impl ThermalLink {
    pub fn heat_flow_w(&self) -> Real {
        self.heat_flow_w
    }

    pub fn set_heat_flow_w(&mut self, flow: Real) {
        self.heat_flow_w = flow;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalCompartmentManager {
    compartments: Vec<ThermalCompartment>,
    links: Vec<ThermalLink>,
    #[serde(default)]
    hierarchy: Hierarchy,
}

impl ThermalCompartmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compartments(&self) -> &[ThermalCompartment] {
        &self.compartments
    }

    pub fn links(&self) -> &[ThermalLink] {
        &self.links
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn add_compartment(&mut self, name: impl Into<String>) -> TransportResult<CompartmentId> {
        let name = name.into();
        if self.compartments.iter().any(|c| c.name == name) {
            return Err(TransportError::DuplicateCompartment { name });
        }
        let id = CompartmentId::from_usize(self.compartments.len());
        self.compartments.push(ThermalCompartment::new(id, name));
        self.hierarchy.push();
        Ok(id)
    }

    pub fn map_node(&mut self, compartment: CompartmentId, node: NodeId) -> TransportResult<()> {
        let is_parent = self.hierarchy.has_children(compartment);
        let c = self.compartment_mut(compartment)?;
        if is_parent {
            return Err(TransportError::ParentMapsNodes {
                compartment: c.name.clone(),
            });
        }
        if !c.nodes.contains(&node) {
            c.nodes.push(node);
        }
        Ok(())
    }

    pub fn add_child(&mut self, parent: CompartmentId, child: CompartmentId) -> TransportResult<()> {
        let p = self.compartment(parent)?;
        if !p.nodes.is_empty() {
            return Err(TransportError::ParentMapsNodes {
                compartment: p.name.clone(),
            });
        }
        self.compartment(child)?;
        self.hierarchy.add_child(parent, child)
    }

    pub fn add_link(
        &mut self,
        name: impl Into<String>,
        source: CompartmentId,
        target: CompartmentId,
        path: Option<PathId>,
    ) -> TransportResult<LinkId> {
        let name = name.into();
        if self.links.iter().any(|l| l.name == name) {
            return Err(TransportError::DuplicateLink { name });
        }
        self.compartment(source)?;
        self.compartment(target)?;
        if source == target {
            return Err(TransportError::SelfLink {
                link: name,
                compartment: source,
            });
        }
        let id = LinkId::from_usize(self.links.len());
        self.links.push(ThermalLink {
            id,
            name,
            source,
            target,
            path,
            heat_flow_w: 0.0,
        });
        Ok(id)
    }

    pub fn compartment(&self, id: CompartmentId) -> TransportResult<&ThermalCompartment> {
        self.compartments
            .get(id.slot())
            .ok_or(TransportError::UnknownCompartment { id })
    }

    fn compartment_mut(&mut self, id: CompartmentId) -> TransportResult<&mut ThermalCompartment> {
        self.compartments
            .get_mut(id.slot())
            .ok_or(TransportError::UnknownCompartment { id })
    }

    pub fn compartment_id(&self, name: &str) -> TransportResult<CompartmentId> {
        self.compartments
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| TransportError::CompartmentNotFound {
                name: name.to_string(),
            })
    }

    pub fn link(&self, id: LinkId) -> TransportResult<&ThermalLink> {
        self.links
            .get(id.slot())
            .ok_or(TransportError::UnknownLink { id })
    }

    pub fn link_id(&self, name: &str) -> TransportResult<LinkId> {
        self.links
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.id)
            .ok_or_else(|| TransportError::LinkNotFound {
                name: name.to_string(),
            })
    }

    /// Copy the circuit's next state into mapped compartments and links.
    ///
    /// Heat is the sum of the nodes' stored energy and temperature is the mean
    /// of their temperatures. Parents sum the heat of their leaves and average
    /// their temperatures.
    pub fn sync_from_circuit(&mut self, circuit: &Circuit<Thermal>) -> TransportResult<()> {
        for c in &mut self.compartments {
            if c.nodes.is_empty() {
                continue;
            }
            let mut heat: Option<Real> = None;
            let mut temperature = 0.0;
            for &id in &c.nodes {
                let node = circuit.node(id).ok_or_else(|| TransportError::UnknownNode {
                    compartment: c.name.clone(),
                    node: id,
                })?;
                temperature += node.next.potential;
                if let Some(q) = node.next.quantity {
                    *heat.get_or_insert(0.0) += q;
                }
            }
            c.temperature_k = Some(temperature / c.nodes.len() as Real);
            c.heat_j = heat;
        }

        for parent in self.hierarchy.parents_bottom_up() {
            let mut heat: Option<Real> = None;
            let mut temperature = 0.0;
            let mut counted = 0usize;
            for leaf in self.hierarchy.leaves(parent) {
                let c = self.compartment(leaf)?;
                if let Some(h) = c.heat_j {
                    *heat.get_or_insert(0.0) += h;
                }
                if let Some(t) = c.temperature_k {
                    temperature += t;
                    counted += 1;
                }
            }
            let c = self.compartment_mut(parent)?;
            c.heat_j = heat;
            c.temperature_k = (counted > 0).then(|| temperature / counted as Real);
        }

        for l in &mut self.links {
            if let Some(pid) = l.path {
                let path = circuit.path(pid).ok_or_else(|| TransportError::UnknownPath {
                    link: l.name.clone(),
                    path: pid,
                })?;
                l.heat_flow_w = path.next.flux;
            }
        }
        Ok(())
    }

    /// Heat crossing into `id` from compartments outside its subtree.
    pub fn in_flow_w(&self, id: CompartmentId) -> TransportResult<Real> {
        self.boundary_flow(id, true)
    }

    /// Heat leaving `id` for compartments outside its subtree.
    pub fn out_flow_w(&self, id: CompartmentId) -> TransportResult<Real> {
        self.boundary_flow(id, false)
    }

    fn boundary_flow(&self, id: CompartmentId, incoming: bool) -> TransportResult<Real> {
        self.compartment(id)?;
        let inside = self.hierarchy.subtree(id);
        let mut total = 0.0;
        for l in &self.links {
            let (from_in, to_in) = (inside.contains(&l.source), inside.contains(&l.target));
            if from_in == to_in {
                continue;
            }
            // flow entering through this link, negative when it leaves
            let entering = if to_in { l.heat_flow_w } else { -l.heat_flow_w };
            if incoming && entering > 0.0 {
                total += entering;
            } else if !incoming && entering < 0.0 {
                total -= entering;
            }
        }
        Ok(total)
    }
}
