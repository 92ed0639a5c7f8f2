//! Transport topology: an ordered subset of the manager's compartments and links.

use pf_core::{CompartmentId, LinkId, Real};
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};
use crate::manager::CompartmentManager;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentGraph {
    pub name: String,
    compartments: Vec<CompartmentId>,
    links: Vec<LinkId>,
}

impl CompartmentGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn compartments(&self) -> &[CompartmentId] {
        &self.compartments
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    pub fn contains(&self, id: CompartmentId) -> bool {
        self.compartments.contains(&id)
    }

    pub fn add_compartment(&mut self, manager: &CompartmentManager, id: CompartmentId) -> TransportResult<()> {
        manager.compartment(id)?;
        if !self.contains(id) {
            self.compartments.push(id);
        }
        Ok(())
    }

    /// Add a link. Both of its compartments must already be in the graph.
    pub fn add_link(&mut self, manager: &CompartmentManager, id: LinkId) -> TransportResult<()> {
        let link = manager.link(id)?;
        for c in [link.source, link.target] {
            if !self.contains(c) {
                return Err(TransportError::NotInGraph {
                    graph: self.name.clone(),
                    link: link.name.clone(),
                    compartment: c,
                });
            }
        }
        if !self.links.contains(&id) {
            self.links.push(id);
        }
        Ok(())
    }

    /// Union another graph into this one, keeping first-seen order.
    pub fn add_graph(&mut self, other: &CompartmentGraph) {
        for &c in &other.compartments {
            if !self.contains(c) {
                self.compartments.push(c);
            }
        }
        for &l in &other.links {
            if !self.links.contains(&l) {
                self.links.push(l);
            }
        }
    }

    /// Total flux entering a compartment through this graph's links.
    pub fn in_flow(&self, manager: &CompartmentManager, id: CompartmentId) -> Real {
        self.links
            .iter()
            .filter_map(|&l| manager.link(l).ok())
            .map(|l| match l.upstream_downstream() {
                (_, down) if down == id => l.flux_ml_per_s().abs(),
                _ => 0.0,
            })
            .sum()
    }

    /// Total flux leaving a compartment through this graph's links.
    pub fn out_flow(&self, manager: &CompartmentManager, id: CompartmentId) -> Real {
        self.links
            .iter()
            .filter_map(|&l| manager.link(l).ok())
            .map(|l| match l.upstream_downstream() {
                (up, _) if up == id => l.flux_ml_per_s().abs(),
                _ => 0.0,
            })
            .sum()
    }
}
