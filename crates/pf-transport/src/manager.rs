//! Arena owning every compartment and link of a simulation.

use pf_circuit::Circuit;
use pf_core::{CompartmentId, Fluid, LinkId, NodeId, PathId, Real, SubstanceId};
use serde::{Deserialize, Serialize};

use crate::compartment::{Compartment, Phase};
use crate::error::{TransportError, TransportResult};
use crate::hierarchy::Hierarchy;
use crate::link::CompartmentLink;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompartmentManager {
    compartments: Vec<Compartment>,
    links: Vec<CompartmentLink>,
    #[serde(default)]
    hierarchy: Hierarchy,
}

impl CompartmentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn links(&self) -> &[CompartmentLink] {
        &self.links
    }

    pub fn add_compartment(&mut self, name: impl Into<String>, phase: Phase) -> TransportResult<CompartmentId> {
        let name = name.into();
        if self.compartments.iter().any(|c| c.name == name) {
            return Err(TransportError::DuplicateCompartment { name });
        }
        let id = CompartmentId::from_usize(self.compartments.len());
        self.compartments.push(Compartment::new(id, name, phase));
        self.hierarchy.push();
        Ok(id)
    }

    /// Map a circuit node into a compartment; its stored quantity adds to the volume.
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

    /// Nest `child` under `parent`. A parent maps no nodes; its volume and
    /// masses are aggregated from its leaves.
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

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Total volume over the leaves of `id` (its own volume when it is a leaf).
    pub fn aggregate_volume_ml(&self, id: CompartmentId) -> TransportResult<Real> {
        self.compartment(id)?;
        self.hierarchy
            .leaves(id)
            .into_iter()
            .map(|leaf| self.compartment(leaf).map(Compartment::volume_ml))
            .sum()
    }

    /// Total mass of `substance` over the leaves of `id`. Leaves that do not
    /// track it contribute nothing.
    pub fn aggregate_mass_ug(&self, id: CompartmentId, substance: SubstanceId) -> TransportResult<Real> {
        self.compartment(id)?;
        let mut total = 0.0;
        for leaf in self.hierarchy.leaves(id) {
            let c = self.compartment(leaf)?;
            total += c.quantity(substance).and_then(|q| q.mass_ug()).unwrap_or(0.0);
        }
        Ok(total)
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
        self.links
            .push(CompartmentLink::new(id, name, source, target, path));
        Ok(id)
    }

    pub fn compartment(&self, id: CompartmentId) -> TransportResult<&Compartment> {
        self.compartments
            .get(id.slot())
            .ok_or(TransportError::UnknownCompartment { id })
    }

    pub fn compartment_mut(&mut self, id: CompartmentId) -> TransportResult<&mut Compartment> {
        self.compartments
            .get_mut(id.slot())
            .ok_or(TransportError::UnknownCompartment { id })
    }

    /// Two distinct compartments mutably at once.
    pub fn compartment_pair_mut(
        &mut self,
        a: CompartmentId,
        b: CompartmentId,
    ) -> TransportResult<(&mut Compartment, &mut Compartment)> {
        let len = self.compartments.len();
        for id in [a, b] {
            if id.slot() >= len {
                return Err(TransportError::UnknownCompartment { id });
            }
        }
        if a == b {
            return Err(TransportError::InvalidValue {
                what: "compartment pair must be distinct",
                value: a.index() as f64,
            });
        }
        let (lo, hi) = (a.slot().min(b.slot()), a.slot().max(b.slot()));
        let (head, tail) = self.compartments.split_at_mut(hi);
        let (first, second) = (&mut head[lo], &mut tail[0]);
        if a.slot() < b.slot() {
            Ok((first, second))
        } else {
            Ok((second, first))
        }
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

    pub fn link(&self, id: LinkId) -> TransportResult<&CompartmentLink> {
        self.links
            .get(id.slot())
            .ok_or(TransportError::UnknownLink { id })
    }

    pub fn link_mut(&mut self, id: LinkId) -> TransportResult<&mut CompartmentLink> {
        self.links
            .get_mut(id.slot())
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
    /// A compartment's volume is the sum of its nodes' stored quantities (when
    /// any node stores one) and its pressure is the mean of their potentials.
    /// Parents then take the summed volume of their leaves and the
    /// volume-weighted mean of their pressures. Links take the flux of their
    /// mapped path.
    pub fn sync_from_circuit(&mut self, circuit: &Circuit<Fluid>) -> TransportResult<()> {
        for c in &mut self.compartments {
            if c.nodes.is_empty() {
                continue;
            }
            let mut volume: Option<Real> = None;
            let mut pressure = 0.0;
            for &id in &c.nodes {
                let node = circuit.node(id).ok_or_else(|| TransportError::UnknownNode {
                    compartment: c.name.clone(),
                    node: id,
                })?;
                pressure += node.next.potential;
                if let Some(q) = node.next.quantity {
                    *volume.get_or_insert(0.0) += q;
                }
            }
            c.set_pressure(pressure / c.nodes.len() as Real)?;
            if let Some(v) = volume {
                c.set_volume(v)?;
            }
        }

        for parent in self.hierarchy.parents_bottom_up() {
            let leaves = self.hierarchy.leaves(parent);
            let mut volume = 0.0;
            let mut weighted = 0.0;
            let mut plain = 0.0;
            for &leaf in &leaves {
                let c = self.compartment(leaf)?;
                volume += c.volume_ml();
                weighted += c.volume_ml() * c.pressure_mmhg();
                plain += c.pressure_mmhg();
            }
            let pressure = if volume > 0.0 {
                weighted / volume
            } else {
                plain / leaves.len() as Real
            };
            let c = self.compartment_mut(parent)?;
            c.set_volume(volume)?;
            c.set_pressure(pressure)?;
        }

        for l in &mut self.links {
            if let Some(pid) = l.path {
                let path = circuit.path(pid).ok_or_else(|| TransportError::UnknownPath {
                    link: l.name.clone(),
                    path: pid,
                })?;
                l.set_flux_ml_per_s(path.next.flux);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_rejected() {
        let mut m = CompartmentManager::new();
        let a = m.add_compartment("a", Phase::Liquid).unwrap();
        let b = m.add_compartment("b", Phase::Liquid).unwrap();
        assert!(m.add_compartment("a", Phase::Gas).is_err());
        m.add_link("ab", a, b, None).unwrap();
        assert!(matches!(
            m.add_link("ab", b, a, None),
            Err(TransportError::DuplicateLink { .. })
        ));
        assert!(matches!(
            m.add_link("aa", a, a, None),
            Err(TransportError::SelfLink { .. })
        ));
    }

    #[test]
    fn pair_mut_preserves_order() {
        let mut m = CompartmentManager::new();
        let a = m.add_compartment("a", Phase::Liquid).unwrap();
        let b = m.add_compartment("b", Phase::Liquid).unwrap();
        let (x, y) = m.compartment_pair_mut(b, a).unwrap();
        assert_eq!(x.name, "b");
        assert_eq!(y.name, "a");
        assert!(m.compartment_pair_mut(a, a).is_err());
    }

    #[test]
    fn parent_aggregates_leaf_mass() {
        let catalog = crate::SubstanceCatalog::physiology();
        let glucose = catalog.id("Glucose").unwrap();
        let mut m = CompartmentManager::new();
        let body = m.add_compartment("body", Phase::Liquid).unwrap();
        let left = m.add_compartment("left", Phase::Liquid).unwrap();
        let right = m.add_compartment("right", Phase::Liquid).unwrap();
        m.add_child(body, left).unwrap();
        m.add_child(body, right).unwrap();
        for (id, volume, mass) in [(left, 100.0, 5.0), (right, 300.0, 7.0)] {
            let c = m.compartment_mut(id).unwrap();
            c.add_substance(glucose, catalog.get(glucose).unwrap());
            c.set_volume(volume).unwrap();
            c.set_mass(glucose, mass).unwrap();
        }
        assert_eq!(m.aggregate_volume_ml(body).unwrap(), 400.0);
        assert_eq!(m.aggregate_mass_ug(body, glucose).unwrap(), 12.0);
        assert_eq!(m.aggregate_mass_ug(left, glucose).unwrap(), 5.0);
        assert!(matches!(
            m.map_node(body, NodeId::from_usize(0)),
            Err(TransportError::ParentMapsNodes { .. })
        ));
    }

    #[test]
    fn sync_fills_parent_from_leaves() {
        let mut b = pf_circuit::CircuitBuilder::<Fluid>::new("lungs");
        let ground = b.add_reference_node("ground", 0.0);
        let left = b.add_node("left");
        let right = b.add_node("right");
        for (node, pressure, volume) in [(left, 4.0, 1000.0), (right, 8.0, 3000.0)] {
            b.set_potential(node, pressure).unwrap();
            b.set_quantity(node, volume).unwrap();
        }
        b.add_capacitor("cl", left, ground, 1.0);
        b.add_capacitor("cr", right, ground, 1.0);
        let circuit = b.build().unwrap();

        let mut m = CompartmentManager::new();
        let lungs = m.add_compartment("lungs", Phase::Gas).unwrap();
        let l = m.add_compartment("left_lung", Phase::Gas).unwrap();
        let r = m.add_compartment("right_lung", Phase::Gas).unwrap();
        m.add_child(lungs, l).unwrap();
        m.add_child(lungs, r).unwrap();
        m.map_node(l, left).unwrap();
        m.map_node(r, right).unwrap();
        m.sync_from_circuit(&circuit).unwrap();

        let parent = m.compartment(lungs).unwrap();
        assert_eq!(parent.volume_ml(), 4000.0);
        // volume weighted: (4*1000 + 8*3000) / 4000
        assert_eq!(parent.pressure_mmhg(), 7.0);
    }
}
