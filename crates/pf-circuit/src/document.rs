//! Serializable form of a circuit (topology, baselines, bounds and both state levels).

use pf_core::{CircuitDomain, Real};
use serde::{Deserialize, Serialize};

use crate::builder::CircuitBuilder;
use crate::circuit::Circuit;
use crate::element::{Element, ElementBounds, GateState};
use crate::error::{CircuitError, CircuitResult};
use crate::node::NodeState;
use crate::path::PathState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircuitDocument {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub bounds: ElementBounds,
    pub nodes: Vec<NodeRecord>,
    pub paths: Vec<PathRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    #[serde(default)]
    pub reference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_quantity: Option<Real>,
    #[serde(default)]
    pub current: NodeState,
    /// Defaults to `current` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NodeState>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathRecord {
    pub name: String,
    pub source: String,
    pub target: String,
    pub element: Element,
    #[serde(default)]
    pub baseline: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<PathState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<PathState>,
}

impl<D: CircuitDomain> Circuit<D> {
    pub fn to_document(&self) -> CircuitDocument {
        let nodes = self
            .nodes()
            .iter()
            .map(|n| NodeRecord {
                name: n.name.clone(),
                reference: n.reference,
                baseline_quantity: n.baseline_quantity,
                current: n.current,
                next: Some(n.next),
            })
            .collect();
        let paths = self
            .paths()
            .iter()
            .map(|p| PathRecord {
                name: p.name.clone(),
                source: self.nodes()[p.source.slot()].name.clone(),
                target: self.nodes()[p.target.slot()].name.clone(),
                element: p.element,
                baseline: p.baseline,
                current: Some(p.current),
                next: Some(p.next),
            })
            .collect();
        CircuitDocument {
            name: self.name().to_string(),
            domain: D::NAME.to_string(),
            bounds: *self.bounds(),
            nodes,
            paths,
        }
    }

    /// Rebuild a circuit from a document, re-running every build-time check.
    pub fn from_document(doc: &CircuitDocument) -> CircuitResult<Self> {
        if doc.domain != D::NAME {
            return Err(CircuitError::DomainMismatch {
                expected: D::NAME,
                found: doc.domain.clone(),
            });
        }

        let mut b = CircuitBuilder::<D>::new(doc.name.clone()).with_bounds(doc.bounds);
        let mut node_states = Vec::with_capacity(doc.nodes.len());
        for rec in &doc.nodes {
            let id = if rec.reference {
                b.add_reference_node(rec.name.clone(), rec.current.potential)
            } else {
                b.add_node(rec.name.clone())
            };
            b.set_potential(id, rec.current.potential)?;
            if let Some(q) = rec.baseline_quantity {
                b.set_quantity(id, q)?;
            }
            node_states.push((id, rec.current, rec.next.unwrap_or(rec.current)));
        }

        let mut path_states = Vec::with_capacity(doc.paths.len());
        for rec in &doc.paths {
            let source = b.node_id(&rec.source).ok_or_else(|| CircuitError::NodeNotFound {
                name: rec.source.clone(),
            })?;
            let target = b.node_id(&rec.target).ok_or_else(|| CircuitError::NodeNotFound {
                name: rec.target.clone(),
            })?;
            let id = b.add_path(rec.name.clone(), source, target, rec.element, rec.baseline);
            // A gate's baseline is the resistance of its initial state.
            if rec.element.is_gate() && rec.baseline == doc.bounds.gate_resistance(GateState::Closed) {
                b.set_gate(id, GateState::Closed);
            }
            if let Some(current) = rec.current {
                path_states.push((id, current, rec.next.unwrap_or(current)));
            }
        }

        let mut circuit = b.build()?;
        for &(id, current, next) in &path_states {
            if let Some(p) = circuit.path(id) {
                if !p.element.is_gate() {
                    crate::validate::validate_value(p, current.value)?;
                    crate::validate::validate_value(p, next.value)?;
                }
            }
        }
        // Records without an explicit quantity keep the baseline one.
        let node_states: Vec<_> = node_states
            .into_iter()
            .map(|(id, mut cur, mut next)| {
                let base = circuit.node(id).and_then(|n| n.baseline_quantity);
                cur.quantity = cur.quantity.or(base);
                next.quantity = next.quantity.or(base);
                (id, cur, next)
            })
            .collect();
        circuit.restore_states(node_states, path_states);
        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{Fluid, Thermal};

    fn sample() -> Circuit<Fluid> {
        let mut b = CircuitBuilder::<Fluid>::new("sample");
        let g = b.add_reference_node("ground", 0.0);
        let a = b.add_node("a");
        b.set_quantity(a, 50.0).unwrap();
        b.add_capacitor("c", a, g, 2.0);
        b.add_valve("v", a, g);
        b.add_switch("s", a, g, GateState::Closed);
        b.build().unwrap()
    }

    #[test]
    fn document_round_trip() {
        let c = sample();
        let doc = c.to_document();
        let back = Circuit::<Fluid>::from_document(&doc).unwrap();
        assert_eq!(back.nodes(), c.nodes());
        assert_eq!(back.paths(), c.paths());

        let s = back.path(back.path_id("s").unwrap()).unwrap();
        assert_eq!(s.baseline, back.bounds().closed_resistance);
        assert_eq!(s.current.gate, Some(GateState::Closed));
    }

    #[test]
    fn closed_switch_baseline_without_states_starts_closed() {
        let mut doc = sample().to_document();
        for p in &mut doc.paths {
            p.current = None;
            p.next = None;
        }
        let back = Circuit::<Fluid>::from_document(&doc).unwrap();
        let s = back.path(back.path_id("s").unwrap()).unwrap();
        assert_eq!(s.next.gate, Some(GateState::Closed));
        assert_eq!(s.next.value, back.bounds().closed_resistance);
        let v = back.path(back.path_id("v").unwrap()).unwrap();
        assert_eq!(v.next.gate, Some(GateState::Open));
    }

    #[test]
    fn domain_mismatch_rejected() {
        let doc = sample().to_document();
        assert!(matches!(
            Circuit::<Thermal>::from_document(&doc),
            Err(CircuitError::DomainMismatch { .. })
        ));
    }

    #[test]
    fn unknown_endpoint_rejected() {
        let mut doc = sample().to_document();
        doc.paths[0].target = "missing".into();
        assert!(matches!(
            Circuit::<Fluid>::from_document(&doc),
            Err(CircuitError::NodeNotFound { .. })
        ));
    }
}
