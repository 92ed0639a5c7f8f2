use pf_core::{NodeId, Real};
use serde::{Deserialize, Serialize};

/// Solved state of a node at one time level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub potential: Real,
    /// Stored quantity; present only on nodes that are the source of a capacitor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Real>,
}

/// A junction in a circuit.
///
/// Reference nodes have their potential imposed by the caller (through the
/// next state) and are never unknowns of the solve.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub reference: bool,
    pub baseline_quantity: Option<Real>,
    pub current: NodeState,
    pub next: NodeState,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, potential: Real) -> Self {
        let state = NodeState {
            potential,
            quantity: None,
        };
        Self {
            id,
            name: name.into(),
            reference: false,
            baseline_quantity: None,
            current: state,
            next: state,
        }
    }
}
