use pf_core::{NodeId, PathId, Real};
use serde::{Deserialize, Serialize};

use crate::element::{Element, GateState};

/// Element value, flux and gate state of a path at one time level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PathState {
    pub value: Real,
    pub flux: Real,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateState>,
}

/// A directed edge between two nodes carrying a single element.
///
/// Positive flux runs from `source` to `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub id: PathId,
    pub name: String,
    pub source: NodeId,
    pub target: NodeId,
    pub element: Element,
    /// Value restored by `reset_to_baseline` and scaled by tuning.
    pub baseline: Real,
    pub current: PathState,
    pub next: PathState,
}

impl Path {
    pub fn new(
        id: PathId,
        name: impl Into<String>,
        source: NodeId,
        target: NodeId,
        element: Element,
        value: Real,
        gate: Option<GateState>,
    ) -> Self {
        let state = PathState {
            value,
            flux: 0.0,
            gate,
        };
        Self {
            id,
            name: name.into(),
            source,
            target,
            element,
            baseline: value,
            current: state,
            next: state,
        }
    }

    /// The node at the other end of this path from `node`, if `node` is an endpoint.
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if node == self.source {
            Some(self.target)
        } else if node == self.target {
            Some(self.source)
        } else {
            None
        }
    }
}
