//! pf-circuit: network graph model for lumped-parameter circuits.
//!
//! Nodes carry potentials (and optionally a stored quantity), paths carry a
//! single element and a flux. A [`CircuitBuilder`] validates and freezes the
//! topology; the resulting [`Circuit`] keeps current and next states for the
//! solver in `pf-solver`.

pub mod builder;
pub mod circuit;
pub mod document;
pub mod element;
pub mod error;
pub mod node;
pub mod path;
pub mod validate;

pub use builder::{CircuitBuilder, CircuitRemap};
pub use circuit::Circuit;
pub use document::{CircuitDocument, NodeRecord, PathRecord};
pub use element::{Element, ElementBounds, GateState};
pub use error::{CircuitError, CircuitResult};
pub use node::{Node, NodeState};
pub use path::{Path, PathState};
pub use validate::find_floating_nodes;
