//! Circuit construction and configuration errors.

use pf_core::{NodeId, PathId, PfError};
use thiserror::Error;

pub type CircuitResult<T> = Result<T, CircuitError>;

/// Configuration errors raised while building, composing or configuring a circuit.
///
/// All of these are fatal at setup time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CircuitError {
    #[error("Circuit '{circuit}' has no reference node")]
    MissingReference { circuit: String },

    #[error("Duplicate node name '{name}'")]
    DuplicateNode { name: String },

    #[error("Duplicate path name '{name}'")]
    DuplicatePath { name: String },

    #[error("Node '{name}' not found")]
    NodeNotFound { name: String },

    #[error("Path '{name}' not found")]
    PathNotFound { name: String },

    #[error("Path '{path}' refers to non-existent node {node}")]
    InvalidNodeRef { path: String, node: NodeId },

    #[error("Path '{path}' connects node {node} to itself")]
    SelfLoop { path: String, node: NodeId },

    #[error("Invalid {element} value {value} on path '{path}'")]
    InvalidValue {
        path: String,
        element: &'static str,
        value: f64,
    },

    #[error("Shared reference node '{name}' is held at {existing} in one circuit and {incoming} in the other")]
    ConflictingReference {
        name: String,
        existing: f64,
        incoming: f64,
    },

    #[error("Node '{name}' is not a reference node")]
    NotReference { name: String },

    #[error("Path '{path}' ({element}) cannot be written directly")]
    ReadOnly { path: String, element: &'static str },

    #[error("Unknown path id {id}")]
    UnknownPath { id: PathId },

    #[error("Unknown node id {id}")]
    UnknownNode { id: NodeId },

    #[error("Document is for a {found} circuit, expected {expected}")]
    DomainMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Core error: {0}")]
    Core(#[from] PfError),
}

impl From<CircuitError> for PfError {
    fn from(err: CircuitError) -> Self {
        match err {
            CircuitError::Core(inner) => inner,
            CircuitError::NodeNotFound { name } => PfError::NotFound { what: "node", name },
            CircuitError::PathNotFound { name } => PfError::NotFound { what: "path", name },
            _ => PfError::Invariant {
                what: "circuit configuration",
            },
        }
    }
}
