use pf_core::{CompartmentId, LinkId, NodeId, PathId, PfError};
use thiserror::Error;

use crate::compartment::QuantityKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Duplicate compartment name '{name}'")]
    DuplicateCompartment { name: String },

    #[error("Duplicate link name '{name}'")]
    DuplicateLink { name: String },

    #[error("Compartment '{name}' not found")]
    CompartmentNotFound { name: String },

    #[error("Link '{name}' not found")]
    LinkNotFound { name: String },

    #[error("Duplicate substance name '{name}'")]
    DuplicateSubstance { name: String },

    #[error("Substance '{name}' not found")]
    SubstanceNotFound { name: String },

    #[error("Unknown compartment id {id}")]
    UnknownCompartment { id: CompartmentId },

    #[error("Unknown link id {id}")]
    UnknownLink { id: LinkId },

    #[error("Link '{link}' connects compartment {compartment} to itself")]
    SelfLink {
        link: String,
        compartment: CompartmentId,
    },

    #[error("Link '{link}' touches compartment {compartment} which is not in graph '{graph}'")]
    NotInGraph {
        graph: String,
        link: String,
        compartment: CompartmentId,
    },

    #[error("Compartment '{compartment}' has no quantity for substance {substance}")]
    MissingQuantity {
        compartment: String,
        substance: String,
    },

    #[error("Substance '{substance}' in '{compartment}' is tracked as {actual:?}, not {expected:?}")]
    WrongQuantityKind {
        compartment: String,
        substance: String,
        expected: QuantityKind,
        actual: QuantityKind,
    },

    #[error("Compartment '{compartment}' maps node {node} missing from circuit")]
    UnknownNode { compartment: String, node: NodeId },

    #[error("Link '{link}' maps path {path} missing from circuit")]
    UnknownPath { link: String, path: PathId },

    #[error("Cannot nest compartment {child} under {parent}: {reason}")]
    InvalidHierarchy {
        parent: CompartmentId,
        child: CompartmentId,
        reason: &'static str,
    },

    #[error("Compartment '{compartment}' has children and cannot map circuit nodes")]
    ParentMapsNodes { compartment: String },

    #[error("Invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: f64 },

    #[error("Core error: {0}")]
    Core(#[from] PfError),
}

pub type TransportResult<T> = Result<T, TransportError>;

impl From<TransportError> for PfError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Core(inner) => inner,
            TransportError::CompartmentNotFound { name } => PfError::NotFound {
                what: "compartment",
                name,
            },
            TransportError::LinkNotFound { name } => PfError::NotFound { what: "link", name },
            TransportError::SubstanceNotFound { name } => PfError::NotFound {
                what: "substance",
                name,
            },
            TransportError::InvalidValue { what, .. } => PfError::InvalidArg { what },
            _ => PfError::Invariant {
                what: "transport configuration",
            },
        }
    }
}
