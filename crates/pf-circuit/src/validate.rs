//! Structural validation of circuits.

use std::collections::{HashSet, VecDeque};

use pf_core::{NodeId, Real};

use crate::element::ElementBounds;
use crate::error::{CircuitError, CircuitResult};
use crate::node::Node;
use crate::path::Path;

/// Validate names, references, element values and reference-node presence.
pub(crate) fn validate_structure(
    name: &str,
    nodes: &[Node],
    paths: &[Path],
    bounds: &ElementBounds,
) -> CircuitResult<()> {
    validate_bounds(bounds)?;

    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.name.as_str()) {
            return Err(CircuitError::DuplicateNode {
                name: node.name.clone(),
            });
        }
        pf_core::ensure_finite(node.current.potential, "node potential")?;
        if let Some(q) = node.baseline_quantity {
            pf_core::ensure_finite(q, "node quantity")?;
        }
    }

    let mut seen = HashSet::new();
    for path in paths {
        if !seen.insert(path.name.as_str()) {
            return Err(CircuitError::DuplicatePath {
                name: path.name.clone(),
            });
        }
        for node in [path.source, path.target] {
            if node.slot() >= nodes.len() {
                return Err(CircuitError::InvalidNodeRef {
                    path: path.name.clone(),
                    node,
                });
            }
        }
        if path.source == path.target {
            return Err(CircuitError::SelfLoop {
                path: path.name.clone(),
                node: path.source,
            });
        }
        validate_value(path, path.baseline)?;
    }

    if !nodes.iter().any(|n| n.reference) {
        return Err(CircuitError::MissingReference {
            circuit: name.to_string(),
        });
    }

    Ok(())
}

pub(crate) fn validate_value(path: &Path, value: Real) -> CircuitResult<()> {
    let bad = !value.is_finite() || (path.element.requires_positive() && value <= 0.0);
    if bad {
        return Err(CircuitError::InvalidValue {
            path: path.name.clone(),
            element: path.element.label(),
            value,
        });
    }
    Ok(())
}

fn validate_bounds(bounds: &ElementBounds) -> CircuitResult<()> {
    let ordered = bounds.open_resistance > 0.0
        && bounds.open_resistance < bounds.closed_resistance
        && bounds.min_storage > 0.0
        && bounds.min_storage < bounds.max_storage
        && bounds.closed_resistance.is_finite()
        && bounds.max_storage.is_finite();
    if !ordered {
        return Err(pf_core::PfError::InvalidArg {
            what: "element bounds must be positive, finite and ordered",
        }
        .into());
    }
    Ok(())
}

/// Nodes with no conducting route to any reference node.
///
/// Flux sources impose flux but do not fix potential, so they do not connect.
/// Gates connect in either state since a closed gate is a large resistance.
pub fn find_floating_nodes(nodes: &[Node], paths: &[Path]) -> Vec<NodeId> {
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for path in paths.iter().filter(|p| p.element.connects()) {
        let (s, t) = (path.source.slot(), path.target.slot());
        if s < nodes.len() && t < nodes.len() {
            adjacency[s].push(t);
            adjacency[t].push(s);
        }
    }

    let mut reached = vec![false; nodes.len()];
    let mut queue: VecDeque<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.reference)
        .map(|(i, _)| i)
        .collect();
    for &i in &queue {
        reached[i] = true;
    }
    while let Some(i) = queue.pop_front() {
        for &j in &adjacency[i] {
            if !reached[j] {
                reached[j] = true;
                queue.push_back(j);
            }
        }
    }

    nodes
        .iter()
        .zip(reached)
        .filter(|(_, r)| !r)
        .map(|(n, _)| n.id)
        .collect()
}
