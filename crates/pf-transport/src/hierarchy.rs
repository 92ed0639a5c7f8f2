//! Parent/child relation between compartments.
//!
//! A parent holds no circuit nodes of its own; its volume, mass and heat are
//! the sums over its leaves.

use pf_core::CompartmentId;
use serde::{Deserialize, Serialize};

use crate::error::{TransportError, TransportResult};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    parent: Vec<Option<CompartmentId>>,
    children: Vec<Vec<CompartmentId>>,
}

impl Hierarchy {
    /// Make room for a newly added compartment.
    pub(crate) fn push(&mut self) {
        self.parent.push(None);
        self.children.push(Vec::new());
    }

    fn check(&self, id: CompartmentId) -> TransportResult<()> {
        if id.slot() < self.parent.len() {
            Ok(())
        } else {
            Err(TransportError::UnknownCompartment { id })
        }
    }

    pub(crate) fn add_child(&mut self, parent: CompartmentId, child: CompartmentId) -> TransportResult<()> {
        self.check(parent)?;
        self.check(child)?;
        let invalid = |reason| TransportError::InvalidHierarchy { parent, child, reason };
        if parent == child {
            return Err(invalid("a compartment cannot contain itself"));
        }
        if let Some(existing) = self.parent[child.slot()] {
            if existing == parent {
                return Ok(());
            }
            return Err(invalid("child already has a parent"));
        }
        let mut up = Some(parent);
        while let Some(ancestor) = up {
            if ancestor == child {
                return Err(invalid("child is an ancestor of parent"));
            }
            up = self.parent[ancestor.slot()];
        }
        self.parent[child.slot()] = Some(parent);
        self.children[parent.slot()].push(child);
        Ok(())
    }

    pub fn parent(&self, id: CompartmentId) -> Option<CompartmentId> {
        self.parent.get(id.slot()).copied().flatten()
    }

    pub fn children(&self, id: CompartmentId) -> &[CompartmentId] {
        self.children.get(id.slot()).map_or(&[], Vec::as_slice)
    }

    pub fn has_children(&self, id: CompartmentId) -> bool {
        !self.children(id).is_empty()
    }

    /// Childless descendants of `id`, or `id` itself when it has no children.
    pub fn leaves(&self, id: CompartmentId) -> Vec<CompartmentId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let kids = self.children(next);
            if kids.is_empty() {
                out.push(next);
            } else {
                stack.extend(kids.iter().rev());
            }
        }
        out
    }

    /// `id` and every compartment nested below it.
    pub fn subtree(&self, id: CompartmentId) -> Vec<CompartmentId> {
        let mut out = vec![id];
        let mut cursor = 0;
        while let Some(&next) = out.get(cursor) {
            out.extend_from_slice(self.children(next));
            cursor += 1;
        }
        out
    }

    /// Compartments with children, deepest first, so each parent follows its children.
    pub(crate) fn parents_bottom_up(&self) -> Vec<CompartmentId> {
        let depth = |mut id: CompartmentId| {
            let mut d = 0usize;
            while let Some(p) = self.parent(id) {
                d += 1;
                id = p;
            }
            d
        };
        let mut parents: Vec<(usize, CompartmentId)> = (0..self.children.len())
            .map(CompartmentId::from_usize)
            .filter(|&id| self.has_children(id))
            .map(|id| (depth(id), id))
            .collect();
        parents.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        parents.into_iter().map(|(_, id)| id).collect()
    }
}
