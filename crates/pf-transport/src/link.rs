use pf_core::{CompartmentId, LinkId, PathId, Real};
use serde::{Deserialize, Serialize};

/// A directed connection between two compartments carrying a volumetric flux.
///
/// Positive flux runs from `source` to `target`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompartmentLink {
    pub id: LinkId,
    pub name: String,
    pub source: CompartmentId,
    pub target: CompartmentId,
    /// Circuit path this link reads its flux from, if any.
    pub path: Option<PathId>,
    flux_ml_per_s: Real,
}

impl CompartmentLink {
    pub fn new(
        id: LinkId,
        name: impl Into<String>,
        source: CompartmentId,
        target: CompartmentId,
        path: Option<PathId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            source,
            target,
            path,
            flux_ml_per_s: 0.0,
        }
    }

    pub fn flux_ml_per_s(&self) -> Real {
        self.flux_ml_per_s
    }

    pub fn set_flux_ml_per_s(&mut self, flux: Real) {
        self.flux_ml_per_s = flux;
    }

    /// Upstream and downstream compartments for the current flux direction.
    pub fn upstream_downstream(&self) -> (CompartmentId, CompartmentId) {
        if self.flux_ml_per_s >= 0.0 {
            (self.source, self.target)
        } else {
            (self.target, self.source)
        }
    }
}
