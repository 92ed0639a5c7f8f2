//! Rules mapping target errors to knob adjustments.

use pf_core::Real;
use serde::{Deserialize, Serialize};

use crate::config::Knob;
use crate::error::{TuneError, TuneResult};

/// Decides how to rescale each knob after an unsuccessful check.
///
/// `errors` holds one relative error per target, `(measured - baseline) / |baseline|`,
/// and zero for targets without a baseline. The result is one multiplicative
/// factor per knob, before step and total bounds are applied.
pub trait AdjustmentPolicy {
    /// Reject a policy that cannot serve this many knobs and targets.
    fn check_shape(&self, _knobs: usize, _targets: usize) -> TuneResult<()> {
        Ok(())
    }

    fn adjust(&mut self, errors: &[Real], knobs: &[Knob]) -> Vec<Real>;
}

/// Linear policy: `factor[k] = 1 + sum_t gains[k][t] * errors[t]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GainMatrix {
    gains: Vec<Vec<Real>>,
}

impl GainMatrix {
    /// One row per knob, one column per target.
    pub fn new(gains: Vec<Vec<Real>>) -> Self {
        Self { gains }
    }
}

impl AdjustmentPolicy for GainMatrix {
    fn check_shape(&self, knobs: usize, targets: usize) -> TuneResult<()> {
        if self.gains.len() != knobs || self.gains.iter().any(|row| row.len() != targets) {
            return Err(TuneError::InvalidConfig {
                what: format!("gain matrix must be {knobs} x {targets}"),
            });
        }
        if self.gains.iter().flatten().any(|g| !g.is_finite()) {
            return Err(TuneError::InvalidConfig {
                what: "gains must be finite".into(),
            });
        }
        Ok(())
    }

    fn adjust(&mut self, errors: &[Real], _knobs: &[Knob]) -> Vec<Real> {
        self.gains
            .iter()
            .map(|row| 1.0 + row.iter().zip(errors).map(|(g, e)| g * e).sum::<Real>())
            .collect()
    }
}
