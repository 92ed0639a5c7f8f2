//! Tuning configuration: timing limits, targets and knobs.

use pf_core::Real;
use pf_solver::SolverConfig;
use serde::{Deserialize, Serialize};

use crate::error::{TuneError, TuneResult};

/// Limits and tolerances for the stabilization loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneConfig {
    /// Solver time step (seconds)
    pub dt: Real,
    /// Metrics are reduced over periods of this length before stability checks (seconds)
    pub sample_period_s: Real,
    /// A metric is steady while its percent change per period stays at or below this
    pub stability_tolerance_pct: Real,
    /// All metrics must stay steady this long before targets are checked (seconds)
    pub stability_window_s: Real,
    /// Relative error at which a target counts as met
    pub convergence_tolerance: Real,
    /// Simulated time budget across all attempts (seconds)
    pub max_time_s: Real,
    /// Maximum parameter configurations tried
    pub max_attempts: usize,
    pub solver: SolverConfig,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,
            sample_period_s: 1.0,
            stability_tolerance_pct: 0.25,
            stability_window_s: 15.0,
            convergence_tolerance: 0.01,
            max_time_s: 2000.0,
            max_attempts: 50,
            solver: SolverConfig::default(),
        }
    }
}

impl TuneConfig {
    pub fn with_dt(mut self, dt: Real) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_sample_period(mut self, period_s: Real) -> Self {
        self.sample_period_s = period_s;
        self
    }

    pub fn with_stability_window(mut self, window_s: Real) -> Self {
        self.stability_window_s = window_s;
        self
    }

    pub fn with_max_time(mut self, max_time_s: Real) -> Self {
        self.max_time_s = max_time_s;
        self
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub(crate) fn validate(&self) -> TuneResult<()> {
        let positive = [
            ("dt", self.dt),
            ("sample_period_s", self.sample_period_s),
            ("max_time_s", self.max_time_s),
        ];
        for (what, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(TuneError::InvalidConfig {
                    what: format!("{what} must be positive, got {v}"),
                });
            }
        }
        let non_negative = [
            ("stability_tolerance_pct", self.stability_tolerance_pct),
            ("stability_window_s", self.stability_window_s),
            ("convergence_tolerance", self.convergence_tolerance),
        ];
        for (what, v) in non_negative {
            if !v.is_finite() || v < 0.0 {
                return Err(TuneError::InvalidConfig {
                    what: format!("{what} must be non-negative, got {v}"),
                });
            }
        }
        if self.sample_period_s < self.dt {
            return Err(TuneError::InvalidConfig {
                what: "sample_period_s must be at least dt".into(),
            });
        }
        if self.max_attempts == 0 {
            return Err(TuneError::InvalidConfig {
                what: "max_attempts must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Which committed circuit value a target reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum Measure {
    Potential(String),
    Flux(String),
    Quantity(String),
}

/// How per-step readings are combined over one sample period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Last,
    Mean,
    Max,
    Min,
}

/// A tracked metric, optionally with a value to tune toward.
///
/// Metrics without a baseline only gate stability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub measure: Measure,
    #[serde(default)]
    pub reduction: Reduction,
    #[serde(default)]
    pub baseline: Option<Real>,
}

impl Target {
    pub fn new(name: impl Into<String>, measure: Measure) -> Self {
        Self {
            name: name.into(),
            measure,
            reduction: Reduction::Last,
            baseline: None,
        }
    }

    pub fn with_baseline(mut self, baseline: Real) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_reduction(mut self, reduction: Reduction) -> Self {
        self.reduction = reduction;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnobElement {
    Resistance,
    Compliance,
}

/// A group of paths whose baselines are scaled together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Knob {
    pub name: String,
    pub paths: Vec<String>,
    pub element: KnobElement,
    /// Bounds on the scale applied in one adjustment.
    #[serde(default = "default_step_bounds")]
    pub step_bounds: (Real, Real),
    /// Bounds on the product of all adjustments.
    #[serde(default = "default_total_bounds")]
    pub total_bounds: (Real, Real),
}

fn default_step_bounds() -> (Real, Real) {
    (0.5, 1.5)
}

fn default_total_bounds() -> (Real, Real) {
    (0.1, 10.0)
}

impl Knob {
    pub fn new(name: impl Into<String>, element: KnobElement, paths: &[&str]) -> Self {
        Self {
            name: name.into(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            element,
            step_bounds: default_step_bounds(),
            total_bounds: default_total_bounds(),
        }
    }

    pub fn with_total_bounds(mut self, lo: Real, hi: Real) -> Self {
        self.total_bounds = (lo, hi);
        self
    }

    pub(crate) fn validate(&self) -> TuneResult<()> {
        let ok = |(lo, hi): (Real, Real)| lo.is_finite() && hi.is_finite() && 0.0 < lo && lo <= 1.0 && 1.0 <= hi;
        if !ok(self.step_bounds) || !ok(self.total_bounds) {
            return Err(TuneError::InvalidConfig {
                what: format!("knob '{}' bounds must be positive and bracket 1", self.name),
            });
        }
        if self.paths.is_empty() {
            return Err(TuneError::InvalidConfig {
                what: format!("knob '{}' has no paths", self.name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cardiovascular_tuning() {
        let c = TuneConfig::default();
        assert_eq!(c.stability_tolerance_pct, 0.25);
        assert_eq!(c.stability_window_s, 15.0);
        assert_eq!(c.max_attempts, 50);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn period_shorter_than_dt_rejected() {
        let c = TuneConfig::default().with_sample_period(0.001);
        assert!(c.validate().is_err());
    }

    #[test]
    fn knob_bounds_must_bracket_one() {
        let k = Knob::new("r", KnobElement::Resistance, &["r"]).with_total_bounds(1.5, 2.0);
        assert!(k.validate().is_err());
    }

    #[test]
    fn targets_load_from_yaml() {
        let yaml = r#"
- name: systolic
  measure: { kind: potential, name: aorta }
  reduction: max
  baseline: 120.0
- name: cardiac_output
  measure: { kind: flux, name: aortic_valve }
  reduction: mean
"#;
        let t: Vec<Target> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t[0].measure, Measure::Potential("aorta".into()));
        assert_eq!(t[0].reduction, Reduction::Max);
        assert_eq!(t[1].baseline, None);
    }
}
