//! Tuning outcome.

use pf_core::Real;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalReason {
    /// Every allowed configuration was tried without meeting the targets.
    MaxAttempts,
    /// The simulated-time budget ran out, usually while waiting for stability.
    MaxTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum Termination {
    Success,
    Fatal(FatalReason),
}

/// Final state of a tuning run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TuneReport {
    pub termination: Termination,
    /// Parameter configurations simulated, counting the initial one.
    pub attempts: usize,
    pub simulated_time_s: Real,
    /// Cumulative scale per knob.
    pub scales: Vec<(String, Real)>,
    /// Last reduced value per target.
    pub metrics: Vec<(String, Real)>,
}

impl TuneReport {
    pub fn succeeded(&self) -> bool {
        self.termination == Termination::Success
    }

    pub fn scale(&self, knob: &str) -> Option<Real> {
        self.scales.iter().find(|(n, _)| n == knob).map(|(_, s)| *s)
    }

    pub fn metric(&self, target: &str) -> Option<Real> {
        self.metrics.iter().find(|(n, _)| n == target).map(|(_, v)| *v)
    }

    pub fn summary(&self) -> String {
        let status = match self.termination {
            Termination::Success => "converged",
            Termination::Fatal(FatalReason::MaxAttempts) => "attempt limit reached",
            Termination::Fatal(FatalReason::MaxTime) => "time limit reached",
        };
        format!(
            "{status} after {} attempts and {:.2} s simulated",
            self.attempts, self.simulated_time_s
        )
    }
}
