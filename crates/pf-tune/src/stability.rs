//! Per-period metric reduction and the steadiness check.

use pf_core::{Real, percent_difference};

use crate::config::Reduction;

#[derive(Clone, Copy, Debug)]
struct Accumulator {
    sum: Real,
    max: Real,
    min: Real,
    last: Real,
    count: usize,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            sum: 0.0,
            max: Real::NEG_INFINITY,
            min: Real::INFINITY,
            last: Real::NAN,
            count: 0,
        }
    }
}

/// Collects one reading per metric per step and reduces them at period end.
#[derive(Clone, Debug)]
pub struct PeriodReducer {
    reductions: Vec<Reduction>,
    acc: Vec<Accumulator>,
}

impl PeriodReducer {
    pub fn new(reductions: Vec<Reduction>) -> Self {
        let acc = vec![Accumulator::default(); reductions.len()];
        Self { reductions, acc }
    }

    pub fn push(&mut self, readings: &[Real]) {
        for (a, &v) in self.acc.iter_mut().zip(readings) {
            a.sum += v;
            a.max = a.max.max(v);
            a.min = a.min.min(v);
            a.last = v;
            a.count += 1;
        }
    }

    /// Reduced values for the finished period. Clears the accumulators.
    ///
    /// A metric with no readings reduces to NaN.
    pub fn finish(&mut self) -> Vec<Real> {
        let out = self
            .reductions
            .iter()
            .zip(&self.acc)
            .map(|(r, a)| {
                if a.count == 0 {
                    return Real::NAN;
                }
                match r {
                    Reduction::Last => a.last,
                    Reduction::Mean => a.sum / a.count as Real,
                    Reduction::Max => a.max,
                    Reduction::Min => a.min,
                }
            })
            .collect();
        self.acc.fill(Accumulator::default());
        out
    }
}

/// Tracks how long every metric has stayed within a percent tolerance of its
/// previous period value.
#[derive(Clone, Debug)]
pub struct StabilityTracker {
    tolerance_pct: Real,
    required_periods: usize,
    previous: Option<Vec<Real>>,
    stable_periods: usize,
}

impl StabilityTracker {
    /// `window_s` is rounded up to whole sample periods, with at least one.
    pub fn new(tolerance_pct: Real, window_s: Real, period_s: Real) -> Self {
        let required_periods = ((window_s / period_s) - 1e-9).ceil().max(1.0) as usize;
        Self {
            tolerance_pct,
            required_periods,
            previous: None,
            stable_periods: 0,
        }
    }

    /// Feed one period's reduced values. Returns true once the window is met.
    pub fn update(&mut self, values: &[Real]) -> bool {
        let steady = match &self.previous {
            Some(prev) => prev.len() == values.len()
                && prev.iter().zip(values).all(|(&p, &v)| {
                    // An undefined or NaN difference never counts as steady.
                    percent_difference(p, v).is_some_and(|d| d <= self.tolerance_pct)
                }),
            None => false,
        };
        self.stable_periods = if steady { self.stable_periods + 1 } else { 0 };
        self.previous = Some(values.to_vec());
        self.stable_periods >= self.required_periods
    }

    pub fn stable_periods(&self) -> usize {
        self.stable_periods
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.stable_periods = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reductions_over_one_period() {
        let mut r = PeriodReducer::new(vec![
            Reduction::Last,
            Reduction::Mean,
            Reduction::Max,
            Reduction::Min,
        ]);
        for v in [1.0, 3.0, 2.0] {
            r.push(&[v, v, v, v]);
        }
        assert_eq!(r.finish(), vec![2.0, 2.0, 3.0, 1.0]);
        assert!(r.finish().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn steady_after_window() {
        let mut s = StabilityTracker::new(0.25, 3.0, 1.0);
        assert!(!s.update(&[100.0]));
        assert!(!s.update(&[100.1]));
        assert!(!s.update(&[100.1]));
        assert!(s.update(&[100.0]));
    }

    #[test]
    fn jump_restarts_window() {
        let mut s = StabilityTracker::new(0.25, 2.0, 1.0);
        s.update(&[10.0]);
        s.update(&[10.0]);
        assert!(!s.update(&[11.0]));
        assert_eq!(s.stable_periods(), 0);
        assert!(!s.update(&[11.0]));
        assert!(s.update(&[11.0]));
    }

    #[test]
    fn zero_crossing_is_not_steady() {
        let mut s = StabilityTracker::new(0.25, 1.0, 1.0);
        s.update(&[1.0]);
        assert!(!s.update(&[-1.0]));
        s.update(&[0.0]);
        assert!(s.update(&[0.0]));
    }

    #[test]
    fn nan_is_never_steady() {
        let mut s = StabilityTracker::new(0.25, 1.0, 1.0);
        s.update(&[Real::NAN]);
        assert!(!s.update(&[Real::NAN]));
    }
}
