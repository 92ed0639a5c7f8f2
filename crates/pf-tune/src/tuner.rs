//! The stabilization loop: run until steady, check targets, rescale knobs, repeat.

use pf_circuit::{Circuit, Element};
use pf_core::{CircuitDomain, NodeId, PathId, Real, Tolerances, ZERO_APPROX, clamp_flagged, nearly_equal};
use pf_sim::{SimModel, step};
use pf_solver::CircuitCalculator;

use crate::config::{Knob, KnobElement, Measure, Target, TuneConfig};
use crate::error::{TuneError, TuneResult};
use crate::policy::AdjustmentPolicy;
use crate::report::{FatalReason, Termination, TuneReport};
use crate::stability::{PeriodReducer, StabilityTracker};

/// Where the tuner is in its cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TunerState {
    /// Simulating the current configuration until every metric is steady.
    Running,
    /// Steady; comparing metrics to their baselines.
    Checking,
    /// Targets missed; knobs are being rescaled.
    Adjusting,
    Success,
    Fatal(FatalReason),
}

#[derive(Clone, Copy, Debug)]
enum ResolvedMeasure {
    Potential(NodeId),
    Flux(PathId),
    Quantity(NodeId),
}

impl ResolvedMeasure {
    fn resolve<D: CircuitDomain>(circuit: &Circuit<D>, measure: &Measure) -> TuneResult<Self> {
        Ok(match measure {
            Measure::Potential(n) => Self::Potential(circuit.node_id(n)?),
            Measure::Flux(p) => Self::Flux(circuit.path_id(p)?),
            Measure::Quantity(n) => {
                let id = circuit.node_id(n)?;
                if circuit.node(id).and_then(|node| node.current.quantity).is_none() {
                    return Err(TuneError::InvalidConfig {
                        what: format!("quantity measure on node '{n}' which stores nothing"),
                    });
                }
                Self::Quantity(id)
            }
        })
    }

    /// Committed value in native units.
    fn read<D: CircuitDomain>(self, circuit: &Circuit<D>) -> Real {
        match self {
            Self::Potential(id) => circuit.node(id).map_or(Real::NAN, |n| n.current.potential),
            Self::Flux(id) => circuit.path(id).map_or(Real::NAN, |p| p.current.flux),
            Self::Quantity(id) => circuit
                .node(id)
                .and_then(|n| n.current.quantity)
                .unwrap_or(Real::NAN),
        }
    }
}

struct ResolvedKnob {
    paths: Vec<PathId>,
    /// Baselines at the start of the run.
    originals: Vec<Real>,
    total: Real,
}

fn resolve_knob<D: CircuitDomain>(circuit: &Circuit<D>, knob: &Knob) -> TuneResult<ResolvedKnob> {
    knob.validate()?;
    let expected = match knob.element {
        KnobElement::Resistance => Element::Resistor,
        KnobElement::Compliance => Element::Capacitor,
    };
    let mut paths = Vec::with_capacity(knob.paths.len());
    let mut originals = Vec::with_capacity(knob.paths.len());
    for name in &knob.paths {
        let id = circuit.path_id(name)?;
        let path = circuit.path(id);
        let found = path.map(|p| p.element);
        if found != Some(expected) {
            return Err(TuneError::KnobElementMismatch {
                knob: knob.name.clone(),
                path: name.clone(),
                expected: expected.label(),
                found: found.map_or("missing path", Element::label),
            });
        }
        paths.push(id);
        originals.push(path.map_or(Real::NAN, |p| p.baseline));
    }
    Ok(ResolvedKnob {
        paths,
        originals,
        total: 1.0,
    })
}

/// Relative error of `measured` against `baseline`; absolute when the baseline is zero.
pub fn relative_error(measured: Real, baseline: Real) -> Real {
    if baseline.abs() < ZERO_APPROX {
        measured - baseline
    } else {
        (measured - baseline) / baseline.abs()
    }
}

/// Drives a model to a steady state that meets every target baseline.
pub struct Tuner<'a, P: AdjustmentPolicy> {
    config: &'a TuneConfig,
    targets: &'a [Target],
    knobs: &'a [Knob],
    policy: P,
    state: TunerState,
}

impl<'a, P: AdjustmentPolicy> Tuner<'a, P> {
    pub fn new(config: &'a TuneConfig, targets: &'a [Target], knobs: &'a [Knob], policy: P) -> TuneResult<Self> {
        config.validate()?;
        if targets.is_empty() {
            return Err(TuneError::InvalidConfig {
                what: "at least one target is required".into(),
            });
        }
        for t in targets {
            if t.baseline.is_some_and(|b| !b.is_finite()) {
                return Err(TuneError::InvalidConfig {
                    what: format!("baseline of '{}' must be finite", t.name),
                });
            }
        }
        policy.check_shape(knobs.len(), targets.len())?;
        Ok(Self {
            config,
            targets,
            knobs,
            policy,
            state: TunerState::Running,
        })
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    /// Run to completion. A fatal termination is returned as
    /// [`TuneError::Fatal`] carrying the final report.
    pub fn run<M: SimModel>(&mut self, model: &mut M) -> TuneResult<TuneReport> {
        let cfg = self.config;
        let measures = self
            .targets
            .iter()
            .map(|t| ResolvedMeasure::resolve(model.circuit(), &t.measure))
            .collect::<TuneResult<Vec<_>>>()?;
        let mut knobs = self
            .knobs
            .iter()
            .map(|k| resolve_knob(model.circuit(), k))
            .collect::<TuneResult<Vec<_>>>()?;

        let mut calc = CircuitCalculator::new(cfg.dt, cfg.solver)?;
        let mut reducer = PeriodReducer::new(self.targets.iter().map(|t| t.reduction).collect());
        let mut tracker = StabilityTracker::new(
            cfg.stability_tolerance_pct,
            cfg.stability_window_s,
            cfg.sample_period_s,
        );

        let mut attempts = 1;
        let mut t = 0.0;
        let mut period_elapsed = 0.0;
        let mut metrics = vec![Real::NAN; self.targets.len()];
        let mut readings = Vec::with_capacity(measures.len());
        self.state = TunerState::Running;

        tracing::info!(
            circuit = %model.circuit().name(),
            targets = self.targets.len(),
            knobs = self.knobs.len(),
            "tuning started"
        );

        loop {
            match self.state {
                TunerState::Running => {
                    if t >= cfg.max_time_s {
                        self.state = TunerState::Fatal(FatalReason::MaxTime);
                        continue;
                    }
                    t += cfg.dt;
                    step(model, &mut calc, t)?;

                    readings.clear();
                    readings.extend(measures.iter().map(|p| p.read(model.circuit())));
                    reducer.push(&readings);

                    period_elapsed += cfg.dt;
                    if period_elapsed + 1e-9 >= cfg.sample_period_s {
                        period_elapsed = 0.0;
                        metrics = reducer.finish();
                        if tracker.update(&metrics) {
                            self.state = TunerState::Checking;
                        }
                    }
                }
                TunerState::Checking => {
                    let errors = self.errors(&metrics);
                    let worst = errors.iter().fold(0.0_f64, |w, e| w.max(e.abs()));
                    tracing::info!(attempt = attempts, t, worst_error = worst, "configuration stable");
                    if worst <= cfg.convergence_tolerance {
                        self.state = TunerState::Success;
                    } else if attempts >= cfg.max_attempts {
                        self.state = TunerState::Fatal(FatalReason::MaxAttempts);
                    } else {
                        self.state = TunerState::Adjusting;
                    }
                }
                TunerState::Adjusting => {
                    let errors = self.errors(&metrics);
                    let factors = self.policy.adjust(&errors, self.knobs);
                    for ((knob, resolved), &factor) in self.knobs.iter().zip(&mut knobs).zip(&factors) {
                        apply_factor(model.circuit_mut(), knob, resolved, factor)?;
                    }
                    attempts += 1;
                    tracker.reset();
                    reducer.finish();
                    period_elapsed = 0.0;
                    self.state = TunerState::Running;
                }
                TunerState::Success | TunerState::Fatal(_) => break,
            }
        }

        let report = TuneReport {
            termination: match self.state {
                TunerState::Fatal(reason) => Termination::Fatal(reason),
                _ => Termination::Success,
            },
            attempts,
            simulated_time_s: t,
            scales: self
                .knobs
                .iter()
                .zip(&knobs)
                .map(|(k, r)| (k.name.clone(), r.total))
                .collect(),
            metrics: self
                .targets
                .iter()
                .zip(&metrics)
                .map(|(t, &v)| (t.name.clone(), v))
                .collect(),
        };

        match report.termination {
            Termination::Success => {
                tracing::info!(attempts, t, "tuning converged");
                Ok(report)
            }
            Termination::Fatal(reason) => {
                tracing::error!(?reason, attempts, t, "tuning failed");
                Err(TuneError::Fatal {
                    report: Box::new(report),
                })
            }
        }
    }

    fn errors(&self, metrics: &[Real]) -> Vec<Real> {
        self.targets
            .iter()
            .zip(metrics)
            .map(|(t, &m)| t.baseline.map_or(0.0, |b| relative_error(m, b)))
            .collect()
    }
}

/// Scale a knob's paths by `factor`, kept within its step and cumulative bounds.
///
/// The recorded total is the ratio of the first path's resulting baseline to
/// its original, so clamping by the circuit's element bounds shows up in it.
fn apply_factor<D: CircuitDomain>(
    circuit: &mut Circuit<D>,
    knob: &Knob,
    resolved: &mut ResolvedKnob,
    factor: Real,
) -> TuneResult<()> {
    let factor = if factor.is_finite() { factor } else { 1.0 };
    let (step, step_clamped) = clamp_flagged(factor, knob.step_bounds.0, knob.step_bounds.1);
    let (total, total_clamped) = clamp_flagged(resolved.total * step, knob.total_bounds.0, knob.total_bounds.1);
    if step_clamped || total_clamped {
        tracing::debug!(knob = %knob.name, factor, total, "knob adjustment clamped");
    }
    let mut actual = None;
    for (&path, &original) in resolved.paths.iter().zip(&resolved.originals) {
        circuit.set_baseline(path, original * total)?;
        if actual.is_none() && original.abs() > ZERO_APPROX {
            actual = circuit.path(path).map(|p| p.baseline / original);
        }
    }
    // element bounds may hold a baseline short of the requested scale
    resolved.total = actual.unwrap_or(total);
    if !nearly_equal(resolved.total, total, Tolerances::default()) {
        tracing::debug!(knob = %knob.name, requested = total, actual = resolved.total, "knob held by element bounds");
    }
    Ok(())
}

/// Tune `model` with `policy`. See [`Tuner::run`].
pub fn tune<M, P>(
    model: &mut M,
    targets: &[Target],
    knobs: &[Knob],
    policy: P,
    config: &TuneConfig,
) -> TuneResult<TuneReport>
where
    M: SimModel,
    P: AdjustmentPolicy,
{
    Tuner::new(config, targets, knobs, policy)?.run(model)
}
