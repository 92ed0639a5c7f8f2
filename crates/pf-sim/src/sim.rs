//! Fixed-step simulation loop and result recording.

use pf_core::Real;
use pf_solver::{CircuitCalculator, SolveReport, SolverConfig};
use pf_transport::TransportReport;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::model::SimModel;

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Fixed time step (seconds)
    pub dt: Real,
    /// Final simulation time (seconds)
    pub t_end: Real,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
    pub solver: SolverConfig,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 0.02,
            t_end: 1.0,
            max_steps: 100_000,
            record_every: 10,
            solver: SolverConfig::default(),
        }
    }
}

impl SimOptions {
    fn validate(&self) -> SimResult<()> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if !self.t_end.is_finite() || self.t_end < 0.0 {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// Record of simulation results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimRecord<S> {
    /// Time points (seconds)
    pub t: Vec<Real>,
    pub samples: Vec<S>,
    pub steps: usize,
}

/// What happened in one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub solve: SolveReport,
    pub transport: Option<TransportReport>,
}

/// Advance `model` by one step ending at `t`:
/// pre-process, solve, transport, commit.
pub fn step<M: SimModel>(model: &mut M, calc: &mut CircuitCalculator, t: Real) -> SimResult<StepReport> {
    model.pre_process(t)?;
    let solve = calc.process(model.circuit_mut())?;
    let transport = model.transport(calc.dt())?;
    calc.post_process(model.circuit_mut());
    Ok(StepReport { solve, transport })
}

/// Run a fixed-step simulation from t = 0 to `opts.t_end`.
pub fn run_sim<M: SimModel>(model: &mut M, opts: &SimOptions) -> SimResult<SimRecord<M::Sample>> {
    opts.validate()?;
    let mut calc = CircuitCalculator::new(opts.dt, opts.solver)?;

    tracing::info!(
        circuit = %model.circuit().name(),
        dt = opts.dt,
        t_end = opts.t_end,
        "simulation started"
    );

    let mut t = 0.0;
    let mut t_record = vec![t];
    let mut samples = vec![model.sample(t)];

    let mut steps = 0;
    while t < opts.t_end && steps < opts.max_steps {
        t = (steps + 1) as Real * opts.dt;
        step(model, &mut calc, t)?;
        steps += 1;

        if steps % opts.record_every == 0 {
            t_record.push(t);
            samples.push(model.sample(t));
        }
    }

    // Always record final state
    if steps % opts.record_every != 0 {
        t_record.push(t);
        samples.push(model.sample(t));
    }

    if steps == opts.max_steps && t < opts.t_end {
        tracing::warn!(steps, t, "simulation stopped at max_steps");
    }
    tracing::info!(circuit = %model.circuit().name(), steps, t, "simulation finished");

    Ok(SimRecord {
        t: t_record,
        samples,
        steps,
    })
}

/// Run independent simulations in parallel, one per model.
///
/// Each model owns its own circuit and transport state; results come back in
/// input order.
pub fn run_batch<M>(models: &mut [M], opts: &SimOptions) -> Vec<SimResult<SimRecord<M::Sample>>>
where
    M: SimModel + Send,
    M::Sample: Send,
{
    models
        .par_iter_mut()
        .map(|model| run_sim(model, opts))
        .collect()
}
