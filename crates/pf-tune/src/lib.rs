//! pf-tune: stabilization and baseline tuning of circuit parameters.
//!
//! A tuning run simulates a model until every tracked metric is steady, then
//! compares metrics with their baselines. Misses are turned into knob
//! rescalings by an [`AdjustmentPolicy`] and the cycle repeats until all
//! targets are met or the attempt or time budget runs out.

pub mod config;
pub mod error;
pub mod policy;
pub mod report;
pub mod stability;
pub mod tuner;

pub use config::{Knob, KnobElement, Measure, Reduction, Target, TuneConfig};
pub use error::{TuneError, TuneResult};
pub use policy::{AdjustmentPolicy, GainMatrix};
pub use report::{FatalReason, Termination, TuneReport};
pub use stability::{PeriodReducer, StabilityTracker};
pub use tuner::{Tuner, TunerState, relative_error, tune};
