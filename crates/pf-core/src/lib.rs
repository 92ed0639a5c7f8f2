//! pf-core: stable foundation for physioflow.
//!
//! Contains:
//! - units (circuit domains over uom SI types + native-unit constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact handles for nodes, paths, compartments, links, substances)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{PfError, PfResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
