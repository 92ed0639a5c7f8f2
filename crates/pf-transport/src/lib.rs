//! pf-transport: substance transport over the compartment graph.
//!
//! Compartments mirror circuit nodes and hold substance quantities; links
//! mirror circuit paths and carry their solved flux. Each step, [`transport`]
//! advects substances along link fluxes, and the functions in [`diffusion`]
//! apply membrane exchange and aerosol deposition.
//!
//! Compartments may nest; a parent aggregates its leaves. The [`thermal`]
//! module mirrors a thermal circuit the same way, reporting heat and
//! temperature per compartment and heat flow per link.

pub mod compartment;
pub mod diffusion;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod link;
pub mod manager;
pub mod substance;
pub mod thermal;
pub mod transporter;

pub use compartment::{Compartment, Phase, QuantityKind, SubstanceQuantity};
pub use diffusion::{deposit_aerosol, partial_pressure_diffusion, simple_diffusion};
pub use error::{TransportError, TransportResult};
pub use graph::CompartmentGraph;
pub use hierarchy::Hierarchy;
pub use link::CompartmentLink;
pub use manager::CompartmentManager;
pub use substance::{Substance, SubstanceCatalog, SubstanceState};
pub use thermal::{ThermalCompartment, ThermalCompartmentManager, ThermalLink};
pub use transporter::{TransportReport, transport};
