//! Site dynamics and hypomodel drivers for Stroma simulations.
//!
//! This crate holds the per-site state variants ([`CellSite`],
//! [`VesselSite`], [`GenericSite`]), the cell-cycle ODE system behind
//! the [`Integrator`] seam, the capacity-driven [`Redistributor`], and
//! the steppable sub-model drivers ([`CellModel`], [`VesselModel`])
//! unified by the [`Hypomodel`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod error;
pub mod hypomodel;
pub mod ode;
pub mod redistribute;
pub mod site;
pub mod vessel;

pub use cell::CellModel;
pub use error::ModelError;
pub use hypomodel::{bundle_outputs, lattice_from_params, DriverConfig, Hypomodel};
pub use ode::{CellCycleOde, Integrator, OdeSystem, RungeKutta4};
pub use redistribute::Redistributor;
pub use site::{
    CellRates, CellSite, GenericSite, Phase, Site, UpdateContext, VesselRates, VesselSite,
    PHASE_COUNT,
};
pub use vessel::VesselModel;
