//! Hypermodel orchestration for Stroma simulations.
//!
//! Couples the independently steppable sub-models (cell, vessel,
//! diffusible substance) by exchanging spatial fields once per
//! timestep, in one of two interchangeable modes:
//!
//! - **central loop** ([`Hypermodel`]): one process drives
//!   cell → vessel → solve → scatter synchronously;
//! - **coexecution** ([`Coexecutor`]): a sub-model process reacts to
//!   file-change notifications on a shared coupling file, sleeping
//!   otherwise, with a wall-clock wait budget.
//!
//! Per-site logic is identical in both modes; only the driving differs.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coexec;
pub mod diffusible;
pub mod hypermodel;

pub use coexec::{CoexecConfig, CoexecEvent, CoexecOutcome, Coexecutor, FileWatcher};
pub use diffusible::{DiffusibleModel, DiffusibleRates};
pub use hypermodel::{CouplingConfig, Hypermodel, Phase};
