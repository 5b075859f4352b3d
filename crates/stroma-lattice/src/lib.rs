//! Spatial structures for Stroma simulations.
//!
//! This crate defines the [`Lattice`] — a regular 3-D grid of sites
//! with a fixed neighbour relation — and the per-step [`DistanceField`]
//! that classifies sites as free or occupied and ranks them by distance
//! to the nearest free site.
//!
//! Topology is built once at construction and never mutates; the
//! distance field is a transient artifact recomputed at the start of
//! every cycle that may trigger redistribution.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod distance;
pub mod error;
pub mod lattice;

pub use distance::DistanceField;
pub use error::{DistanceError, LatticeError};
pub use lattice::{Extents, Lattice, Neighbourhood};
