//! Stroma: a grid-based tumour-growth hypermodel engine.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Stroma sub-crates. For most users, adding `stroma` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use stroma::prelude::*;
//!
//! // A 5×5×5 lattice with face-connected neighbourhoods.
//! let lattice = Lattice::new(Extents::new(5, 5, 5), 1.0, Neighbourhood::Face).unwrap();
//!
//! let rates = CellRates {
//!     k1s: 0.2,
//!     ks2: 0.2,
//!     k2m: 0.2,
//!     km1: 0.2,
//!     km0_base: 0.2,
//!     k01_base: 0.06,
//!     threshold_ox: 0.4,
//!     max_cell_number: 1.0,
//! };
//! let mut cells = CellModel::new("CellSimulation", lattice, rates);
//! cells.seed_sphere([2.0, 2.0, 2.0], 1.0, [0.25, 0.25, 0.25, 0.25, 0.0]);
//! cells.set_uniform_oxygen(0.8);
//!
//! cells.step(1.0).unwrap();
//! assert!(cells.total_population() > 7.0);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `stroma-core` | IDs, errors, parameters, coupling frames, collaborator seams |
//! | [`lattice`] | `stroma-lattice` | 3-D lattice topology and the distance field |
//! | [`model`] | `stroma-model` | Site variants, ODE seam, redistribution, drivers |
//! | [`couple`] | `stroma-couple` | Hypermodel orchestrator and coexecution |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, errors, parameters, and collaborator seams (`stroma-core`).
pub use stroma_core as types;

/// Lattice topology and distance field (`stroma-lattice`).
pub use stroma_lattice as lattice;

/// Site dynamics, redistribution, and drivers (`stroma-model`).
pub use stroma_model as model;

/// Hypermodel orchestration and coexecution (`stroma-couple`).
pub use stroma_couple as couple;

/// Common imports for typical Stroma usage.
///
/// ```rust
/// use stroma::prelude::*;
/// ```
pub mod prelude {
    // Core types and seams
    pub use stroma_core::{
        CouplingFrame, FieldSample, FieldSolver, FrameSink, FrameStore, GridMeta, NullSink,
        ParamValue, Params, PointSource, Sample, SiteIndex, Species, StepId,
    };

    // Errors
    pub use stroma_core::{ConfigError, FrameError, SolveError};

    // Lattice
    pub use stroma_lattice::{DistanceField, Extents, Lattice, Neighbourhood};

    // Sites and drivers
    pub use stroma_model::{
        CellModel, CellRates, CellSite, GenericSite, Hypomodel, Integrator, ModelError,
        Redistributor, RungeKutta4, Site, VesselModel, VesselRates, VesselSite,
    };

    // Coupling
    pub use stroma_couple::{
        CoexecConfig, CoexecEvent, CoexecOutcome, Coexecutor, CouplingConfig, DiffusibleModel,
        DiffusibleRates, FileWatcher, Hypermodel,
    };
}
