//! The external field-solver seam.
//!
//! The diffusible-substance field solver (elliptic/parabolic, typically
//! finite-element) is an external collaborator: given point sources and
//! sinks with positions and magnitudes, it returns field values sampled
//! at requested locations. It is treated as pure and stateless per
//! invocation; boundary conditions and diffusion parameters are the
//! implementation's own configuration.

use std::error::Error;
use std::fmt;

/// A tracked diffusible species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Species {
    /// Oxygen concentration (vessels source, cells consume).
    Oxygen,
    /// Angiogenic growth factor (cells source, decays in tissue).
    GrowthFactor,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oxygen => write!(f, "oxygen"),
            Self::GrowthFactor => write!(f, "growth factor"),
        }
    }
}

/// One point source (positive strength) or sink (negative strength).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointSource {
    /// Physical location of the source.
    pub location: [f64; 3],
    /// Signed magnitude.
    pub strength: f64,
}

/// One sampled field value.
///
/// `Unavailable` marks a point the solver could not evaluate (e.g.
/// outside its mesh). The consumer substitutes a configured boundary
/// default and logs the substitution — recoverable, unlike
/// [`SolveError`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    /// The field value at the requested point.
    Value(f64),
    /// The solver could not evaluate this point.
    Unavailable,
}

/// Errors from a whole solver invocation. Always fatal for the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveError {
    /// The solver failed to assemble or solve the system.
    Failed {
        /// Which species was being solved.
        species: &'static str,
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { species, reason } => {
                write!(f, "{species} solve failed: {reason}")
            }
        }
    }
}

impl Error for SolveError {}

/// The external elliptic/parabolic solver collaborator.
///
/// One invocation per tracked species per coupling iteration. The
/// returned vector has one [`Sample`] per entry of `sample_at`, in
/// order.
pub trait FieldSolver {
    /// Solve for one species given assembled sources/sinks, sampling
    /// the resulting field at `sample_at`.
    fn solve(
        &mut self,
        species: Species,
        sources: &[PointSource],
        sample_at: &[[f64; 3]],
    ) -> Result<Vec<Sample>, SolveError>;
}
