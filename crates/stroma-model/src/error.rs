//! Error types for sub-model stepping.

use std::error::Error;
use std::fmt;
use stroma_core::{FrameError, SiteIndex, SolveError, StepId};

/// Fatal conditions raised while advancing a sub-model.
///
/// None of these are retried: each one terminates the run with enough
/// context (step, site index and location) to reproduce the failure.
#[derive(Debug)]
pub enum ModelError {
    /// No free sites remain anywhere in the domain, so overflow has
    /// nowhere to go.
    DomainSaturated {
        /// The step being attempted when saturation was detected.
        step: StepId,
    },
    /// An over-capacity site found no neighbour strictly closer to free
    /// space: the growing mass has reached the domain edge with no
    /// outward path. The grid extents are too small for the requested
    /// dynamics.
    BoundarySaturated {
        /// The site that failed to shed its excess.
        site: SiteIndex,
        /// Its physical location.
        location: [f64; 3],
        /// The step being attempted.
        step: StepId,
    },
    /// Coupling input could not be loaded or did not fit the grid.
    Frame(FrameError),
    /// The external field solver failed outright.
    Solve(SolveError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomainSaturated { step } => {
                write!(f, "domain saturated at step {step}: no free sites left")
            }
            Self::BoundarySaturated {
                site,
                location,
                step,
            } => write!(
                f,
                "site {site} at ({:.3}, {:.3}, {:.3}) failed to redistribute at step {step}: \
                 the tumour has reached the domain boundary",
                location[0], location[1], location[2]
            ),
            Self::Frame(e) => write!(f, "coupling frame: {e}"),
            Self::Solve(e) => write!(f, "field solve: {e}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Frame(e) => Some(e),
            Self::Solve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for ModelError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl From<SolveError> for ModelError {
    fn from(e: SolveError) -> Self {
        Self::Solve(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_carry_step_and_site() {
        let e = ModelError::DomainSaturated { step: StepId(7) };
        assert!(e.to_string().contains("step 7"));

        let e = ModelError::BoundarySaturated {
            site: SiteIndex(13),
            location: [1.0, 2.0, 3.0],
            step: StepId(4),
        };
        let msg = e.to_string();
        assert!(msg.contains("site 13"));
        assert!(msg.contains("step 4"));
        assert!(msg.contains("boundary"));
    }
}
