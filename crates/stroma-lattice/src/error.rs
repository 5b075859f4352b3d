//! Error types for lattice construction and distance computation.

use std::fmt;

/// Errors arising from lattice construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LatticeError {
    /// Attempted to construct a lattice with zero sites.
    EmptyLattice,
    /// An axis does not fit in `i32` coordinate arithmetic.
    DimensionTooLarge {
        /// Which axis ("nx", "ny", "nz").
        name: &'static str,
        /// The offending value.
        value: u32,
        /// The maximum allowed.
        max: u32,
    },
    /// The total site count does not fit in a `u32` site index.
    TooManySites {
        /// The requested site count.
        count: usize,
    },
}

impl fmt::Display for LatticeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyLattice => write!(f, "lattice must have at least one site"),
            Self::DimensionTooLarge { name, value, max } => {
                write!(f, "extent {name}={value} exceeds maximum {max}")
            }
            Self::TooManySites { count } => {
                write!(f, "lattice of {count} sites exceeds the u32 index range")
            }
        }
    }
}

impl std::error::Error for LatticeError {}

/// Errors arising from distance-field computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DistanceError {
    /// Every site is occupied: the domain has no free space left to
    /// absorb overflow. Fatal for the run; the caller attaches the
    /// timestep when surfacing it.
    DomainSaturated,
}

impl fmt::Display for DistanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomainSaturated => {
                write!(f, "no free sites left in the domain")
            }
        }
    }
}

impl std::error::Error for DistanceError {}
