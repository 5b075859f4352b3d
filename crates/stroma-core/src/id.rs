//! Strongly-typed identifiers shared across the workspace.

use std::fmt;

/// Identifies a site within a lattice.
///
/// Sites are assigned sequential indices at lattice construction;
/// `SiteIndex(n)` is the n-th site in the lattice's canonical
/// (x-fastest) ordering. The index↔coordinate mapping is bijective and
/// stable for the lattice's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteIndex(pub u32);

impl SiteIndex {
    /// The index as a `usize`, for slice access.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SiteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SiteIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing step counter.
///
/// Incremented each time a sub-model or the hypermodel advances one
/// timestep. Carried in fatal diagnostics so a failing run can be
/// reproduced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The next step.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
