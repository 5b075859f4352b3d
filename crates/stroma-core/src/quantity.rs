//! Canonical names of the per-site scalar series exchanged between
//! sub-models and written to field files.
//!
//! Consumers match incoming frames by these names, so they are part of
//! the coupling contract rather than presentation detail.

/// Total cells at a site (sum of the five cycle phases).
pub const CELL_COUNT: &str = "Number of Cells";
/// Cells in gap phase 1.
pub const G1_CELLS: &str = "G1 Cells";
/// Cells in synthesis phase.
pub const S_CELLS: &str = "S Cells";
/// Cells in gap phase 2.
pub const G2_CELLS: &str = "G2 Cells";
/// Cells in mitosis.
pub const M_CELLS: &str = "M Cells";
/// Quiescent cells.
pub const G0_CELLS: &str = "G0 Cells";
/// Proliferating cells (total minus quiescent).
pub const P_CELLS: &str = "P Cells";
/// Distance to the nearest free site.
pub const INTERFACE_DISTANCE: &str = "Interface Distance";
/// Local oxygen concentration.
pub const OXYGEN: &str = "Oxygen Concentration";
/// Local vessel density.
pub const VESSEL_DENSITY: &str = "Vessel Density";
/// Local growth-factor signal.
pub const FACTOR: &str = "Factor";
/// Generic scalar density.
pub const DENSITY: &str = "Density";
