//! Coupling frames — the data exchanged between sub-models — and the
//! trait seams through which they leave and enter the process.
//!
//! A frame is one named per-site scalar series plus the grid metadata a
//! structured field file carries (dimensions, origin, spacing). Frames
//! are produced by one sub-model and consumed immutably by the next;
//! they live for a single coupling iteration.
//!
//! Reading and writing the field file format itself is an external
//! collaborator's concern, reached through [`FrameSink`] and
//! [`FrameStore`].

use crate::error::FrameError;
use std::path::Path;

/// Grid metadata carried alongside every frame bundle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMeta {
    /// Lattice extents `(nx, ny, nz)`.
    pub extents: (u32, u32, u32),
    /// Physical origin of site (0, 0, 0).
    pub origin: [f64; 3],
    /// Physical distance per lattice step.
    pub spacing: f64,
}

/// One sampled value at a physical location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample {
    /// Continuous location (lattice coordinate × spacing).
    pub location: [f64; 3],
    /// Scalar value at that location.
    pub value: f64,
}

/// A named per-site scalar series produced by one sub-model.
///
/// Samples follow the producing lattice's canonical site ordering, so a
/// consumer on the same grid may scatter by position without a spatial
/// lookup.
#[derive(Clone, Debug)]
pub struct CouplingFrame {
    /// Name of the quantity, e.g. `"Number of Cells"` or
    /// `"Oxygen Concentration"`.
    pub quantity: String,
    /// Grid metadata of the producing lattice.
    pub meta: GridMeta,
    /// One sample per site, in canonical site order.
    pub samples: Vec<FieldSample>,
}

impl CouplingFrame {
    /// Build a frame from per-site locations and values.
    ///
    /// # Panics
    ///
    /// Panics if `locations` and `values` have different lengths; the
    /// producer controls both, so a mismatch is a programming error.
    pub fn from_series(
        quantity: impl Into<String>,
        meta: GridMeta,
        locations: &[[f64; 3]],
        values: &[f64],
    ) -> Self {
        assert_eq!(
            locations.len(),
            values.len(),
            "location/value series length mismatch"
        );
        Self {
            quantity: quantity.into(),
            meta,
            samples: locations
                .iter()
                .zip(values)
                .map(|(location, value)| FieldSample {
                    location: *location,
                    value: *value,
                })
                .collect(),
        }
    }

    /// The values of this series in site order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }
}

/// Destination for periodic sub-model output.
///
/// Implemented by the external field-file writer; the engine only
/// decides *when* to write and *what* the bundle contains.
pub trait FrameSink {
    /// Write one labelled bundle of named series.
    fn write(&mut self, label: &str, frames: &[CouplingFrame]) -> Result<(), FrameError>;
}

/// Source of coupling input in coexecution mode.
///
/// Implemented by the external field-file reader watching the shared
/// coupling file.
pub trait FrameStore {
    /// Load the named series currently present at `path`.
    fn load(&mut self, path: &Path) -> Result<Vec<CouplingFrame>, FrameError>;
}

/// A sink that drops every bundle. Useful for standalone runs where
/// only the in-memory end state matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write(&mut self, _label: &str, _frames: &[CouplingFrame]) -> Result<(), FrameError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> GridMeta {
        GridMeta {
            extents: (2, 2, 1),
            origin: [0.0; 3],
            spacing: 1.0,
        }
    }

    #[test]
    fn from_series_pairs_locations_with_values() {
        let locations = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let frame = CouplingFrame::from_series("Number of Cells", meta(), &locations, &[3.0, 4.0]);
        assert_eq!(frame.samples.len(), 2);
        assert_eq!(frame.samples[1].location, [1.0, 0.0, 0.0]);
        assert_eq!(frame.values(), vec![3.0, 4.0]);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn from_series_rejects_mismatched_lengths() {
        let _ = CouplingFrame::from_series("Factor", meta(), &[[0.0; 3]], &[1.0, 2.0]);
    }

    #[test]
    fn null_sink_accepts_everything() {
        let frame = CouplingFrame::from_series("Density", meta(), &[[0.0; 3]], &[0.5]);
        assert!(NullSink.write("out0", &[frame]).is_ok());
    }
}
