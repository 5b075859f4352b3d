//! The steppable sub-model contract and shared driver configuration.
//!
//! A hypomodel is one independently steppable sub-model (cell, vessel,
//! diffusible substance). Each exposes single-increment stepping for an
//! external driver plus a self-driven [`run`](Hypomodel::run) loop with
//! periodic field output — the loop is a convenience wrapper over
//! `step`, not a distinct algorithm.

use crate::error::ModelError;
use crate::site::Site;
use stroma_core::{ConfigError, CouplingFrame, FrameSink, GridMeta, Params, StepId};
use stroma_lattice::{Extents, Lattice, LatticeError, Neighbourhood};

/// One independently steppable sub-model.
pub trait Hypomodel {
    /// Human-readable name, used for output labels and diagnostics.
    fn name(&self) -> &str;

    /// Advance every owned site by one timestep.
    fn step(&mut self, dt: f64) -> Result<(), ModelError>;

    /// The primary `(location, value)` series this sub-model emits for
    /// coupling.
    fn state(&self) -> CouplingFrame;

    /// The full named output bundle written to sinks.
    fn outputs(&self) -> Vec<CouplingFrame>;

    /// Scatter incoming series into per-site inputs. Series are matched
    /// by quantity name; unrecognised series are ignored.
    fn absorb(&mut self, frames: &[CouplingFrame]) -> Result<(), ModelError>;

    /// Number of completed steps.
    fn current_step(&self) -> StepId;

    /// Self-driven loop: write the initial bundle, then step `steps`
    /// times, writing the bundle after every `output_every`-th step.
    ///
    /// Output labels are `"<name><n>"` with `n = 0` for the initial
    /// state and the one-based step count afterwards. A fatal step
    /// error propagates before anything is written for that step, so a
    /// failing step never leaves partial output behind.
    fn run(
        &mut self,
        steps: u64,
        dt: f64,
        output_every: u64,
        sink: &mut dyn FrameSink,
    ) -> Result<(), ModelError> {
        let every = output_every.max(1);
        sink.write(&format!("{}0", self.name()), &self.outputs())
            .map_err(ModelError::Frame)?;
        for idx in 0..steps {
            self.step(dt)?;
            if idx % every == 0 {
                sink.write(&format!("{}{}", self.name(), idx + 1), &self.outputs())
                    .map_err(ModelError::Frame)?;
            }
        }
        Ok(())
    }

    /// [`run`](Hypomodel::run) with the cadence taken from a
    /// [`DriverConfig`].
    fn run_configured(
        &mut self,
        config: &DriverConfig,
        sink: &mut dyn FrameSink,
    ) -> Result<(), ModelError> {
        self.run(
            config.num_steps,
            config.time_increment,
            config.output_frequency,
            sink,
        )
    }
}

/// Timestep and output cadence shared by every driver.
#[derive(Clone, Debug, PartialEq)]
pub struct DriverConfig {
    /// Name of this sub-model instance.
    pub name: String,
    /// Number of steps a self-driven run performs.
    pub num_steps: u64,
    /// Timestep per increment.
    pub time_increment: f64,
    /// Steps between output bundles.
    pub output_frequency: u64,
}

impl DriverConfig {
    /// Extract the driver configuration from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let output_frequency = params.require_u64("output_frequency")?;
        if output_frequency == 0 {
            return Err(ConfigError::Invalid {
                key: "output_frequency".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            name: params.require_str("name")?.to_string(),
            num_steps: params.require_u64("num_steps")?,
            time_increment: params.require_f64("time_increment")?,
            output_frequency,
        })
    }
}

/// Collect every named output of a homogeneous site collection into one
/// frame per series, in the sites' canonical order.
pub fn bundle_outputs<S: Site>(meta: GridMeta, sites: &[S]) -> Vec<CouplingFrame> {
    let Some(first) = sites.first() else {
        return Vec::new();
    };
    let names: Vec<&'static str> = first.outputs().iter().map(|(name, _)| *name).collect();
    let locations: Vec<[f64; 3]> = sites.iter().map(|s| s.location()).collect();
    let rows: Vec<Vec<(&'static str, f64)>> = sites.iter().map(|s| s.outputs()).collect();

    names
        .iter()
        .enumerate()
        .map(|(column, name)| {
            let values: Vec<f64> = rows.iter().map(|row| row[column].1).collect();
            CouplingFrame::from_series(*name, meta, &locations, &values)
        })
        .collect()
}

/// Build the lattice described by the grid parameters
/// (`num_x`/`num_y`/`num_z`, `spacing`, optional `neighbourhood` of
/// `"face"` or `"full"`, defaulting to face).
pub fn lattice_from_params(params: &Params) -> Result<Lattice, ConfigError> {
    let axis = |key: &str| -> Result<u32, ConfigError> {
        let value = params.require_u64(key)?;
        u32::try_from(value).map_err(|_| ConfigError::Invalid {
            key: key.into(),
            reason: format!("extent {value} does not fit in u32"),
        })
    };
    let extents = Extents::new(axis("num_x")?, axis("num_y")?, axis("num_z")?);
    let spacing = params.require_f64("spacing")?;

    let neighbourhood = match params.get_str("neighbourhood")? {
        None | Some("face") => Neighbourhood::Face,
        Some("full") => Neighbourhood::Full,
        Some(other) => {
            return Err(ConfigError::Invalid {
                key: "neighbourhood".into(),
                reason: format!("expected 'face' or 'full', got '{other}'"),
            })
        }
    };

    Lattice::new(extents, spacing, neighbourhood).map_err(|e| match e {
        LatticeError::EmptyLattice => ConfigError::Invalid {
            key: "num_x/num_y/num_z".into(),
            reason: "every extent must be at least 1".into(),
        },
        LatticeError::DimensionTooLarge { name, value, max } => ConfigError::Invalid {
            key: name.into(),
            reason: format!("extent {value} exceeds maximum {max}"),
        },
        LatticeError::TooManySites { count } => ConfigError::Invalid {
            key: "num_x/num_y/num_z".into(),
            reason: format!("lattice of {count} sites exceeds the u32 index range"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stroma_core::ParamValue;

    fn grid_params() -> Params {
        Params::from_pairs([
            ("num_x", ParamValue::Int(4)),
            ("num_y", ParamValue::Int(3)),
            ("num_z", ParamValue::Int(2)),
            ("spacing", ParamValue::Float(0.5)),
        ])
    }

    #[test]
    fn lattice_from_params_defaults_to_face() {
        let lattice = lattice_from_params(&grid_params()).unwrap();
        assert_eq!(lattice.site_count(), 24);
        assert_eq!(lattice.neighbourhood(), Neighbourhood::Face);
        assert_eq!(lattice.spacing(), 0.5);
    }

    #[test]
    fn lattice_from_params_accepts_full() {
        let mut params = grid_params();
        params.insert("neighbourhood", ParamValue::Text("full".into()));
        let lattice = lattice_from_params(&params).unwrap();
        assert_eq!(lattice.neighbourhood(), Neighbourhood::Full);
    }

    #[test]
    fn lattice_from_params_rejects_unknown_neighbourhood() {
        let mut params = grid_params();
        params.insert("neighbourhood", ParamValue::Text("hex".into()));
        assert!(matches!(
            lattice_from_params(&params),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn lattice_from_params_requires_every_axis() {
        let params = Params::from_pairs([
            ("num_x", ParamValue::Int(4)),
            ("spacing", ParamValue::Float(1.0)),
        ]);
        assert!(matches!(
            lattice_from_params(&params),
            Err(ConfigError::MissingKey { .. })
        ));
    }

    #[test]
    fn driver_config_rejects_zero_output_frequency() {
        let params = Params::from_pairs([
            ("name", ParamValue::Text("CellSimulation".into())),
            ("num_steps", ParamValue::Int(10)),
            ("time_increment", ParamValue::Float(1.0)),
            ("output_frequency", ParamValue::Int(0)),
        ]);
        assert!(matches!(
            DriverConfig::from_params(&params),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn driver_config_extracts_all_fields() {
        let params = Params::from_pairs([
            ("name", ParamValue::Text("VesselSimulation".into())),
            ("num_steps", ParamValue::Int(80)),
            ("time_increment", ParamValue::Float(1.0)),
            ("output_frequency", ParamValue::Int(5)),
        ]);
        let config = DriverConfig::from_params(&params).unwrap();
        assert_eq!(config.name, "VesselSimulation");
        assert_eq!(config.num_steps, 80);
        assert_eq!(config.output_frequency, 5);
    }
}
