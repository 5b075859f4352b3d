//! The central-loop hypermodel orchestrator.
//!
//! Drives one coupling iteration per timestep through a fixed phase
//! cycle: step the cell sub-model, step the vessel sub-model, hand both
//! emitted fields to the diffusible sub-model for the external solves,
//! then scatter the sampled oxygen and growth factor back into the
//! cell and vessel sites.
//!
//! Scattered values are consumed by the NEXT iteration's updates, so
//! the coupling is one timestep lagged. That lag is operator splitting
//! by design, not an inconsistency to be repaired.

use crate::diffusible::DiffusibleModel;
use stroma_core::{ConfigError, FrameSink, Params, StepId};
use stroma_model::{CellModel, Hypomodel, ModelError, VesselModel};

/// Where the orchestrator is inside one coupling iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Between iterations.
    Idle,
    /// Advancing the cell sub-model.
    SteppingCell,
    /// Advancing the vessel sub-model.
    SteppingVessel,
    /// Invoking the external field solver.
    Solving,
    /// Writing sampled fields back into cell and vessel sites.
    Scattering,
}

/// Timestep and budget for a coupled run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CouplingConfig {
    /// Timestep per coupling iteration.
    pub dt: f64,
    /// Iteration budget for [`Hypermodel::run`].
    pub num_steps: u64,
    /// Iterations between output bundles.
    pub output_frequency: u64,
}

impl CouplingConfig {
    /// Extract the coupling configuration from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let output_frequency = params.require_u64("output_frequency")?;
        if output_frequency == 0 {
            return Err(ConfigError::Invalid {
                key: "output_frequency".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            dt: params.require_f64("time_increment")?,
            num_steps: params.require_u64("num_steps")?,
            output_frequency,
        })
    }
}

/// The composite model: three hypomodels exchanging fields each step.
pub struct Hypermodel {
    cell: CellModel,
    vessel: VesselModel,
    diffusible: DiffusibleModel,
    config: CouplingConfig,
    phase: Phase,
    step: StepId,
}

impl Hypermodel {
    /// Assemble the hypermodel, checking that all three sub-models run
    /// on grids of the same size.
    pub fn new(
        cell: CellModel,
        vessel: VesselModel,
        diffusible: DiffusibleModel,
        config: CouplingConfig,
    ) -> Result<Self, ConfigError> {
        let counts = [
            cell.lattice().site_count(),
            vessel.lattice().site_count(),
            diffusible.lattice().site_count(),
        ];
        if counts[0] != counts[1] || counts[0] != counts[2] {
            return Err(ConfigError::Invalid {
                key: "num_x/num_y/num_z".into(),
                reason: format!(
                    "sub-model grids disagree: cell {} vessel {} diffusible {} sites",
                    counts[0], counts[1], counts[2]
                ),
            });
        }
        Ok(Self {
            cell,
            vessel,
            diffusible,
            config,
            phase: Phase::Idle,
            step: StepId::default(),
        })
    }

    /// The cell sub-model.
    pub fn cell(&self) -> &CellModel {
        &self.cell
    }

    /// Mutable cell sub-model, for initial conditions.
    pub fn cell_mut(&mut self) -> &mut CellModel {
        &mut self.cell
    }

    /// The vessel sub-model.
    pub fn vessel(&self) -> &VesselModel {
        &self.vessel
    }

    /// Mutable vessel sub-model, for initial conditions.
    pub fn vessel_mut(&mut self) -> &mut VesselModel {
        &mut self.vessel
    }

    /// The diffusible sub-model.
    pub fn diffusible(&self) -> &DiffusibleModel {
        &self.diffusible
    }

    /// Current phase; on a fatal error this names the failing stage.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed coupling iterations.
    pub fn current_step(&self) -> StepId {
        self.step
    }

    /// Run one coupling iteration.
    ///
    /// On error the phase is left at the failing stage and the step
    /// counter is not advanced; nothing is retried.
    pub fn step(&mut self) -> Result<(), ModelError> {
        let dt = self.config.dt;

        self.phase = Phase::SteppingCell;
        self.cell.step(dt)?;
        let cell_state = self.cell.state();

        self.phase = Phase::SteppingVessel;
        self.vessel.step(dt)?;
        let vessel_state = self.vessel.state();

        self.phase = Phase::Solving;
        self.diffusible.absorb(&[cell_state, vessel_state])?;
        self.diffusible.step(dt)?;

        self.phase = Phase::Scattering;
        let oxygen = self.diffusible.oxygen_frame();
        let factor = self.diffusible.factor_frame();
        self.cell.absorb(std::slice::from_ref(&oxygen))?;
        self.vessel.absorb(std::slice::from_ref(&factor))?;

        self.phase = Phase::Idle;
        self.step = self.step.next();
        log::debug!(
            "coupling iteration {} complete, total population {:.4}",
            self.step,
            self.cell.total_population(),
        );
        Ok(())
    }

    /// Run to the configured iteration budget, writing every
    /// sub-model's output bundle at the configured cadence.
    ///
    /// Terminal on the budget or on the first fatal condition; a
    /// failing iteration writes nothing.
    pub fn run(&mut self, sink: &mut dyn FrameSink) -> Result<(), ModelError> {
        self.write_bundles(sink, 0)?;
        for idx in 0..self.config.num_steps {
            self.step()?;
            if idx % self.config.output_frequency == 0 {
                self.write_bundles(sink, idx + 1)?;
            }
        }
        Ok(())
    }

    fn write_bundles(&self, sink: &mut dyn FrameSink, n: u64) -> Result<(), ModelError> {
        for (name, bundle) in [
            (self.cell.name(), self.cell.outputs()),
            (self.vessel.name(), self.vessel.outputs()),
            (self.diffusible.name(), self.diffusible.outputs()),
        ] {
            sink.write(&format!("{name}{n}"), &bundle)
                .map_err(ModelError::Frame)?;
        }
        Ok(())
    }
}
