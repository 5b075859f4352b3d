//! The diffusible-substance sub-model.
//!
//! Takes in spatial cell and vessel densities, assembles them into
//! point sources and sinks, invokes the external [`FieldSolver`] once
//! per tracked species, and holds the sampled oxygen and growth-factor
//! fields on per-site [`GenericSite`]s for the other sub-models to
//! scatter from.
//!
//! A whole-invocation solver failure is fatal. A single unsampleable
//! point is not: the configured boundary value is substituted and the
//! substitution logged, so a systematic solver failure stays visible.

use stroma_core::{
    quantity, ConfigError, CouplingFrame, FieldSolver, Params, PointSource, Sample, SiteIndex,
    Species, StepId,
};
use stroma_lattice::Lattice;
use stroma_model::{
    lattice_from_params, GenericSite, Hypomodel, ModelError, RungeKutta4, Site, UpdateContext,
};

/// Source-assembly coefficients for the diffusible fields.
///
/// All are required parameters with no implicit defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffusibleRates {
    /// Vessel-to-tissue oxygen transfer coefficient.
    pub permeability: f64,
    /// Oxygen consumption per unit cell population.
    pub consumption_rate: f64,
    /// Growth-factor emission per unit cell population.
    pub factor_sensitivity: f64,
}

impl DiffusibleRates {
    /// Extract the coefficients from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            permeability: params.require_f64("permeability")?,
            consumption_rate: params.require_f64("consumption_rate")?,
            factor_sensitivity: params.require_f64("factor_sensitivity")?,
        })
    }
}

/// Driver for the diffusible oxygen and growth-factor fields.
pub struct DiffusibleModel {
    name: String,
    lattice: Lattice,
    solver: Box<dyn FieldSolver>,
    rates: DiffusibleRates,
    oxygen_boundary: f64,
    factor_boundary: f64,
    cell_sources: Vec<f64>,
    vessel_sources: Vec<f64>,
    oxygen: Vec<GenericSite>,
    factor: Vec<GenericSite>,
    integrator: RungeKutta4,
    step: StepId,
}

impl DiffusibleModel {
    /// Create a model over an existing lattice.
    ///
    /// The boundary substitution values default to the solver's
    /// Dirichlet conditions: oxygen 1.0 at the domain edge, growth
    /// factor 0.0.
    pub fn new(
        name: impl Into<String>,
        lattice: Lattice,
        solver: Box<dyn FieldSolver>,
        rates: DiffusibleRates,
    ) -> Self {
        let count = lattice.site_count();
        let make_sites = |initial: f64| -> Vec<GenericSite> {
            (0..count as u32)
                .map(|n| {
                    let index = SiteIndex(n);
                    GenericSite::new(index, lattice.location(index), initial)
                })
                .collect()
        };
        Self {
            name: name.into(),
            oxygen: make_sites(0.0),
            factor: make_sites(0.0),
            lattice,
            solver,
            rates,
            oxygen_boundary: 1.0,
            factor_boundary: 0.0,
            cell_sources: vec![0.0; count],
            vessel_sources: vec![0.0; count],
            integrator: RungeKutta4::default(),
            step: StepId::default(),
        }
    }

    /// Build lattice, rates, and name from a parameter mapping.
    pub fn from_params(params: &Params, solver: Box<dyn FieldSolver>) -> Result<Self, ConfigError> {
        let lattice = lattice_from_params(params)?;
        let rates = DiffusibleRates::from_params(params)?;
        let name = params.get_str("name")?.unwrap_or("ChemicalSimulation");
        Ok(Self::new(name, lattice, solver, rates))
    }

    /// Override the per-point boundary substitution values.
    pub fn set_boundary_values(&mut self, oxygen: f64, factor: f64) {
        self.oxygen_boundary = oxygen;
        self.factor_boundary = factor;
    }

    /// The lattice this model runs on.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// The sampled oxygen field as a coupling frame.
    pub fn oxygen_frame(&self) -> CouplingFrame {
        self.frame_of(quantity::OXYGEN, &self.oxygen)
    }

    /// The sampled growth-factor field as a coupling frame.
    pub fn factor_frame(&self) -> CouplingFrame {
        self.frame_of(quantity::FACTOR, &self.factor)
    }

    fn frame_of(&self, name: &str, sites: &[GenericSite]) -> CouplingFrame {
        let locations: Vec<[f64; 3]> = sites.iter().map(|s| s.location()).collect();
        let values: Vec<f64> = sites.iter().map(|s| s.density()).collect();
        CouplingFrame::from_series(name, self.lattice.meta(), &locations, &values)
    }

    /// Assemble the source list for one species.
    fn assemble(&self, species: Species) -> Vec<PointSource> {
        let locations = self.lattice.locations();
        let mut sources = Vec::new();
        match species {
            Species::Oxygen => {
                for (location, density) in locations.iter().zip(&self.vessel_sources) {
                    sources.push(PointSource {
                        location: *location,
                        strength: self.rates.permeability * density,
                    });
                }
                for (location, population) in locations.iter().zip(&self.cell_sources) {
                    sources.push(PointSource {
                        location: *location,
                        strength: -self.rates.consumption_rate * population,
                    });
                }
            }
            Species::GrowthFactor => {
                for (location, population) in locations.iter().zip(&self.cell_sources) {
                    sources.push(PointSource {
                        location: *location,
                        strength: self.rates.factor_sensitivity * population,
                    });
                }
            }
        }
        sources
    }

    /// Solve one species and scatter the samples, substituting the
    /// boundary value for unsampleable points.
    fn solve_species(&mut self, species: Species) -> Result<(), ModelError> {
        let sources = self.assemble(species);
        let sample_at = self.lattice.locations();
        let samples = self.solver.solve(species, &sources, &sample_at)?;

        let (sites, fallback) = match species {
            Species::Oxygen => (&mut self.oxygen, self.oxygen_boundary),
            Species::GrowthFactor => (&mut self.factor, self.factor_boundary),
        };
        for (site, sample) in sites.iter_mut().zip(&samples) {
            match sample {
                Sample::Value(v) => site.set_density(*v),
                Sample::Unavailable => {
                    let p = site.location();
                    log::warn!(
                        "{species} unavailable at site {} ({:.3}, {:.3}, {:.3}); \
                         substituting boundary value {fallback}",
                        site.index(),
                        p[0],
                        p[1],
                        p[2],
                    );
                    site.set_density(fallback);
                }
            }
        }
        Ok(())
    }
}

impl Hypomodel for DiffusibleModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, dt: f64) -> Result<(), ModelError> {
        self.solve_species(Species::Oxygen)?;
        self.solve_species(Species::GrowthFactor)?;

        let ctx = UpdateContext::new(&self.integrator);
        for site in self.oxygen.iter_mut().chain(self.factor.iter_mut()) {
            site.update(dt, &ctx);
        }
        self.step = self.step.next();
        Ok(())
    }

    fn state(&self) -> CouplingFrame {
        self.oxygen_frame()
    }

    fn outputs(&self) -> Vec<CouplingFrame> {
        vec![self.oxygen_frame(), self.factor_frame()]
    }

    fn absorb(&mut self, frames: &[CouplingFrame]) -> Result<(), ModelError> {
        for frame in frames {
            let target = match frame.quantity.as_str() {
                quantity::CELL_COUNT => &mut self.cell_sources,
                quantity::VESSEL_DENSITY => &mut self.vessel_sources,
                _ => continue,
            };
            if frame.samples.len() != target.len() {
                return Err(ModelError::Frame(stroma_core::FrameError::LengthMismatch {
                    quantity: frame.quantity.clone(),
                    got: frame.samples.len(),
                    expected: target.len(),
                }));
            }
            for (slot, sample) in target.iter_mut().zip(&frame.samples) {
                *slot = sample.value;
            }
        }
        Ok(())
    }

    fn current_step(&self) -> StepId {
        self.step
    }
}
