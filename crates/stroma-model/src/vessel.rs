//! The vasculature sub-model driver.
//!
//! Owns one [`VesselSite`] per lattice point. Consumes the spatial
//! growth-factor signal and emits spatial vessel density. There is no
//! capacity mechanism here: vessel density relaxes locally and never
//! moves between sites.

use crate::error::ModelError;
use crate::hypomodel::{bundle_outputs, lattice_from_params, Hypomodel};
use crate::ode::RungeKutta4;
use crate::site::{Site, UpdateContext, VesselRates, VesselSite};
use stroma_core::{quantity, ConfigError, CouplingFrame, FrameError, Params, SiteIndex, StepId};
use stroma_lattice::Lattice;

/// Driver for the vessel-density grid.
pub struct VesselModel {
    name: String,
    lattice: Lattice,
    sites: Vec<VesselSite>,
    // Vessel sites integrate explicitly and never touch the context;
    // the integrator only satisfies the update contract.
    integrator: RungeKutta4,
    step: StepId,
}

impl VesselModel {
    /// Create a model over an existing lattice with uniform rates.
    pub fn new(name: impl Into<String>, lattice: Lattice, rates: VesselRates) -> Self {
        let sites = (0..lattice.site_count() as u32)
            .map(|n| {
                let index = SiteIndex(n);
                VesselSite::new(index, lattice.location(index), rates)
            })
            .collect();
        Self {
            name: name.into(),
            lattice,
            sites,
            integrator: RungeKutta4::default(),
            step: StepId::default(),
        }
    }

    /// Build lattice, rates, and name from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let lattice = lattice_from_params(params)?;
        let rates = VesselRates::from_params(params)?;
        let name = params.get_str("name")?.unwrap_or("VesselSimulation");
        Ok(Self::new(name, lattice, rates))
    }

    /// The lattice this model runs on.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// All sites, in canonical order.
    pub fn sites(&self) -> &[VesselSite] {
        &self.sites
    }

    /// Mutable access to one site.
    pub fn site_mut(&mut self, index: SiteIndex) -> &mut VesselSite {
        &mut self.sites[index.as_usize()]
    }

    /// Set the same vessel density on every site.
    pub fn set_uniform_density(&mut self, density: f64) {
        for site in &mut self.sites {
            site.set_density(density);
        }
    }

    /// Per-site vessel density, in canonical order.
    pub fn densities(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.density()).collect()
    }

    /// Scatter per-site growth-factor samples, in canonical order.
    pub fn set_factor(&mut self, values: &[f64]) -> Result<(), ModelError> {
        if values.len() != self.sites.len() {
            return Err(ModelError::Frame(FrameError::LengthMismatch {
                quantity: quantity::FACTOR.into(),
                got: values.len(),
                expected: self.sites.len(),
            }));
        }
        for (site, value) in self.sites.iter_mut().zip(values) {
            site.set_factor(*value);
        }
        Ok(())
    }

    fn check_len(&self, frame: &CouplingFrame) -> Result<(), ModelError> {
        if frame.samples.len() != self.sites.len() {
            return Err(ModelError::Frame(FrameError::LengthMismatch {
                quantity: frame.quantity.clone(),
                got: frame.samples.len(),
                expected: self.sites.len(),
            }));
        }
        Ok(())
    }
}

impl Hypomodel for VesselModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, dt: f64) -> Result<(), ModelError> {
        let ctx = UpdateContext::new(&self.integrator);
        for site in &mut self.sites {
            site.update(dt, &ctx);
        }
        self.step = self.step.next();
        log::debug!("{}: step {} complete", self.name, self.step);
        Ok(())
    }

    fn state(&self) -> CouplingFrame {
        let locations: Vec<[f64; 3]> = self.sites.iter().map(|s| s.location()).collect();
        let densities = self.densities();
        CouplingFrame::from_series(
            quantity::VESSEL_DENSITY,
            self.lattice.meta(),
            &locations,
            &densities,
        )
    }

    fn outputs(&self) -> Vec<CouplingFrame> {
        bundle_outputs(self.lattice.meta(), &self.sites)
    }

    fn absorb(&mut self, frames: &[CouplingFrame]) -> Result<(), ModelError> {
        for frame in frames {
            match frame.quantity.as_str() {
                quantity::FACTOR => {
                    self.check_len(frame)?;
                    for (site, sample) in self.sites.iter_mut().zip(&frame.samples) {
                        site.set_factor(sample.value);
                    }
                }
                quantity::VESSEL_DENSITY => {
                    self.check_len(frame)?;
                    for (site, sample) in self.sites.iter_mut().zip(&frame.samples) {
                        site.set_density(sample.value);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn current_step(&self) -> StepId {
        self.step
    }
}
