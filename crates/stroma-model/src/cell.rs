//! The tumour (cell) sub-model driver.
//!
//! Owns the lattice and one [`CellSite`] per lattice point. Each step:
//! recompute the distance field from current occupancy, integrate every
//! site's cell-cycle system, then resolve overflow in ranked order
//! through the [`Redistributor`]. Consumes spatial oxygen concentration
//! and emits spatial cell density.

use crate::error::ModelError;
use crate::hypomodel::{bundle_outputs, lattice_from_params, Hypomodel};
use crate::ode::{Integrator, RungeKutta4};
use crate::redistribute::Redistributor;
use crate::site::{CellRates, CellSite, Phase, Site, UpdateContext, PHASE_COUNT};
use stroma_core::{quantity, ConfigError, CouplingFrame, FrameError, Params, SiteIndex, StepId};
use stroma_lattice::{DistanceField, Lattice};

/// Driver for the cell-cycle population grid.
pub struct CellModel {
    name: String,
    lattice: Lattice,
    sites: Vec<CellSite>,
    redistributor: Redistributor,
    integrator: Box<dyn Integrator>,
    step: StepId,
}

impl CellModel {
    /// Create a model over an existing lattice with uniform rates.
    pub fn new(name: impl Into<String>, lattice: Lattice, rates: CellRates) -> Self {
        let sites = (0..lattice.site_count() as u32)
            .map(|n| {
                let index = SiteIndex(n);
                CellSite::new(index, lattice.location(index), rates)
            })
            .collect();
        Self {
            name: name.into(),
            lattice,
            sites,
            redistributor: Redistributor::default(),
            integrator: Box::new(RungeKutta4::default()),
            step: StepId::default(),
        }
    }

    /// Build lattice, rates, and name from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let lattice = lattice_from_params(params)?;
        let rates = CellRates::from_params(params)?;
        let name = params.get_str("name")?.unwrap_or("CellSimulation");
        Ok(Self::new(name, lattice, rates))
    }

    /// Swap in an external ODE integrator.
    pub fn set_integrator(&mut self, integrator: Box<dyn Integrator>) {
        self.integrator = integrator;
    }

    /// Swap in a redistributor with a non-default tolerance.
    pub fn set_redistributor(&mut self, redistributor: Redistributor) {
        self.redistributor = redistributor;
    }

    /// The lattice this model runs on.
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// All sites, in canonical order.
    pub fn sites(&self) -> &[CellSite] {
        &self.sites
    }

    /// Mutable access to one site.
    pub fn site_mut(&mut self, index: SiteIndex) -> &mut CellSite {
        &mut self.sites[index.as_usize()]
    }

    /// Per-site total occupancy, in canonical order.
    pub fn occupancies(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.occupancy()).collect()
    }

    /// Total population over the whole grid.
    pub fn total_population(&self) -> f64 {
        self.sites.iter().map(|s| s.occupancy()).sum()
    }

    /// Seed every site inside the sphere with the given per-phase
    /// population.
    pub fn seed_sphere(&mut self, centre: [f64; 3], radius: f64, population: [f64; PHASE_COUNT]) {
        let radius_sq = radius * radius;
        for site in &mut self.sites {
            let p = site.location();
            let dist_sq = (p[0] - centre[0]).powi(2)
                + (p[1] - centre[1]).powi(2)
                + (p[2] - centre[2]).powi(2);
            if dist_sq <= radius_sq {
                site.set_population(population);
            }
        }
    }

    /// Set the same oxygen concentration on every site.
    pub fn set_uniform_oxygen(&mut self, conc: f64) {
        for site in &mut self.sites {
            site.set_oxygen(conc);
        }
    }

    /// Scatter per-site oxygen samples, in canonical order.
    pub fn set_oxygen(&mut self, values: &[f64]) -> Result<(), ModelError> {
        if values.len() != self.sites.len() {
            return Err(ModelError::Frame(FrameError::LengthMismatch {
                quantity: quantity::OXYGEN.into(),
                got: values.len(),
                expected: self.sites.len(),
            }));
        }
        for (site, value) in self.sites.iter_mut().zip(values) {
            site.set_oxygen(*value);
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

impl Hypomodel for CellModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, dt: f64) -> Result<(), ModelError> {
        let attempt = self.step.next();

        let field = DistanceField::compute(&self.lattice, &self.occupancies())
            .map_err(|_| ModelError::DomainSaturated { step: attempt })?;
        for site in &mut self.sites {
            let index = site.index();
            site.set_distance(field.distance(index));
        }

        let ctx = UpdateContext::new(self.integrator.as_ref());
        for site in &mut self.sites {
            site.update(dt, &ctx);
        }

        self.redistributor
            .pass(&self.lattice, &field, &mut self.sites, attempt)?;

        self.step = attempt;
        log::debug!(
            "{}: step {} complete, total population {:.4}",
            self.name,
            self.step,
            self.total_population(),
        );
        Ok(())
    }

    fn state(&self) -> CouplingFrame {
        let locations: Vec<[f64; 3]> = self.sites.iter().map(|s| s.location()).collect();
        let totals = self.occupancies();
        CouplingFrame::from_series(quantity::CELL_COUNT, self.lattice.meta(), &locations, &totals)
    }

    fn outputs(&self) -> Vec<CouplingFrame> {
        bundle_outputs(self.lattice.meta(), &self.sites)
    }

    fn absorb(&mut self, frames: &[CouplingFrame]) -> Result<(), ModelError> {
        for frame in frames {
            if frame.quantity == quantity::OXYGEN {
                self.check_len(frame)?;
                for (site, sample) in self.sites.iter_mut().zip(&frame.samples) {
                    site.set_oxygen(sample.value);
                }
                continue;
            }
            if let Some(phase) = Phase::ALL.iter().find(|p| p.label() == frame.quantity) {
                self.check_len(frame)?;
                for (site, sample) in self.sites.iter_mut().zip(&frame.samples) {
                    site.set_phase_population(*phase, sample.value);
                }
            }
            // Other series (totals, distances) are derived state and
            // are ignored on input.
        }
        Ok(())
    }

    fn current_step(&self) -> StepId {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stroma_core::{FrameSink, GridMeta, NullSink, ParamValue};
    use stroma_lattice::{Extents, Neighbourhood};

    fn rates() -> CellRates {
        CellRates {
            k1s: 0.2,
            ks2: 0.2,
            k2m: 0.2,
            km1: 0.2,
            km0_base: 0.2,
            k01_base: 0.06,
            threshold_ox: 0.4,
            max_cell_number: 1.0,
        }
    }

    fn model(nx: u32, ny: u32, nz: u32) -> CellModel {
        let lattice = Lattice::new(Extents::new(nx, ny, nz), 1.0, Neighbourhood::Face).unwrap();
        CellModel::new("CellSimulation", lattice, rates())
    }

    /// Records every written label and bundle size.
    struct RecordingSink {
        written: Vec<(String, usize)>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                written: Vec::new(),
            }
        }
    }

    impl FrameSink for RecordingSink {
        fn write(
            &mut self,
            label: &str,
            frames: &[CouplingFrame],
        ) -> Result<(), stroma_core::FrameError> {
            self.written.push((label.to_string(), frames.len()));
            Ok(())
        }
    }

    // ── Construction ─────────────────────────────────────────────

    #[test]
    fn from_params_builds_grid_and_rates() {
        let params = Params::from_pairs([
            ("num_x", ParamValue::Int(3)),
            ("num_y", ParamValue::Int(3)),
            ("num_z", ParamValue::Int(3)),
            ("spacing", ParamValue::Float(1.0)),
            ("k1s", ParamValue::Float(0.2)),
            ("ks2", ParamValue::Float(0.2)),
            ("k2m", ParamValue::Float(0.2)),
            ("km1", ParamValue::Float(0.2)),
            ("km0_base", ParamValue::Float(0.2)),
            ("k01_base", ParamValue::Float(0.06)),
            ("threshold_ox", ParamValue::Float(0.4)),
            ("max_cell_number", ParamValue::Float(1.0)),
        ]);
        let model = CellModel::from_params(&params).unwrap();
        assert_eq!(model.sites().len(), 27);
        assert_eq!(model.name(), "CellSimulation");
    }

    #[test]
    fn from_params_requires_rate_constants() {
        let params = Params::from_pairs([
            ("num_x", ParamValue::Int(3)),
            ("num_y", ParamValue::Int(3)),
            ("num_z", ParamValue::Int(3)),
            ("spacing", ParamValue::Float(1.0)),
        ]);
        assert!(CellModel::from_params(&params).is_err());
    }

    // ── Seeding ──────────────────────────────────────────────────

    #[test]
    fn seed_sphere_fills_only_sites_inside() {
        let mut model = model(5, 5, 5);
        model.seed_sphere([2.0, 2.0, 2.0], 1.0, [0.25, 0.25, 0.25, 0.25, 0.0]);
        // Radius 1 around the centre covers the centre and its 6 face
        // neighbours.
        let occupied = model.occupancies().iter().filter(|&&n| n > 0.0).count();
        assert_eq!(occupied, 7);
        assert!((model.total_population() - 7.0).abs() < 1e-12);
    }

    // ── Stepping ─────────────────────────────────────────────────

    #[test]
    fn step_grows_population_under_oxygen() {
        let mut model = model(5, 5, 5);
        model.seed_sphere([2.0, 2.0, 2.0], 1.0, [0.25, 0.25, 0.25, 0.25, 0.0]);
        model.set_uniform_oxygen(0.8);
        let before = model.total_population();
        model.step(1.0).unwrap();
        assert!(model.total_population() > before);
        assert_eq!(model.current_step(), StepId(1));
    }

    #[test]
    fn step_redistributes_overflow_outward() {
        let mut model = model(3, 3, 3);
        let centre = model.lattice().index_of(1, 1, 1);
        model
            .site_mut(centre)
            .set_population([1.5, 0.0, 0.0, 0.0, 0.0]);
        model.step(1.0).unwrap();
        let source = &model.sites()[centre.as_usize()];
        assert!(source.occupancy() <= source.capacity() + 0.01);
        // Excess landed on the face neighbours.
        let spread: f64 = model
            .lattice()
            .neighbours(centre)
            .iter()
            .map(|n| model.sites()[n.as_usize()].occupancy())
            .sum();
        assert!(spread > 0.0);
    }

    #[test]
    fn step_conserves_mass_below_threshold() {
        // With km1 = 0 there is no division term; below the oxygen
        // threshold km0 routes M into G0, which is still an internal
        // transfer. Stepping may move population between phases and
        // sites but the grid total must hold.
        let lattice = Lattice::new(Extents::new(4, 4, 4), 1.0, Neighbourhood::Face).unwrap();
        let mut model = CellModel::new(
            "CellSimulation",
            lattice,
            CellRates {
                km1: 0.0,
                ..rates()
            },
        );
        model.seed_sphere([1.5, 1.5, 1.5], 1.5, [0.2, 0.2, 0.2, 0.2, 0.0]);
        let before = model.total_population();
        for _ in 0..5 {
            model.step(0.5).unwrap();
        }
        let after = model.total_population();
        assert!(
            ((before - after) / before).abs() < 1e-9,
            "before={before}, after={after}"
        );
    }

    #[test]
    fn saturated_domain_aborts_with_step() {
        let mut model = model(2, 2, 1);
        for n in 0..4u32 {
            model
                .site_mut(SiteIndex(n))
                .set_population([0.5, 0.0, 0.0, 0.0, 0.0]);
        }
        let err = model.step(1.0).unwrap_err();
        match err {
            ModelError::DomainSaturated { step } => assert_eq!(step, StepId(1)),
            other => panic!("expected DomainSaturated, got {other}"),
        }
    }

    #[test]
    fn failed_step_writes_no_output() {
        let mut model = model(2, 2, 1);
        for n in 0..4u32 {
            model
                .site_mut(SiteIndex(n))
                .set_population([0.5, 0.0, 0.0, 0.0, 0.0]);
        }
        let mut sink = RecordingSink::new();
        let result = model.run(3, 1.0, 1, &mut sink);
        assert!(result.is_err());
        // Only the initial bundle went out; the failing step wrote
        // nothing.
        assert_eq!(sink.written.len(), 1);
        assert_eq!(sink.written[0].0, "CellSimulation0");
    }

    // ── Output and coupling ──────────────────────────────────────

    #[test]
    fn run_writes_at_the_configured_cadence() {
        let mut model = model(3, 3, 3);
        model
            .site_mut(SiteIndex(0))
            .set_population([0.1, 0.0, 0.0, 0.0, 0.0]);
        let mut sink = RecordingSink::new();
        model.run(4, 1.0, 2, &mut sink).unwrap();
        let labels: Vec<&str> = sink.written.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(
            labels,
            vec!["CellSimulation0", "CellSimulation1", "CellSimulation3"]
        );
    }

    #[test]
    fn outputs_bundle_has_one_frame_per_series() {
        let model = model(2, 2, 2);
        let bundle = model.outputs();
        assert_eq!(bundle.len(), 9);
        assert!(bundle.iter().any(|f| f.quantity == quantity::CELL_COUNT));
        assert!(bundle
            .iter()
            .all(|f| f.samples.len() == model.sites().len()));
    }

    #[test]
    fn absorb_scatters_oxygen_and_phase_series() {
        let mut model = model(2, 1, 1);
        let meta = GridMeta {
            extents: (2, 1, 1),
            origin: [0.0; 3],
            spacing: 1.0,
        };
        let locations = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let frames = vec![
            CouplingFrame::from_series(quantity::OXYGEN, meta, &locations, &[0.7, 0.2]),
            CouplingFrame::from_series(quantity::G1_CELLS, meta, &locations, &[0.4, 0.0]),
        ];
        model.absorb(&frames).unwrap();
        assert_eq!(model.sites()[0].oxygen(), 0.7);
        assert_eq!(model.sites()[1].oxygen(), 0.2);
        assert_eq!(model.sites()[0].occupancy(), 0.4);
    }

    #[test]
    fn absorb_rejects_wrong_length() {
        let mut model = model(2, 1, 1);
        let meta = GridMeta {
            extents: (3, 1, 1),
            origin: [0.0; 3],
            spacing: 1.0,
        };
        let frames = vec![CouplingFrame::from_series(
            quantity::OXYGEN,
            meta,
            &[[0.0; 3]],
            &[0.7],
        )];
        assert!(matches!(
            model.absorb(&frames),
            Err(ModelError::Frame(FrameError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn null_sink_run_advances_all_steps() {
        let mut model = model(3, 3, 3);
        model
            .site_mut(SiteIndex(0))
            .set_population([0.1, 0.0, 0.0, 0.0, 0.0]);
        model.run(5, 1.0, 1, &mut NullSink).unwrap();
        assert_eq!(model.current_step(), StepId(5));
    }
}
