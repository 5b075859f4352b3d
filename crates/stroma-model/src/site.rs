//! Per-site state variants and their local dynamics.
//!
//! Every lattice point carries one site. Sites are polymorphic over the
//! capability set {update, outputs, set_constants} through the [`Site`]
//! trait; the concrete variants are [`CellSite`] (five-phase cell-cycle
//! population), [`VesselSite`] (scalar vessel density driven by a
//! growth-factor signal), and [`GenericSite`] (scalar density with no
//! local dynamics).
//!
//! Neighbour relations live in the lattice, not here: sites refer to
//! each other only through lattice indices.

use crate::ode::{CellCycleOde, Integrator};
use stroma_core::{quantity, ConfigError, Params, SiteIndex};

/// Number of cell-cycle phases tracked per cell site.
pub const PHASE_COUNT: usize = 5;

/// One phase of the cell cycle, in state-vector order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Gap phase 1.
    G1,
    /// Synthesis.
    S,
    /// Gap phase 2.
    G2,
    /// Mitosis.
    M,
    /// Quiescence.
    G0,
}

impl Phase {
    /// All phases in state-vector order.
    pub const ALL: [Phase; PHASE_COUNT] = [Phase::G1, Phase::S, Phase::G2, Phase::M, Phase::G0];

    /// Position of this phase in the population vector.
    pub fn index(self) -> usize {
        match self {
            Self::G1 => 0,
            Self::S => 1,
            Self::G2 => 2,
            Self::M => 3,
            Self::G0 => 4,
        }
    }

    /// The series name this phase is exchanged under.
    pub fn label(self) -> &'static str {
        match self {
            Self::G1 => quantity::G1_CELLS,
            Self::S => quantity::S_CELLS,
            Self::G2 => quantity::G2_CELLS,
            Self::M => quantity::M_CELLS,
            Self::G0 => quantity::G0_CELLS,
        }
    }
}

/// Execution context passed to each site's `update`.
///
/// Carries the collaborators a local update may need; today that is
/// only the ODE integrator.
pub struct UpdateContext<'a> {
    integrator: &'a dyn Integrator,
}

impl<'a> UpdateContext<'a> {
    /// Construct a context around an integrator.
    pub fn new(integrator: &'a dyn Integrator) -> Self {
        Self { integrator }
    }

    /// The ODE integrator collaborator.
    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator
    }
}

/// One lattice point carrying local sub-model state.
///
/// Object-safe so drivers can hold mixed collections and apply the same
/// step/constants/output mechanics to every variant.
pub trait Site {
    /// The site's lattice index.
    fn index(&self) -> SiteIndex;

    /// Continuous location (lattice coordinate × spacing).
    fn location(&self) -> [f64; 3];

    /// Total occupancy: the quantity the distance field classifies on.
    fn occupancy(&self) -> f64;

    /// Re-read this variant's rate constants from a parameter mapping.
    fn set_constants(&mut self, params: &Params) -> Result<(), ConfigError>;

    /// Apply the local update over `[t, t+dt]` and advance the clock.
    fn update(&mut self, dt: f64, ctx: &UpdateContext<'_>);

    /// Named per-site output scalars, in stable order.
    fn outputs(&self) -> Vec<(&'static str, f64)>;
}

// ── Cell sites ───────────────────────────────────────────────────

/// Rate constants and capacity for cell sites.
///
/// All fields are required parameters with no implicit defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRates {
    /// G1 → S rate.
    pub k1s: f64,
    /// S → G2 rate.
    pub ks2: f64,
    /// G2 → M rate.
    pub k2m: f64,
    /// M → G1 (mitosis) rate.
    pub km1: f64,
    /// M → G0 rate when oxygen is below the threshold.
    pub km0_base: f64,
    /// G0 → G1 rate when oxygen is at or above the threshold.
    pub k01_base: f64,
    /// Oxygen concentration separating the two regimes.
    pub threshold_ox: f64,
    /// Maximum total occupancy before redistribution triggers.
    pub max_cell_number: f64,
}

impl CellRates {
    /// Extract the cell rate constants from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            k1s: params.require_f64("k1s")?,
            ks2: params.require_f64("ks2")?,
            k2m: params.require_f64("k2m")?,
            km1: params.require_f64("km1")?,
            km0_base: params.require_f64("km0_base")?,
            k01_base: params.require_f64("k01_base")?,
            threshold_ox: params.require_f64("threshold_ox")?,
            max_cell_number: params.require_f64("max_cell_number")?,
        })
    }
}

/// A site carrying a five-phase cell-cycle population.
#[derive(Clone, Debug)]
pub struct CellSite {
    index: SiteIndex,
    location: [f64; 3],
    population: [f64; PHASE_COUNT],
    total: f64,
    conc_ox: f64,
    distance: f64,
    time: f64,
    update_time: f64,
    rates: CellRates,
}

impl CellSite {
    /// Create an empty cell site.
    pub fn new(index: SiteIndex, location: [f64; 3], rates: CellRates) -> Self {
        Self {
            index,
            location,
            population: [0.0; PHASE_COUNT],
            total: 0.0,
            conc_ox: 0.0,
            distance: -1.0,
            time: 0.0,
            update_time: 0.0,
            rates,
        }
    }

    /// Replace the per-phase population and recompute the total.
    pub fn set_population(&mut self, population: [f64; PHASE_COUNT]) {
        self.population = population;
        self.refresh_total();
    }

    /// The per-phase population vector.
    pub fn population(&self) -> &[f64; PHASE_COUNT] {
        &self.population
    }

    /// Replace a single phase's population and recompute the total.
    pub fn set_phase_population(&mut self, phase: Phase, value: f64) {
        self.population[phase.index()] = value;
        self.refresh_total();
    }

    /// This site's capacity.
    pub fn capacity(&self) -> f64 {
        self.rates.max_cell_number
    }

    /// The rate constants in effect.
    pub fn rates(&self) -> &CellRates {
        &self.rates
    }

    /// Replace the rate constants.
    pub fn set_rates(&mut self, rates: CellRates) {
        self.rates = rates;
    }

    /// Local oxygen concentration used by the next update.
    pub fn oxygen(&self) -> f64 {
        self.conc_ox
    }

    /// Scatter an oxygen sample into this site.
    pub fn set_oxygen(&mut self, conc: f64) {
        self.conc_ox = conc;
    }

    /// Distance to the nearest free site, as of the last field refresh.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Stash the freshly computed distance on the site.
    pub fn set_distance(&mut self, distance: f64) {
        self.distance = distance;
    }

    /// Local clock.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Local time of the last redistribution out of this site.
    pub fn last_redistributed(&self) -> f64 {
        self.update_time
    }

    /// Remove exactly the proportional excess that brings this site
    /// back to capacity; returns the per-phase amounts removed.
    ///
    /// With `frac = occupancy / capacity`, each phase sheds
    /// `pop·(frac − 1)/frac`, so the post-skim total is the capacity.
    pub fn skim_excess(&mut self) -> [f64; PHASE_COUNT] {
        let frac = self.total / self.rates.max_cell_number;
        let mut moved = [0.0; PHASE_COUNT];
        for (pop, out) in self.population.iter_mut().zip(moved.iter_mut()) {
            *out = *pop * (frac - 1.0) / frac;
            *pop -= *out;
        }
        self.refresh_total();
        moved
    }

    /// Add an incoming per-phase share from a redistributing neighbour.
    pub fn receive(&mut self, share: &[f64; PHASE_COUNT]) {
        for (pop, add) in self.population.iter_mut().zip(share) {
            *pop += add;
        }
        self.refresh_total();
    }

    /// Stamp the time of a completed redistribution out of this site.
    pub fn mark_redistributed(&mut self) {
        self.update_time = self.time;
    }

    fn refresh_total(&mut self) {
        self.total = self.population.iter().sum();
        for phase in Phase::ALL {
            let value = self.population[phase.index()];
            if value < 0.0 {
                log::warn!(
                    "site {}: {} went negative ({value:.6e}); \
                     the rate constants are outside the valid regime",
                    self.index,
                    phase.label(),
                );
            }
        }
    }
}

impl Site for CellSite {
    fn index(&self) -> SiteIndex {
        self.index
    }

    fn location(&self) -> [f64; 3] {
        self.location
    }

    fn occupancy(&self) -> f64 {
        self.total
    }

    fn set_constants(&mut self, params: &Params) -> Result<(), ConfigError> {
        self.rates = CellRates::from_params(params)?;
        Ok(())
    }

    fn update(&mut self, dt: f64, ctx: &UpdateContext<'_>) {
        if self.total > 0.0 {
            // The oxygen switch is resolved once per update call, from
            // the concentration current right now: below the threshold
            // cells exit M into quiescence, at or above it quiescent
            // cells re-enter the cycle.
            let (km0, k01) = if self.conc_ox >= self.rates.threshold_ox {
                (0.0, self.rates.k01_base)
            } else {
                (self.rates.km0_base, 0.0)
            };
            let system = CellCycleOde {
                k1s: self.rates.k1s,
                ks2: self.rates.ks2,
                k2m: self.rates.k2m,
                km1: self.rates.km1,
                km0,
                k01,
            };
            ctx.integrator()
                .solve(&system, self.time, self.time + dt, &mut self.population);
            self.refresh_total();
        }
        self.time += dt;
    }

    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![
            (quantity::CELL_COUNT, self.total),
            (quantity::G1_CELLS, self.population[0]),
            (quantity::S_CELLS, self.population[1]),
            (quantity::G2_CELLS, self.population[2]),
            (quantity::M_CELLS, self.population[3]),
            (quantity::G0_CELLS, self.population[4]),
            (quantity::P_CELLS, self.total - self.population[4]),
            (quantity::INTERFACE_DISTANCE, self.distance),
            (quantity::OXYGEN, self.conc_ox),
        ]
    }
}

// ── Vessel sites ─────────────────────────────────────────────────

/// Rate constants for vessel sites. All required, no defaults.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VesselRates {
    /// Stimulated growth rate towards `v_max`.
    pub r_max: f64,
    /// Relaxation rate towards `v_eq`.
    pub r_eq: f64,
    /// Maximum vessel density under full stimulation.
    pub v_max: f64,
    /// Unstimulated equilibrium density.
    pub v_eq: f64,
}

impl VesselRates {
    /// Extract the vessel rate constants from a parameter mapping.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self {
            r_max: params.require_f64("r_max")?,
            r_eq: params.require_f64("r_eq")?,
            v_max: params.require_f64("v_max")?,
            v_eq: params.require_f64("v_eq")?,
        })
    }
}

/// A site carrying scalar vessel density and its growth-factor input.
#[derive(Clone, Debug)]
pub struct VesselSite {
    index: SiteIndex,
    location: [f64; 3],
    density: f64,
    factor: f64,
    time: f64,
    rates: VesselRates,
}

impl VesselSite {
    /// The growth-factor level at which stimulation switches on.
    pub const FACTOR_THRESHOLD: f64 = 0.5;

    /// Create a vessel site with zero density and factor.
    pub fn new(index: SiteIndex, location: [f64; 3], rates: VesselRates) -> Self {
        Self {
            index,
            location,
            density: 0.0,
            factor: 0.0,
            time: 0.0,
            rates,
        }
    }

    /// Current vessel density.
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Replace the vessel density.
    pub fn set_density(&mut self, density: f64) {
        self.density = density;
    }

    /// The incoming growth-factor signal.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Scatter a growth-factor sample into this site.
    pub fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }
}

impl Site for VesselSite {
    fn index(&self) -> SiteIndex {
        self.index
    }

    fn location(&self) -> [f64; 3] {
        self.location
    }

    fn occupancy(&self) -> f64 {
        self.density
    }

    fn set_constants(&mut self, params: &Params) -> Result<(), ConfigError> {
        self.rates = VesselRates::from_params(params)?;
        Ok(())
    }

    fn update(&mut self, dt: f64, _ctx: &UpdateContext<'_>) {
        // Single explicit Euler step per call.
        let alpha = if self.factor >= Self::FACTOR_THRESHOLD {
            1.0
        } else {
            0.0
        };
        let v = self.density;
        let delta =
            self.rates.r_max * alpha * (self.rates.v_max - v) - self.rates.r_eq * (v - self.rates.v_eq);
        self.density = v + dt * delta;
        self.time += dt;
    }

    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![
            (quantity::VESSEL_DENSITY, self.density),
            (quantity::FACTOR, self.factor),
        ]
    }
}

// ── Generic sites ────────────────────────────────────────────────

/// A site carrying a bare scalar density, used where no local dynamics
/// apply (e.g. holding a sampled concentration field).
#[derive(Clone, Debug)]
pub struct GenericSite {
    index: SiteIndex,
    location: [f64; 3],
    density: f64,
    time: f64,
}

impl GenericSite {
    /// Create a generic site with the given initial density.
    pub fn new(index: SiteIndex, location: [f64; 3], density: f64) -> Self {
        Self {
            index,
            location,
            density,
            time: 0.0,
        }
    }

    /// Current density.
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Replace the density.
    pub fn set_density(&mut self, density: f64) {
        self.density = density;
    }
}

impl Site for GenericSite {
    fn index(&self) -> SiteIndex {
        self.index
    }

    fn location(&self) -> [f64; 3] {
        self.location
    }

    fn occupancy(&self) -> f64 {
        self.density
    }

    fn set_constants(&mut self, _params: &Params) -> Result<(), ConfigError> {
        Ok(())
    }

    fn update(&mut self, dt: f64, _ctx: &UpdateContext<'_>) {
        self.time += dt;
    }

    fn outputs(&self) -> Vec<(&'static str, f64)> {
        vec![(quantity::DENSITY, self.density)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::RungeKutta4;
    use stroma_core::ParamValue;

    fn cell_rates() -> CellRates {
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

    fn vessel_rates() -> VesselRates {
        VesselRates {
            r_max: 0.2,
            r_eq: 0.1,
            v_max: 1.0,
            v_eq: 0.5,
        }
    }

    fn ctx_integrator() -> RungeKutta4 {
        RungeKutta4::default()
    }

    // ── Vessel dynamics ──────────────────────────────────────────

    #[test]
    fn vessel_euler_step_exact_value() {
        // factor 0.6 ≥ 0.5, so α = 1:
        // V' = 0.1 + 1·(0.2·1·(1−0.1) − 0.1·(0.1−0.5)) = 0.1 + 0.2 = 0.3
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = VesselSite::new(SiteIndex(0), [0.0; 3], vessel_rates());
        site.set_density(0.1);
        site.set_factor(0.6);
        site.update(1.0, &ctx);
        assert!((site.density() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn vessel_below_factor_threshold_relaxes_to_equilibrium() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = VesselSite::new(SiteIndex(0), [0.0; 3], vessel_rates());
        site.set_density(0.1);
        site.set_factor(0.49);
        site.update(1.0, &ctx);
        // α = 0: V' = 0.1 + 1·(−0.1·(0.1−0.5)) = 0.14
        assert!((site.density() - 0.14).abs() < 1e-12);
    }

    #[test]
    fn vessel_factor_threshold_is_inclusive() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = VesselSite::new(SiteIndex(0), [0.0; 3], vessel_rates());
        site.set_density(0.1);
        site.set_factor(0.5);
        site.update(1.0, &ctx);
        assert!((site.density() - 0.3).abs() < 1e-12);
    }

    // ── Cell dynamics ────────────────────────────────────────────

    #[test]
    fn empty_cell_site_only_advances_clock() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.update(1.0, &ctx);
        assert_eq!(site.occupancy(), 0.0);
        assert_eq!(site.time(), 1.0);
    }

    #[test]
    fn cell_update_conserves_total_without_mitosis() {
        // km1 = 0 leaves only internal transfers; with oxygen above the
        // threshold the quiescent return path is active and no division
        // term feeds G1, so the total must stay constant.
        let rates = CellRates {
            km1: 0.0,
            ..cell_rates()
        };
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], rates);
        site.set_population([0.25, 0.25, 0.25, 0.25, 0.0]);
        site.set_oxygen(0.8);
        for _ in 0..50 {
            site.update(0.5, &ctx);
        }
        assert!((site.occupancy() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mitosis_grows_population_above_threshold() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.set_population([0.25, 0.25, 0.25, 0.25, 0.0]);
        site.set_oxygen(0.8);
        site.update(1.0, &ctx);
        assert!(site.occupancy() > 1.0);
    }

    #[test]
    fn hypoxia_routes_mitotic_cells_into_quiescence() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.set_population([0.0, 0.0, 0.0, 1.0, 0.0]);
        site.set_oxygen(0.1); // below threshold 0.4
        site.update(1.0, &ctx);
        assert!(site.population()[Phase::G0.index()] > 0.0);
    }

    #[test]
    fn oxygenated_site_keeps_quiescent_pool_draining() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.set_population([0.0, 0.0, 0.0, 0.0, 1.0]);
        site.set_oxygen(0.8);
        site.update(1.0, &ctx);
        assert!(site.population()[Phase::G0.index()] < 1.0);
        assert!(site.population()[Phase::G1.index()] > 0.0);
    }

    // ── Skim / receive mechanics ─────────────────────────────────

    #[test]
    fn skim_excess_returns_site_to_capacity() {
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.set_population([0.9, 0.3, 0.3, 0.0, 0.0]);
        let moved = site.skim_excess();
        assert!((site.occupancy() - site.capacity()).abs() < 1e-12);
        // Skim is proportional across phases.
        let total_moved: f64 = moved.iter().sum();
        assert!((total_moved - 0.5).abs() < 1e-12);
        assert!((moved[0] / 0.9 - moved[1] / 0.3).abs() < 1e-12);
    }

    #[test]
    fn receive_accumulates_and_refreshes_total() {
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.receive(&[0.1, 0.0, 0.0, 0.2, 0.0]);
        site.receive(&[0.1, 0.0, 0.0, 0.0, 0.0]);
        assert!((site.occupancy() - 0.4).abs() < 1e-12);
    }

    // ── Trait-level constants ────────────────────────────────────

    #[test]
    fn set_constants_reparses_rates() {
        let params = Params::from_pairs([
            ("k1s", ParamValue::Float(0.5)),
            ("ks2", ParamValue::Float(0.2)),
            ("k2m", ParamValue::Float(0.2)),
            ("km1", ParamValue::Float(0.2)),
            ("km0_base", ParamValue::Float(0.2)),
            ("k01_base", ParamValue::Float(0.06)),
            ("threshold_ox", ParamValue::Float(0.4)),
            ("max_cell_number", ParamValue::Float(2.0)),
        ]);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        site.set_constants(&params).unwrap();
        assert_eq!(site.rates().k1s, 0.5);
        assert_eq!(site.capacity(), 2.0);
    }

    #[test]
    fn missing_rate_constant_is_a_config_error() {
        let params = Params::from_pairs([("k1s", ParamValue::Float(0.5))]);
        let mut site = CellSite::new(SiteIndex(0), [0.0; 3], cell_rates());
        assert!(site.set_constants(&params).is_err());
    }

    // ── Generic sites ────────────────────────────────────────────

    #[test]
    fn generic_site_has_no_dynamics() {
        let integrator = ctx_integrator();
        let ctx = UpdateContext::new(&integrator);
        let mut site = GenericSite::new(SiteIndex(3), [1.0, 0.0, 0.0], 0.7);
        site.update(1.0, &ctx);
        assert_eq!(site.density(), 0.7);
        assert_eq!(site.outputs(), vec![(quantity::DENSITY, 0.7)]);
    }
}
