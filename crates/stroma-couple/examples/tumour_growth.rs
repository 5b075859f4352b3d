//! Stroma quickstart — a complete, minimal coupled simulation.
//!
//! Demonstrates:
//!   1. Building a 10×10×10 lattice
//!   2. Seeding a spherical tumour in the cell sub-model
//!   3. Wiring cell, vessel, and diffusible sub-models into a Hypermodel
//!   4. Supplying a stand-in field solver behind the FieldSolver seam
//!   5. Running coupled iterations and reading the grid state back
//!
//! Run with:
//!   cargo run --example tumour_growth

use stroma_core::{
    FieldSolver, NullSink, PointSource, Sample, SolveError, Species,
};
use stroma_couple::{CouplingConfig, DiffusibleModel, DiffusibleRates, Hypermodel};
use stroma_lattice::{Extents, Lattice, Neighbourhood};
use stroma_model::{CellModel, CellRates, DriverConfig, Hypomodel, VesselModel, VesselRates};

// ─── Grid parameters ────────────────────────────────────────────

const N: u32 = 10;
const SPACING: f64 = 1.0;
const NUM_STEPS: u64 = 20;

// ─── Stand-in field solver ──────────────────────────────────────
//
// A kernel-smoothing surrogate for the external finite-element
// solver: each source contributes a Gaussian bump, on top of the
// species' far-field boundary value. Good enough to close the
// coupling loop for a demonstration.

struct KernelSolver {
    sigma: f64,
}

impl KernelSolver {
    fn boundary(species: Species) -> f64 {
        match species {
            Species::Oxygen => 1.0,
            Species::GrowthFactor => 0.0,
        }
    }
}

impl FieldSolver for KernelSolver {
    fn solve(
        &mut self,
        species: Species,
        sources: &[PointSource],
        sample_at: &[[f64; 3]],
    ) -> Result<Vec<Sample>, SolveError> {
        let two_sigma_sq = 2.0 * self.sigma * self.sigma;
        let samples = sample_at
            .iter()
            .map(|p| {
                let mut value = Self::boundary(species);
                for source in sources {
                    let d_sq = (p[0] - source.location[0]).powi(2)
                        + (p[1] - source.location[1]).powi(2)
                        + (p[2] - source.location[2]).powi(2);
                    value += source.strength * (-d_sq / two_sigma_sq).exp();
                }
                Sample::Value(value.max(0.0))
            })
            .collect();
        Ok(samples)
    }
}

// ─── Main ───────────────────────────────────────────────────────

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Stroma tumour growth ===\n");

    let lattice = || Lattice::new(Extents::new(N, N, N), SPACING, Neighbourhood::Face);

    // 1. Cell sub-model: a spherical tumour seed low on the z axis.
    let cell_rates = CellRates {
        k1s: 0.2,
        ks2: 0.2,
        k2m: 0.2,
        km1: 0.2,
        km0_base: 0.2,
        k01_base: 0.06,
        threshold_ox: 0.4,
        max_cell_number: 1.0,
    };
    let mut cells = CellModel::new("CellSimulation", lattice()?, cell_rates);
    let centre = [
        f64::from(N) * SPACING / 2.0,
        f64::from(N) * SPACING / 2.0,
        f64::from(N) * SPACING / 6.0,
    ];
    cells.seed_sphere(centre, 3.0, [0.25, 0.25, 0.25, 0.25, 0.0]);
    cells.set_uniform_oxygen(0.8);
    println!(
        "Seeded sphere of radius 3 at ({:.1}, {:.1}, {:.1}): {:.1} cells",
        centre[0],
        centre[1],
        centre[2],
        cells.total_population(),
    );

    // 2. Vessel sub-model: uniform background vasculature.
    let vessel_rates = VesselRates {
        r_max: 0.2,
        r_eq: 0.1,
        v_max: 1.0,
        v_eq: 0.5,
    };
    let mut vessels = VesselModel::new("VesselSimulation", lattice()?, vessel_rates);
    vessels.set_uniform_density(0.1);

    // 3. Diffusible sub-model around the stand-in solver.
    let diffusible_rates = DiffusibleRates {
        permeability: 0.1,
        consumption_rate: 0.3,
        factor_sensitivity: 0.1,
    };
    let diffusible = DiffusibleModel::new(
        "ChemicalSimulation",
        lattice()?,
        Box::new(KernelSolver { sigma: 3.0 }),
        diffusible_rates,
    );

    // 4. The hypermodel.
    let config = CouplingConfig {
        dt: 1.0,
        num_steps: NUM_STEPS,
        output_frequency: 5,
    };
    let mut hypermodel = Hypermodel::new(cells, vessels, diffusible, config)?;

    // 5. Run, reporting every few iterations.
    println!("\nRunning {NUM_STEPS} coupled iterations...");
    for idx in 0..NUM_STEPS {
        hypermodel.step()?;
        if (idx + 1) % 5 == 0 {
            let population = hypermodel.cell().total_population();
            let occupied = hypermodel
                .cell()
                .occupancies()
                .iter()
                .filter(|&&n| n > 0.0)
                .count();
            let mean_vessel: f64 = hypermodel.vessel().densities().iter().sum::<f64>()
                / f64::from(N * N * N);
            println!(
                "  step {:>3}: population={:>9.3}, occupied_sites={:>5}, mean_vessel={:.4}",
                idx + 1,
                population,
                occupied,
                mean_vessel,
            );
        }
    }

    // 6. A standalone sub-model run with the same mechanics.
    let standalone_config = DriverConfig {
        name: "Standalone".into(),
        num_steps: 10,
        time_increment: 1.0,
        output_frequency: 5,
    };
    let mut standalone = CellModel::new("Standalone", lattice()?, cell_rates);
    standalone.seed_sphere(centre, 3.0, [0.25, 0.25, 0.25, 0.25, 0.0]);
    standalone.set_uniform_oxygen(0.8);
    standalone.run_configured(&standalone_config, &mut NullSink)?;
    println!(
        "\nStandalone cell run, 10 steps: {:.3} cells",
        standalone.total_population(),
    );

    println!("Done.");
    Ok(())
}
