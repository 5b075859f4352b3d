//! End-to-end coexecution: a vessel sub-model stepped by real
//! file-change notifications on a shared coupling file.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use stroma_core::{
    quantity, CouplingFrame, FrameError, FrameStore, NullSink, ParamValue, Params,
};
use stroma_couple::{CoexecConfig, CoexecOutcome, Coexecutor, FileWatcher};
use stroma_lattice::{Extents, Lattice, Neighbourhood};
use stroma_model::{Hypomodel, VesselModel, VesselRates};

/// Store stub: the on-disk format belongs to an external collaborator,
/// so the test reads only the file's first line as a factor level.
struct LineStore {
    lattice: Lattice,
}

impl FrameStore for LineStore {
    fn load(&mut self, path: &Path) -> Result<Vec<CouplingFrame>, FrameError> {
        let text = fs::read_to_string(path).map_err(|_| FrameError::MissingInput {
            path: path.to_path_buf(),
        })?;
        let factor: f64 = text
            .lines()
            .next()
            .and_then(|line| line.trim().parse().ok())
            .unwrap_or(0.0);
        let locations = self.lattice.locations();
        let values = vec![factor; locations.len()];
        Ok(vec![CouplingFrame::from_series(
            quantity::FACTOR,
            self.lattice.meta(),
            &locations,
            &values,
        )])
    }
}

/// Write the coupling file the way a well-behaved producer does:
/// into a sibling temp file, then rename over the watched path, so a
/// notification never observes a half-written file.
fn write_atomic(path: &Path, contents: &str) {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).unwrap();
    fs::rename(&tmp, path).unwrap();
}

fn vessel_model(lattice: Lattice) -> VesselModel {
    let rates = VesselRates {
        r_max: 0.2,
        r_eq: 0.1,
        v_max: 1.0,
        v_eq: 0.5,
    };
    let mut model = VesselModel::new("VesselSimulation", lattice, rates);
    model.set_uniform_density(0.1);
    model
}

#[test]
fn file_modifications_drive_steps_until_the_wait_budget_expires() {
    let dir = tempfile::tempdir().unwrap();
    let coupling = dir.path().join("coupling.fld");

    let watcher = FileWatcher::watch(&coupling).unwrap();
    let lattice = Lattice::new(Extents::new(2, 2, 1), 1.0, Neighbourhood::Face).unwrap();

    let config = CoexecConfig {
        watch_path: coupling.clone(),
        wait_budget: Duration::from_secs(2),
        dt: 1.0,
        output_frequency: 1,
    };
    let mut coexec = Coexecutor::new(
        vessel_model(lattice.clone()),
        Box::new(LineStore { lattice }),
        Box::new(NullSink),
        watcher.events(),
        config,
    );

    // Writer process stand-in: produce the coupling file, then update
    // it once. Write-then-rename keeps the watched path fully written
    // whenever a notification lands; the gap keeps the two versions on
    // distinct mtimes.
    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        write_atomic(&coupling, "0.6\n");
        thread::sleep(Duration::from_millis(300));
        write_atomic(&coupling, "0.6\n");
    });

    let outcome = coexec.run().unwrap();
    writer.join().unwrap();

    let steps = match outcome {
        CoexecOutcome::TimedOut { steps } => steps,
        CoexecOutcome::Closed { steps } => steps,
    };
    assert!(steps >= 1, "no file notification was ever delivered");
    assert_eq!(coexec.steps(), steps);

    // The absorbed factor 0.6 switched stimulation on: density moved
    // up from 0.1.
    assert!(coexec.model().densities().iter().all(|&v| v > 0.1));
}

#[test]
fn coexecution_and_central_stepping_share_site_logic() {
    // One watched step with factor 0.6 must land on exactly the value
    // a directly driven model produces.
    let lattice = Lattice::new(Extents::new(2, 2, 1), 1.0, Neighbourhood::Face).unwrap();

    let mut direct = vessel_model(lattice.clone());
    direct.set_factor(&vec![0.6; 4]).unwrap();
    direct.step(1.0).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let coupling = dir.path().join("coupling.fld");
    let watcher = FileWatcher::watch(&coupling).unwrap();
    let mut coexec = Coexecutor::new(
        vessel_model(lattice.clone()),
        Box::new(LineStore {
            lattice: lattice.clone(),
        }),
        Box::new(NullSink),
        watcher.events(),
        CoexecConfig {
            watch_path: coupling.clone(),
            wait_budget: Duration::from_secs(2),
            dt: 1.0,
            output_frequency: 1,
        },
    );

    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        write_atomic(&coupling, "0.6\n");
    });

    let outcome = coexec.run().unwrap();
    let steps = match outcome {
        CoexecOutcome::TimedOut { steps } | CoexecOutcome::Closed { steps } => steps,
    };
    assert!(steps >= 1);

    // The first coexecuted step matches the direct step exactly.
    // Later duplicate-coalesced steps can only move the value further
    // along the same trajectory, so compare against a fresh model
    // stepped the same number of times.
    let mut reference = vessel_model(lattice);
    for _ in 0..steps {
        reference.set_factor(&vec![0.6; 4]).unwrap();
        reference.step(1.0).unwrap();
    }
    for (got, want) in coexec.model().densities().iter().zip(reference.densities()) {
        assert!((got - want).abs() < 1e-12);
    }
    assert!((direct.densities()[0] - 0.3).abs() < 1e-12);
}

#[test]
fn standalone_params_disable_coexecution() {
    let params = Params::from_pairs([
        ("num_steps", ParamValue::Int(10)),
        ("time_increment", ParamValue::Float(1.0)),
    ]);
    assert!(CoexecConfig::from_params(&params).unwrap().is_none());
}
