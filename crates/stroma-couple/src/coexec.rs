//! Asynchronous coexecution: file-notification-driven stepping.
//!
//! In coexecution mode a sub-model process does not own the clock.
//! It watches a shared coupling file; every modification of that file
//! is one "your inputs are ready" message, answered by loading the
//! frames, absorbing them, stepping once, and writing the output
//! bundle for the next process in the chain. Between messages the
//! process sleeps, bounded by a wall-clock wait budget.
//!
//! The filesystem event is modelled as a plain channel message
//! ([`CoexecEvent`]), so the driving loop is testable with an injected
//! sender and no real filesystem timing. [`FileWatcher`] is the
//! production event source, adapting `notify` callbacks onto the same
//! channel.

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};
use stroma_core::{ConfigError, FrameSink, FrameStore, Params};
use stroma_model::{Hypomodel, ModelError};

/// One file-change message: the coupling file was (re)written.
///
/// `revision` identifies the observed file version (the production
/// watcher uses the modification timestamp). Two events with the same
/// revision describe the same write; the consumer applies at most one
/// step per revision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoexecEvent {
    /// The coupling file that changed.
    pub path: PathBuf,
    /// Version stamp of the observed write.
    pub revision: u64,
}

/// Why a coexecution loop stopped. Neither variant is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoexecOutcome {
    /// No new input arrived within the wait budget; clean shutdown.
    TimedOut {
        /// Steps applied before the budget expired.
        steps: u64,
    },
    /// Every event sender disconnected; clean shutdown.
    Closed {
        /// Steps applied before the channel closed.
        steps: u64,
    },
}

/// Configuration for one coexecuting sub-model.
#[derive(Clone, Debug, PartialEq)]
pub struct CoexecConfig {
    /// The coupling file to watch.
    pub watch_path: PathBuf,
    /// How long to wait for new input before giving up.
    pub wait_budget: Duration,
    /// Timestep applied per received event.
    pub dt: f64,
    /// Steps between output bundles.
    pub output_frequency: u64,
}

impl CoexecConfig {
    /// Extract the coexecution configuration from a parameter mapping.
    ///
    /// Returns `Ok(None)` when `coexecution_file` is absent — the run
    /// is standalone and no watcher should be started.
    pub fn from_params(params: &Params) -> Result<Option<Self>, ConfigError> {
        let Some(path) = params.get_str("coexecution_file")? else {
            return Ok(None);
        };
        let wait = params.require_f64("coexecution_wait")?;
        if !wait.is_finite() || wait < 0.0 {
            return Err(ConfigError::Invalid {
                key: "coexecution_wait".into(),
                reason: format!("must be a non-negative number of seconds, got {wait}"),
            });
        }
        let output_frequency = params.require_u64("output_frequency")?;
        if output_frequency == 0 {
            return Err(ConfigError::Invalid {
                key: "output_frequency".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Some(Self {
            watch_path: PathBuf::from(path),
            wait_budget: Duration::from_secs_f64(wait),
            dt: params.require_f64("time_increment")?,
            output_frequency,
        }))
    }
}

/// Drives one hypomodel from a stream of file-change events.
pub struct Coexecutor<M: Hypomodel> {
    model: M,
    store: Box<dyn FrameStore>,
    sink: Box<dyn FrameSink>,
    events: Receiver<CoexecEvent>,
    config: CoexecConfig,
    last_revision: Option<u64>,
    steps: u64,
}

impl<M: Hypomodel> Coexecutor<M> {
    /// Assemble a coexecutor around a model, its frame collaborators,
    /// and an event source.
    pub fn new(
        model: M,
        store: Box<dyn FrameStore>,
        sink: Box<dyn FrameSink>,
        events: Receiver<CoexecEvent>,
        config: CoexecConfig,
    ) -> Self {
        Self {
            model,
            store,
            sink,
            events,
            config,
            last_revision: None,
            steps: 0,
        }
    }

    /// The driven model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Steps applied so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// React to events until the wait budget expires or the channel
    /// closes.
    ///
    /// A duplicate notification (same revision as the last applied one)
    /// is skipped without touching the model, so double delivery of one
    /// write never double-applies a step. A missing or unreadable
    /// coupling file is fatal — the upstream output this process was
    /// promised never arrived.
    pub fn run(&mut self) -> Result<CoexecOutcome, ModelError> {
        loop {
            match self.events.recv_timeout(self.config.wait_budget) {
                Ok(event) => self.handle(event)?,
                Err(RecvTimeoutError::Timeout) => {
                    log::info!(
                        "{}: no input for {:?}, shutting down after {} steps",
                        self.model.name(),
                        self.config.wait_budget,
                        self.steps,
                    );
                    return Ok(CoexecOutcome::TimedOut { steps: self.steps });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Ok(CoexecOutcome::Closed { steps: self.steps });
                }
            }
        }
    }

    fn handle(&mut self, event: CoexecEvent) -> Result<(), ModelError> {
        if self.last_revision == Some(event.revision) {
            log::debug!(
                "{}: duplicate notification for revision {}, skipping",
                self.model.name(),
                event.revision,
            );
            return Ok(());
        }

        let frames = self.store.load(&event.path).map_err(ModelError::Frame)?;
        self.model.absorb(&frames)?;
        self.model.step(self.config.dt)?;

        if self.steps % self.config.output_frequency == 0 {
            let label = format!("{}{}", self.model.name(), self.steps + 1);
            self.sink
                .write(&label, &self.model.outputs())
                .map_err(ModelError::Frame)?;
        }
        self.steps += 1;
        self.last_revision = Some(event.revision);
        Ok(())
    }
}

/// Production event source: forwards `notify` modification events for
/// one file into a [`CoexecEvent`] channel.
///
/// The file's parent directory is watched non-recursively and events
/// are filtered to the target file name, so the watcher keeps working
/// when writers replace the file instead of rewriting it in place.
/// Revisions are modification timestamps; writes landing within the
/// filesystem's timestamp granularity coalesce into one step, which is
/// the duplicate-delivery contract, not a loss.
pub struct FileWatcher {
    // Dropping the watcher stops the background notification thread.
    _watcher: RecommendedWatcher,
    events: Receiver<CoexecEvent>,
}

impl FileWatcher {
    /// Start watching the coupling file.
    pub fn watch(path: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let file_name: Option<OsString> = path.file_name().map(OsString::from);

        let mut watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        log::warn!("file watch error: {e}");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                for changed in event.paths {
                    if changed.file_name().map(OsString::from) != file_name {
                        continue;
                    }
                    let revision = match std::fs::metadata(&changed).and_then(|m| m.modified()) {
                        Ok(mtime) => mtime
                            .duration_since(UNIX_EPOCH)
                            .map(|d| d.as_nanos() as u64)
                            .unwrap_or(0),
                        Err(e) => {
                            log::debug!("stat failed for {}: {e}", changed.display());
                            continue;
                        }
                    };
                    let _ = tx.send(CoexecEvent {
                        path: changed.clone(),
                        revision,
                    });
                }
            })?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            events: rx,
        })
    }

    /// The event channel to hand to a [`Coexecutor`].
    pub fn events(&self) -> Receiver<CoexecEvent> {
        self.events.clone()
    }
}
