//! The adaptive setpoint coordinator.
//!
//! The coordinator owns the runtime state (the enabled flag and the last
//! published snapshot) and runs apply cycles:
//!
//! 1. read the sun elevation (missing signal becomes 0°)
//! 2. compute a snapshot from the configured bounds and targets
//! 3. if enabled, apply it to the powered-on fixtures and merge the outcome
//! 4. publish: replace the last snapshot and notify subscribers
//!
//! Cycles are serialised. A request made while a cycle is running waits for
//! it to finish and then runs with the enabled flag as it is at that point.
//! The flag itself only changes while the cycle lock is held.
//! `current_snapshot()` and `is_enabled()` never wait on a running cycle.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::config::Settings;
use crate::fixtures::{FixtureBackend, LightApplier};
use crate::geo::{ElevationSource, read_elevation};
use crate::logger::Log;
use crate::snapshot::{self, ApplyOutcome, Bounds, Snapshot};

pub struct Coordinator {
    name: String,
    bounds: Bounds,
    targets: Vec<String>,
    source: Box<dyn ElevationSource>,
    applier: LightApplier,
    enabled: AtomicBool,
    cycle: Mutex<()>,
    last_published: RwLock<Snapshot>,
    subscribers: Mutex<Vec<Sender<Snapshot>>>,
}

impl Coordinator {
    /// Build a coordinator from resolved settings.
    ///
    /// Nothing is applied here; the initial snapshot is computed and marked
    /// idle so status queries have something to report before the first cycle.
    pub fn new(
        settings: &Settings,
        source: Box<dyn ElevationSource>,
        backend: Arc<dyn FixtureBackend>,
    ) -> Self {
        let initial = snapshot::compute(
            read_elevation(source.as_ref()),
            &settings.bounds,
            &settings.targets,
            settings.enabled,
        );

        Self {
            name: settings.name.clone(),
            bounds: settings.bounds,
            targets: settings.targets.clone(),
            source,
            applier: LightApplier::new(backend, settings.transition_secs, settings.apply_timeout),
            enabled: AtomicBool::new(settings.enabled),
            cycle: Mutex::new(()),
            last_published: RwLock::new(initial),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Build with the elevation source and backend the settings select.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = crate::fixtures::create_backend(settings)?;
        Ok(Self::new(settings, crate::geo::create_source(settings), backend))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend_name(&self) -> &'static str {
        self.applier.backend_name()
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// The last published snapshot.
    pub fn current_snapshot(&self) -> Snapshot {
        self.last_published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register for every snapshot published from now on.
    pub fn subscribe(&self) -> Receiver<Snapshot> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Change the enabled flag and run one cycle.
    ///
    /// The flag is stored once this call holds the cycle lock, so the cycle
    /// it runs always sees `enabled`. Enabling applies the current snapshot
    /// immediately. Disabling publishes an idle snapshot and leaves the
    /// fixtures alone.
    pub fn set_enabled(&self, enabled: bool) -> Result<Snapshot> {
        self.run_cycle_with(|_| enabled)
    }

    /// Flip the enabled flag and run one cycle.
    pub fn toggle(&self) -> Result<Snapshot> {
        self.run_cycle_with(|current| !current)
    }

    /// Run one cycle now. Fixtures are only touched while enabled.
    pub fn apply_now(&self) -> Result<Snapshot> {
        self.run_cycle_with(|current| current)
    }

    /// Scheduled cycle; identical to [`apply_now`](Self::apply_now).
    pub fn tick(&self) -> Result<Snapshot> {
        self.run_cycle_with(|current| current)
    }

    /// Run one cycle, deciding the enabled flag under the cycle lock.
    ///
    /// Requests queued behind a running cycle see the flag as left by the
    /// cycles before them.
    fn run_cycle_with(&self, next_enabled: impl FnOnce(bool) -> bool) -> Result<Snapshot> {
        let _cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = self.is_enabled();
        let enabled = next_enabled(previous);
        if enabled != previous {
            self.enabled.store(enabled, Ordering::SeqCst);
            Log::log_block_start(&format!(
                "Adaptive lighting {}",
                if enabled { "enabled" } else { "disabled" }
            ));
        }

        let elevation = read_elevation(self.source.as_ref());
        let computed = snapshot::compute(elevation, &self.bounds, &self.targets, enabled);

        Log::log_debug(&format!(
            "Computed {} at {:.2}°: {}% / {}K",
            computed.mode, elevation, computed.brightness_pct, computed.color_temp_kelvin
        ));

        if !enabled {
            self.publish(computed.clone());
            return Ok(computed);
        }

        match self.applier.apply_snapshot(&computed) {
            Ok((outcome, adjusted)) => {
                let applied = computed.with_outcome(outcome, adjusted);
                self.publish(applied.clone());
                Ok(applied)
            }
            Err(e) => {
                self.publish(computed.with_outcome(ApplyOutcome::Failed, Vec::new()));
                Err(e.context("Failed to apply lighting setpoints"))
            }
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        {
            let mut last = self
                .last_published
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *last = snapshot.clone();
        }

        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
