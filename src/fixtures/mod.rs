//! Fixture backends and the light applier.
//!
//! The [`FixtureBackend`] trait is the seam between the coordinator and the
//! lighting host. Two implementations ship with sunlightr:
//!
//! - **Command Backend**: runs the configured shell commands to query power
//!   state and to send one batched setpoint update
//! - **Dry-run Backend**: reports every fixture as on and only logs what
//!   would have been sent
//!
//! [`LightApplier`] sits on top of a backend and turns a snapshot into at most
//! one external call: it filters targets down to the fixtures that are on,
//! issues a single batched command bounded by the apply timeout, and reports
//! the outcome. A command that times out keeps running in the background; the
//! applier refuses to start another one until it has finished, so commands
//! never overlap.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::config::{Backend, Settings};
use crate::logger::Log;
use crate::snapshot::{ApplyOutcome, Snapshot};

pub mod command;
pub mod dry_run;

pub use command::CommandBackend;
pub use dry_run::DryRunBackend;

/// Power state reported for a single fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl PowerState {
    /// Interpret the textual state printed by a host tool.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => PowerState::On,
            "off" | "false" | "0" => PowerState::Off,
            _ => PowerState::Unknown,
        }
    }
}

/// One batched setpoint update for every powered-on fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureCommand {
    pub fixture_ids: Vec<String>,
    pub brightness_pct: u8,
    pub color_temp_kelvin: u32,
    pub transition_secs: f64,
}

/// Access to the lighting host.
#[cfg_attr(test, mockall::automock)]
pub trait FixtureBackend: Send + Sync {
    /// Current power state of one fixture.
    fn power_state(&self, fixture_id: &str) -> Result<PowerState>;

    /// Send one setpoint update covering every fixture in `command`.
    fn set_parameters(&self, command: &FixtureCommand) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Build the backend selected in the settings.
pub fn create_backend(settings: &Settings) -> Result<Arc<dyn FixtureBackend>> {
    match settings.backend {
        Backend::DryRun => Ok(Arc::new(DryRunBackend)),
        Backend::Command => {
            let power_command = settings
                .power_command
                .clone()
                .context("backend=\"command\" requires power_command")?;
            let apply_command = settings
                .apply_command
                .clone()
                .context("backend=\"command\" requires apply_command")?;
            Ok(Arc::new(CommandBackend::new(
                power_command,
                apply_command,
                settings.apply_timeout,
            )))
        }
    }
}

/// Clears the in-flight flag when the command thread finishes, even on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Applies snapshots to the powered-on subset of their target fixtures.
pub struct LightApplier {
    backend: Arc<dyn FixtureBackend>,
    transition_secs: f64,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
}

impl LightApplier {
    pub fn new(backend: Arc<dyn FixtureBackend>, transition_secs: f64, timeout: Duration) -> Self {
        Self {
            backend,
            transition_secs,
            timeout,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Whether a previously dispatched command is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Apply `snapshot` and report which fixtures were adjusted.
    ///
    /// No-op outcomes are `Ok`. A failed or timed-out command is an `Err`
    /// and is not retried.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> Result<(ApplyOutcome, Vec<String>)> {
        if snapshot.target_fixtures.is_empty() {
            Log::log_debug("No target fixtures configured, nothing to apply");
            return Ok((ApplyOutcome::SkippedNoTargets, Vec::new()));
        }

        let powered_on = self.powered_on(&snapshot.target_fixtures);
        if powered_on.is_empty() {
            Log::log_debug("All target fixtures are off or unavailable, nothing to apply");
            return Ok((ApplyOutcome::SkippedAllOff, Vec::new()));
        }

        let command = FixtureCommand {
            fixture_ids: powered_on.clone(),
            brightness_pct: snapshot.brightness_pct,
            color_temp_kelvin: snapshot.color_temp_kelvin,
            transition_secs: self.transition_secs,
        };

        Log::log_debug(&format!(
            "Applying {}% / {}K to {} via {}",
            command.brightness_pct,
            command.color_temp_kelvin,
            command.fixture_ids.join(", "),
            self.backend.backend_name()
        ));

        self.dispatch(command)?;
        Ok((ApplyOutcome::Applied, powered_on))
    }

    /// Targets that report `On`, in target order. Query errors count as unknown.
    fn powered_on(&self, targets: &[String]) -> Vec<String> {
        targets
            .iter()
            .filter(|id| match self.backend.power_state(id) {
                Ok(PowerState::On) => true,
                Ok(_) => false,
                Err(e) => {
                    Log::log_debug(&format!("Power state of {} unavailable: {}", id, e));
                    false
                }
            })
            .cloned()
            .collect()
    }

    fn dispatch(&self, command: FixtureCommand) -> Result<()> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            anyhow::bail!("The previous fixture command is still running");
        }

        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));

        thread::Builder::new()
            .name("fixture-command".to_string())
            .spawn(move || {
                let result = backend.set_parameters(&command);
                drop(guard);
                let _ = tx.send(result);
            })
            .context("Failed to start fixture command thread")?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result.context("Fixture command failed"),
            Err(RecvTimeoutError::Timeout) => anyhow::bail!(
                "Fixture command timed out after {} seconds",
                self.timeout.as_secs_f64()
            ),
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("Fixture command thread exited without a result")
            }
        }
    }
}
