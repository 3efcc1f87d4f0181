//! Status view: mirrors published snapshots to the log and a JSON file.
//!
//! The daemon subscribes a [`StatusView`] to the coordinator. Every
//! published snapshot is rendered to the log and written to
//! `$XDG_RUNTIME_DIR/sunlightr.status.json`, which `sunlightr --status`
//! reads back. The file also mirrors the enabled flag so toggle front-ends
//! can show the current state without talking to the daemon.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use crate::constants::STATUS_FILE_NAME;
use crate::geo::solar;
use crate::logger::Log;
use crate::snapshot::Snapshot;

/// Everything `--status` shows, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub name: String,
    pub pid: u32,
    pub enabled: bool,
    pub backend: String,
    pub elevation_source: String,
    pub sunrise: Option<DateTime<Local>>,
    pub sunset: Option<DateTime<Local>>,
    pub snapshot: Snapshot,
}

/// Fixed facts about the daemon that accompany each snapshot.
#[derive(Debug, Clone)]
pub struct StatusContext {
    pub name: String,
    pub backend: String,
    pub elevation_source: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl StatusContext {
    pub fn record_for(&self, snapshot: &Snapshot) -> StatusRecord {
        let times = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => solar::sun_times(lat, lon, snapshot.computed_at.date_naive()).ok(),
            _ => None,
        };

        StatusRecord {
            name: self.name.clone(),
            pid: std::process::id(),
            enabled: snapshot.enabled_at_snapshot,
            backend: self.backend.clone(),
            elevation_source: self.elevation_source.clone(),
            sunrise: times.map(|t| t.sunrise),
            sunset: times.map(|t| t.sunset),
            snapshot: snapshot.clone(),
        }
    }
}

pub fn status_file_path() -> PathBuf {
    crate::utils::runtime_dir().join(STATUS_FILE_NAME)
}

/// Write the record through a temporary file so readers never see half of it.
pub fn write_status(path: &Path, record: &StatusRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("Failed to serialize status")?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move status file into {}", path.display()))?;
    Ok(())
}

pub fn read_status(path: &Path) -> Result<StatusRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).context("Status file is not valid")
}

/// Log a one-block summary of a published snapshot.
pub fn log_snapshot(snapshot: &Snapshot) {
    Log::log_block_start(&format!(
        "{} {} · {}% · {}K",
        mode_icon(snapshot),
        snapshot.mode,
        snapshot.brightness_pct,
        snapshot.color_temp_kelvin
    ));
    Log::log_indented(&format!("Sun elevation: {:.2}°", snapshot.sun_elevation));
    Log::log_indented(&format!("Outcome: {}", snapshot.apply_outcome));
    if !snapshot.adjusted_fixtures.is_empty() {
        Log::log_indented(&format!("Adjusted: {}", snapshot.adjusted_fixtures.join(", ")));
    }
}

/// Print a status record for `--status`.
pub fn render_status(record: &StatusRecord) {
    let snapshot = &record.snapshot;
    Log::log_block_start(&format!("{} (PID: {})", record.name, record.pid));
    Log::log_indented(&format!(
        "Adaptive lighting: {}",
        if record.enabled { "enabled" } else { "disabled" }
    ));
    Log::log_indented(&format!("Mode: {}", snapshot.mode));
    Log::log_indented(&format!("Brightness: {}%", snapshot.brightness_pct));
    Log::log_indented(&format!("Color temperature: {}K", snapshot.color_temp_kelvin));
    Log::log_indented(&format!("Sun elevation: {:.2}°", snapshot.sun_elevation));
    Log::log_indented(&format!("Elevation source: {}", record.elevation_source));
    Log::log_indented(&format!("Backend: {}", record.backend));
    Log::log_indented(&format!("Last outcome: {}", snapshot.apply_outcome));
    Log::log_indented(&format!(
        "Targets: {}",
        join_or_none(&snapshot.target_fixtures)
    ));
    Log::log_indented(&format!(
        "Adjusted: {}",
        join_or_none(&snapshot.adjusted_fixtures)
    ));
    if let (Some(sunrise), Some(sunset)) = (record.sunrise, record.sunset) {
        Log::log_indented(&format!(
            "Sunrise {} · Sunset {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M")
        ));
    }
    Log::log_indented(&format!(
        "Updated: {}",
        snapshot.computed_at.format("%Y-%m-%d %H:%M:%S")
    ));
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn mode_icon(snapshot: &Snapshot) -> &'static str {
    use crate::snapshot::Mode;
    match snapshot.mode {
        Mode::Day => "☀",
        Mode::Transition => "◐",
        Mode::Night => "☾",
    }
}

/// Subscriber thread that keeps the log and status file in step with the coordinator.
pub struct StatusView {
    handle: JoinHandle<()>,
}

impl StatusView {
    /// Consume `updates` until the coordinator is dropped.
    pub fn spawn(updates: Receiver<Snapshot>, context: StatusContext, path: PathBuf) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("status-view".to_string())
            .spawn(move || {
                for snapshot in updates {
                    log_snapshot(&snapshot);
                    let record = context.record_for(&snapshot);
                    if let Err(e) = write_status(&path, &record) {
                        Log::log_warning(&format!("Could not update status file: {:#}", e));
                    }
                }
            })
            .context("Failed to start status view thread")?;

        Ok(Self { handle })
    }

    pub fn join(self) {
        if self.handle.join().is_err() {
            Log::log_error("Status view thread panicked");
        }
    }
}

/// Remove the status file on shutdown.
pub fn remove_status_file(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            Log::log_warning(&format!("Failed to remove status file: {}", e));
        }
    }
}
