//! Implementation of the --once command.
//!
//! Loads the configuration, runs a single apply cycle in the foreground and
//! exits. Useful from cron jobs or host automations that prefer to drive the
//! schedule themselves. The enabled flag from the configuration is honoured,
//! so a disabled configuration only reports the computed setpoints.

use anyhow::Result;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::logger::Log;
use crate::status;

pub fn handle_once_command() -> Result<()> {
    Log::log_version();

    let config_path = Config::get_config_path()?;
    let settings = Config::load()?;
    settings.log_config(&config_path);

    let coordinator = Coordinator::from_settings(&settings)?;
    Log::log_indented(&format!("Elevation source: {}", coordinator.source_description()));

    let result = coordinator.apply_now();
    status::log_snapshot(&coordinator.current_snapshot());
    Log::log_end();

    result.map(|_| ())
}
