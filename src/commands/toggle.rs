//! Implementation of the --toggle command.
//!
//! Sends SIGUSR2 to the running daemon, which flips adaptive lighting on or
//! off. The state it is switching from is read from the status file.

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::logger::Log;
use crate::status;

pub fn handle_toggle_command() -> Result<()> {
    Log::log_version();

    let previous = status::read_status(&status::status_file_path())
        .ok()
        .map(|record| record.enabled);

    let pid = crate::utils::signal_running_instance(Signal::SIGUSR2)?;
    Log::log_block_start(&format!("Sent toggle signal to sunlightr (PID: {})", pid));
    match previous {
        Some(true) => Log::log_indented("Adaptive lighting: enabled → disabled"),
        Some(false) => Log::log_indented("Adaptive lighting: disabled → enabled"),
        None => Log::log_indented("Previous state unknown"),
    }
    Log::log_end();
    Ok(())
}
