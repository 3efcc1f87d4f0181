//! Implementation of the --apply command.
//!
//! Sends SIGUSR1 to the running daemon, which runs an apply cycle right away.

use anyhow::Result;
use nix::sys::signal::Signal;

use crate::logger::Log;

pub fn handle_apply_command() -> Result<()> {
    Log::log_version();

    let pid = crate::utils::signal_running_instance(Signal::SIGUSR1)?;
    Log::log_block_start(&format!("Sent apply signal to sunlightr (PID: {})", pid));
    Log::log_indented("Run `sunlightr --status` to see the result");
    Log::log_end();
    Ok(())
}
