//! Implementation of the --status command.

use anyhow::{Context, Result};

use crate::logger::Log;
use crate::status;

/// Show the last snapshot published by the running daemon.
pub fn handle_status_command() -> Result<()> {
    Log::log_version();

    let pid = crate::utils::get_running_pid(&crate::utils::lock_file_path())?;
    let path = status::status_file_path();
    let record = status::read_status(&path).with_context(|| {
        format!(
            "sunlightr (PID: {}) has not published a status yet",
            pid
        )
    })?;

    status::render_status(&record);
    Log::log_end();
    Ok(())
}
