//! Utility functions shared across the codebase.
//!
//! Runtime paths, the single-instance lock file, and discovery of a running
//! daemon for the control commands.

use anyhow::{Context, Result};
use fs2::FileExt;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::constants::LOCK_FILE_NAME;

/// `$XDG_RUNTIME_DIR`, falling back to `/tmp`.
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir().unwrap_or_else(|| PathBuf::from("/tmp"))
}

pub fn lock_file_path() -> PathBuf {
    runtime_dir().join(LOCK_FILE_NAME)
}

/// Show a path with the home directory abbreviated to `~`.
pub fn path_for_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}

/// An exclusive lock on the instance lock file, released on drop.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Lock `path` and record our PID in it.
    ///
    /// Returns `Ok(None)` when another process holds the lock. The file is
    /// opened without truncation so a competing instance never wipes the
    /// holder's PID before finding out the lock is taken.
    pub fn acquire(path: &Path) -> Result<Option<Self>> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Ok(None);
        }

        file.set_len(0).context("Failed to reset lock file")?;
        file.seek(SeekFrom::Start(0))
            .context("Failed to reset lock file")?;
        writeln!(file, "{}", std::process::id()).context("Failed to write lock file")?;
        file.flush().context("Failed to write lock file")?;

        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unlock and delete the lock file.
    pub fn release(self) -> Result<()> {
        let _ = FileExt::unlock(&self.file);
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove lock file {}", self.path.display()))
    }
}

/// PID recorded in a lock file, if it parses.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Check with signal 0. `EPERM` still means the process exists.
pub fn is_process_running(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
}

/// PID of the daemon holding the lock at `path`.
///
/// A lock file whose process is gone is stale and yields an error.
pub fn get_running_pid(path: &Path) -> Result<u32> {
    if !path.exists() {
        anyhow::bail!("sunlightr is not running (no lock file at {})", path.display());
    }
    let pid = read_lock_pid(path)
        .with_context(|| format!("Lock file {} does not contain a PID", path.display()))?;
    if pid == std::process::id() || !is_process_running(pid) {
        anyhow::bail!("sunlightr is not running (stale lock file for PID {})", pid);
    }
    Ok(pid)
}

/// Deliver `signal` to the running daemon and return its PID.
pub fn signal_running_instance(signal: Signal) -> Result<u32> {
    let pid = get_running_pid(&lock_file_path())?;
    let raw = i32::try_from(pid).context("PID out of range")?;
    kill(Pid::from_raw(raw), signal)
        .with_context(|| format!("Failed to send {} to PID {}", signal, pid))?;
    Ok(pid)
}
