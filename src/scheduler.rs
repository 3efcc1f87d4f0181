//! Fixed-interval timer that drives scheduled apply cycles.
//!
//! The scheduler thread sleeps in short chunks so a shutdown request is
//! noticed within [`CHECK_INTERVAL_SECS`]. Cycle errors are logged and the
//! timer keeps going; only the shutdown flag stops it.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::CHECK_INTERVAL_SECS;
use crate::coordinator::Coordinator;
use crate::logger::Log;

pub struct Scheduler {
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Start ticking `coordinator` every `interval` until `running` is cleared.
    ///
    /// The first tick happens one interval after start.
    pub fn spawn(
        coordinator: Arc<Coordinator>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || {
                while sleep_while_running(interval, &running) {
                    if let Err(e) = coordinator.tick() {
                        Log::log_warning(&format!("Scheduled update failed: {:#}", e));
                    }
                }
                Log::log_debug("Scheduler stopped");
            })
            .context("Failed to start scheduler thread")?;

        Ok(Self { handle })
    }

    /// Wait for the thread to notice shutdown and exit.
    pub fn join(self) {
        if self.handle.join().is_err() {
            Log::log_error("Scheduler thread panicked");
        }
    }
}

/// Sleep for `duration`, waking early if `running` is cleared.
///
/// Returns whether the application is still running.
pub fn sleep_while_running(duration: Duration, running: &AtomicBool) -> bool {
    let chunk = duration.min(Duration::from_secs(CHECK_INTERVAL_SECS));
    let deadline = Instant::now() + duration;

    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(chunk.min(deadline - now));
    }
}
