//! Signal handling and inter-process control for sunlightr.
//!
//! A running daemon is controlled from other processes with signals:
//!
//! - `SIGUSR1`: run an apply cycle now
//! - `SIGUSR2`: toggle adaptive lighting on or off
//! - `SIGTERM`, `SIGINT`, `SIGHUP`: shut down
//!
//! A background thread turns signals into [`SignalMessage`]s which the main
//! loop handles one at a time.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{self, Receiver},
    thread,
};

use crate::coordinator::Coordinator;
use crate::logger::Log;

/// Control messages delivered to the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Run a cycle immediately (SIGUSR1)
    ApplyNow,
    /// Flip the enabled flag (SIGUSR2)
    Toggle,
    /// Stop the daemon (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
}

/// Signal handling state shared between threads
pub struct SignalState {
    /// Cleared once a shutdown signal arrives
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
}

/// Map a raw signal number onto the message it triggers.
pub fn message_for_signal(signal: i32) -> Option<SignalMessage> {
    match signal {
        SIGUSR1 => Some(SignalMessage::ApplyNow),
        SIGUSR2 => Some(SignalMessage::Toggle),
        SIGTERM | SIGINT | SIGHUP => Some(SignalMessage::Shutdown),
        _ => None,
    }
}

/// Act on one message from the signal thread.
pub fn handle_signal_message(
    message: SignalMessage,
    coordinator: &Coordinator,
    signal_state: &SignalState,
) {
    match message {
        SignalMessage::ApplyNow => {
            Log::log_block_start("Applying lighting now");
            if let Err(e) = coordinator.apply_now() {
                Log::log_warning(&format!("Manual update failed: {:#}", e));
            }
        }
        SignalMessage::Toggle => {
            if let Err(e) = coordinator.toggle() {
                Log::log_warning(&format!("Update after toggle failed: {:#}", e));
            }
        }
        SignalMessage::Shutdown => {
            signal_state.running.store(false, Ordering::SeqCst);
        }
    }
}

/// Register signal handlers and start the signal thread.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let running = Arc::new(AtomicBool::new(true));
    let (signal_sender, signal_receiver) = mpsc::channel::<SignalMessage>();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running_clone = Arc::clone(&running);

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                let Some(message) = message_for_signal(sig) else {
                    continue;
                };

                match message {
                    SignalMessage::ApplyNow => {
                        Log::log_pipe();
                        Log::log_decorated("Received apply-now signal");
                    }
                    SignalMessage::Toggle => {
                        Log::log_pipe();
                        Log::log_decorated("Received toggle signal");
                    }
                    SignalMessage::Shutdown => {
                        let user_message = match sig {
                            SIGINT if debug_enabled => {
                                "Received SIGINT (Ctrl+C), initiating graceful shutdown..."
                            }
                            SIGINT => "Received interrupt signal, initiating graceful shutdown...",
                            SIGTERM => "Received termination request, initiating graceful shutdown...",
                            _ => "Received hangup signal, initiating graceful shutdown...",
                        };
                        Log::log_pipe();
                        Log::log_decorated(user_message);

                        // Set first so the scheduler stops even if the main loop is gone
                        running_clone.store(false, Ordering::SeqCst);
                    }
                }

                if signal_sender.send(message).is_err() {
                    // Main loop has exited
                    break;
                }
            }
        })
        .context("failed to start signal thread")?;

    Ok(SignalState {
        running,
        signal_receiver,
    })
}
