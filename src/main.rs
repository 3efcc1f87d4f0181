use anyhow::Result;
use std::{
    path::Path,
    sync::Arc,
    sync::atomic::Ordering,
    sync::mpsc::RecvTimeoutError,
    time::Duration,
};

use sunlightr::{
    args::{CliAction, ParsedArgs, display_help, display_version_info},
    commands,
    config::Config,
    constants::*,
    coordinator::Coordinator,
    logger::Log,
    scheduler::Scheduler,
    signals::{SignalState, handle_signal_message, setup_signal_handler},
    status::{self, StatusContext, StatusView},
    utils::{self, InstanceLock},
};

const CHECK_INTERVAL: Duration = Duration::from_secs(CHECK_INTERVAL_SECS);

fn main() {
    let parsed = ParsedArgs::from_env();

    let result = match parsed.action {
        CliAction::ShowVersion => {
            display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run { debug_enabled } => run_daemon(debug_enabled),
        CliAction::RunOnce { debug_enabled } => {
            Log::set_debug(debug_enabled);
            commands::once::handle_once_command()
        }
        CliAction::ApplyNow => commands::apply::handle_apply_command(),
        CliAction::Toggle => commands::toggle::handle_toggle_command(),
        CliAction::Status => commands::status::handle_status_command(),
    };

    if let Err(e) = result {
        Log::log_pipe();
        Log::log_critical(&format!("{:#}", e));
        std::process::exit(EXIT_FAILURE);
    }
}

/// Run the daemon until a shutdown signal arrives.
fn run_daemon(debug_enabled: bool) -> Result<()> {
    Log::set_debug(debug_enabled);
    Log::log_version();

    let lock_path = utils::lock_file_path();
    let Some(lock) = InstanceLock::acquire(&lock_path)? else {
        let holder = utils::read_lock_pid(&lock_path)
            .map(|pid| format!(" (PID: {})", pid))
            .unwrap_or_default();
        anyhow::bail!(
            "Another instance of sunlightr is already running{}.\n\
            • Use --apply, --toggle or --status to control it.",
            holder
        );
    };
    Log::log_decorated("Lock acquired, starting sunlightr...");

    let status_path = status::status_file_path();
    let result = setup_signal_handler(debug_enabled)
        .and_then(|signal_state| run_until_shutdown(&signal_state, &status_path));

    Log::log_block_start("Shutting down sunlightr...");
    cleanup(lock, &status_path);
    Log::log_end();

    result
}

fn run_until_shutdown(signal_state: &SignalState, status_path: &Path) -> Result<()> {
    let config_path = Config::get_config_path()?;
    let settings = Config::load()?;
    settings.log_config(&config_path);

    let coordinator = Arc::new(Coordinator::from_settings(&settings)?);
    Log::log_indented(&format!("Elevation source: {}", coordinator.source_description()));

    let status_view = StatusView::spawn(
        coordinator.subscribe(),
        StatusContext {
            name: coordinator.name().to_string(),
            backend: coordinator.backend_name().to_string(),
            elevation_source: coordinator.source_description(),
            latitude: settings.latitude,
            longitude: settings.longitude,
        },
        status_path.to_path_buf(),
    )?;

    // Initial cycle so the fixtures match the sun right away
    if let Err(e) = coordinator.apply_now() {
        Log::log_warning(&format!("Initial update failed: {:#}", e));
        Log::log_decorated("Will retry on the next scheduled update...");
    }

    let scheduler = Scheduler::spawn(
        Arc::clone(&coordinator),
        settings.update_interval,
        Arc::clone(&signal_state.running),
    )?;

    while signal_state.running.load(Ordering::SeqCst) {
        match signal_state.signal_receiver.recv_timeout(CHECK_INTERVAL) {
            Ok(message) => handle_signal_message(message, &coordinator, signal_state),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                Log::log_warning("Signal handler stopped unexpectedly");
                signal_state.running.store(false, Ordering::SeqCst);
            }
        }
    }

    scheduler.join();

    // Dropping the last coordinator handle closes the status view's channel
    drop(coordinator);
    status_view.join();

    Ok(())
}

/// Release the lock file and remove the status file.
fn cleanup(lock: InstanceLock, status_path: &Path) {
    Log::log_decorated("Performing cleanup...");

    status::remove_status_file(status_path);

    if let Err(e) = lock.release() {
        Log::log_warning(&format!("Failed to remove lock file: {}", e));
    } else {
        Log::log_decorated("Lock file removed successfully");
    }

    Log::log_decorated("Cleanup complete");
}
