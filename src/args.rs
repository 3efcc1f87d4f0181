//! Command-line argument parsing and processing.
//!
//! This module handles parsing of command-line arguments and provides a clean
//! interface for the main application logic. Besides running the daemon it
//! supports one-shot runs and the control commands that talk to a running
//! daemon (`--apply`, `--toggle`, `--status`).

use crate::logger::Log;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon
    Run { debug_enabled: bool },
    /// Run a single apply cycle in the foreground and exit
    RunOnce { debug_enabled: bool },
    /// Ask the running daemon to apply now
    ApplyNow,
    /// Ask the running daemon to toggle adaptive lighting
    Toggle,
    /// Show the running daemon's last published snapshot
    Status,
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut run_once = false;
        let mut apply_now = false;
        let mut toggle = false;
        let mut status = false;
        let mut unknown_arg_found = false;

        for arg in args.into_iter().skip(1) {
            let arg_str = arg.as_ref();
            match arg_str {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--once" | "-o" => run_once = true,
                "--apply" | "-a" => apply_now = true,
                "--toggle" | "-t" => toggle = true,
                "--status" | "-s" => status = true,
                _ => {
                    // Non-option arguments are currently ignored
                    if arg_str.starts_with('-') {
                        Log::log_warning(&format!("Unknown option: {}", arg_str));
                        unknown_arg_found = true;
                    }
                }
            }
        }

        let control_count = [run_once, apply_now, toggle, status]
            .iter()
            .filter(|&&flag| flag)
            .count();
        if control_count > 1 {
            Log::log_warning("--once, --apply, --toggle and --status cannot be combined");
            unknown_arg_found = true;
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else if display_help {
            CliAction::ShowHelp
        } else if run_once {
            CliAction::RunOnce { debug_enabled }
        } else if apply_now {
            CliAction::ApplyNow
        } else if toggle {
            CliAction::Toggle
        } else if status {
            CliAction::Status
        } else {
            CliAction::Run { debug_enabled }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    Log::log_version();
    Log::log_pipe();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    Log::log_version();
    Log::log_block_start(env!("CARGO_PKG_DESCRIPTION"));
    Log::log_block_start("Usage: sunlightr [OPTIONS]");
    Log::log_block_start("Options:");
    Log::log_indented("-a, --apply               Apply setpoints now in the running daemon");
    Log::log_indented("-d, --debug               Enable detailed debug output");
    Log::log_indented("-h, --help                Print help information");
    Log::log_indented("-o, --once                Run one update cycle and exit");
    Log::log_indented("-s, --status              Show the running daemon's current state");
    Log::log_indented("-t, --toggle              Toggle adaptive lighting in the running daemon");
    Log::log_indented("-V, --version             Print version information");
    Log::log_end();
}
