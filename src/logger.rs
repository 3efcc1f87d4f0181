//! Structured logging with the box-drawing output style.
//!
//! Every part of sunlightr reports through `Log`. Plain level-tagged lines
//! (`[INFO]`, `[WARN]`, ...) are used for semantic messages, while the
//! `log_block_start` / `log_decorated` / `log_indented` family renders the
//! structured daemon trace:
//!
//! ```text
//! ┏ sunlightr v0.3.0 ━━╸
//! ┃
//! ┣ Cycle (tick): transition at 18.20°
//! ┃   Brightness: 68%  Color temperature: 4750K
//! ┃   Outcome: applied (2 of 3 fixtures)
//! ```
//!
//! Output can be silenced at runtime (tests, one-shot commands that print
//! JSON) and debug lines are only emitted once `--debug` turned them on.

use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Log level enumeration for categorizing message importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug, // Only shown with --debug
    Info,  // Status updates
    Warn,  // Non-fatal issues, e.g. a fixture that cannot be queried
    Err,   // Recoverable failures, e.g. an apply fault
    Crit,  // Failures that stop the daemon
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Info => "[INFO]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Err => "[ERR]",
            LogLevel::Crit => "[CRIT]",
        }
    }
}

/// Main logging interface providing structured output formatting.
pub struct Log;

impl Log {
    /// Enable or disable all output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Turn `[DEBUG]` lines on or off.
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    /// Level-tagged log line.
    ///
    /// Errors and critical messages go to stderr so they survive when stdout
    /// is redirected by a service manager.
    pub fn log(level: LogLevel, message: &str) {
        if !Self::is_enabled() {
            return;
        }
        if level == LogLevel::Debug && !Self::is_debug() {
            return;
        }

        match level {
            LogLevel::Err | LogLevel::Crit => eprintln!("{} {}", level.prefix(), message),
            _ => println!("{} {}", level.prefix(), message),
        }
    }

    pub fn log_error(message: &str) {
        Self::log(LogLevel::Err, message);
    }

    pub fn log_warning(message: &str) {
        Self::log(LogLevel::Warn, message);
    }

    pub fn log_info(message: &str) {
        Self::log(LogLevel::Info, message);
    }

    pub fn log_debug(message: &str) {
        Self::log(LogLevel::Debug, message);
    }

    pub fn log_critical(message: &str) {
        Self::log(LogLevel::Crit, message);
    }

    // ═══ Visual Formatting Functions ═══

    /// `┣ message`, a line inside the current block.
    pub fn log_decorated(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┣ {}", message);
    }

    /// `┃   message`, a detail line under a decorated line.
    pub fn log_indented(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┃   {}", message);
    }

    /// An empty `┃` spacer.
    pub fn log_pipe() {
        if !Self::is_enabled() {
            return;
        }
        println!("┃");
    }

    /// Start a new block: spacer followed by a decorated line.
    pub fn log_block_start(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┃");
        println!("┣ {}", message);
    }

    /// Startup header.
    pub fn log_version() {
        if !Self::is_enabled() {
            return;
        }
        println!("┏ sunlightr v{} ━━╸", env!("CARGO_PKG_VERSION"));
        println!("┃");
    }

    /// Closing marker.
    pub fn log_end() {
        if !Self::is_enabled() {
            return;
        }
        println!("╹");
    }
}
