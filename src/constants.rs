//! Application constants and default values for sunlightr.
//!
//! This module contains the configuration defaults, validation limits,
//! and operational constants used throughout the application.

use crate::config::Backend;

// ═══ Application Configuration Defaults ═══
// These values are used when config options are not specified by the user

pub const DEFAULT_NAME: &str = "Simple Adaptive Lighting";
pub const DEFAULT_ENABLED: bool = true;
pub const DEFAULT_BACKEND: Backend = Backend::DryRun; // log commands until the host commands are configured
pub const DEFAULT_MIN_BRIGHTNESS: u8 = 20; // percent - dim evening light
pub const DEFAULT_MAX_BRIGHTNESS: u8 = 100; // percent - full output around noon
pub const DEFAULT_MIN_KELVIN: u32 = 2200; // Kelvin - warm, candle-like
pub const DEFAULT_MAX_KELVIN: u32 = 6500; // Kelvin - close to daylight
pub const DEFAULT_UPDATE_INTERVAL: u64 = 30; // seconds between scheduled cycles
pub const DEFAULT_TRANSITION_SECS: f64 = 1.0; // fade length sent with every apply
pub const DEFAULT_APPLY_TIMEOUT: u64 = 10; // seconds before an apply is a fault

// ═══ Validation Limits ═══
// These limits ensure user inputs are within reasonable and safe ranges

// Brightness limits (percentage of fixture output)
pub const MINIMUM_BRIGHTNESS: u8 = 1;
pub const MAXIMUM_BRIGHTNESS: u8 = 100;

// Color temperature limits (Kelvin scale)
pub const MINIMUM_KELVIN: u32 = 1500;
pub const MAXIMUM_KELVIN: u32 = 10000;

// Update interval limits
pub const MINIMUM_UPDATE_INTERVAL: u64 = 5; // seconds
pub const MAXIMUM_UPDATE_INTERVAL: u64 = 3600; // seconds

// Transition length limits
pub const MINIMUM_TRANSITION_SECS: f64 = 0.0;
pub const MAXIMUM_TRANSITION_SECS: f64 = 300.0;

// Apply timeout limits
pub const MINIMUM_APPLY_TIMEOUT: u64 = 1;
pub const MAXIMUM_APPLY_TIMEOUT: u64 = 120;

// ═══ Elevation Mapping ═══
// Civil twilight (-6°) maps to 0.0, near-noon (+45°) maps to 1.0

pub const ELEVATION_FLOOR_DEGREES: f64 = -6.0;
pub const ELEVATION_SPAN_DEGREES: f64 = 51.0;
pub const NIGHT_THRESHOLD: f64 = 0.15; // t at or below is night
pub const DAY_THRESHOLD: f64 = 0.85; // t at or above is day
pub const UNAVAILABLE_ELEVATION: f64 = 0.0; // used when no signal is present

// ═══ Operational Timing Constants ═══

pub const CHECK_INTERVAL_SECS: u64 = 1; // How often the scheduler checks the running flag
pub const COMMAND_POLL_INTERVAL_MS: u64 = 25; // Poll step while waiting on a fixture command

// ═══ File Names ═══

pub const CONFIG_FILE_NAME: &str = "sunlightr.toml";
pub const OPTIONS_FILE_NAME: &str = "options.toml";
pub const LOCK_FILE_NAME: &str = "sunlightr.lock";
pub const STATUS_FILE_NAME: &str = "sunlightr.status.json";

// ═══ Exit Codes ═══

pub const EXIT_FAILURE: i32 = 1; // General failure
