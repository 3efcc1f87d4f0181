//! # Sunlightr
//!
//! Sun-elevation driven brightness and color temperature for smart light fixtures.
//!
//! Sunlightr periodically reads the sun's elevation, maps it onto a
//! brightness and color temperature between configured bounds, and applies
//! the result in one batched command to the target fixtures that are
//! currently switched on.
//!
//! ## Architecture
//!
//! - **snapshot**: Pure snapshot computation and the lighting data model
//! - **fixtures**: Fixture backends and the light applier
//! - **coordinator**: Enabled state, serialised apply cycles, publishing
//! - **scheduler**: Fixed-interval timer driving scheduled cycles
//! - **geo**: Sun elevation sources and solar calculations
//! - **config**: Configuration loading, validation, and default generation
//! - **status**: Status view subscriber and status file
//! - **signals**: Signal-driven control of a running daemon
//! - **logger**: Structured logging with visual formatting
//! - **utils**: Runtime paths, lock file, and instance discovery

pub mod args;
pub mod commands;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod fixtures;
pub mod geo;
pub mod logger;
pub mod scheduler;
pub mod signals;
pub mod snapshot;
pub mod status;
pub mod utils;

// Re-export important types for easier access
pub use config::{Config, Settings};
pub use coordinator::Coordinator;
pub use fixtures::{FixtureBackend, FixtureCommand, LightApplier, PowerState};
pub use geo::ElevationSource;
pub use logger::{Log, LogLevel};
pub use snapshot::{ApplyOutcome, Bounds, Mode, Snapshot};
