//! Command-line command handlers for sunlightr.
//!
//! One-shot commands (`--once`) and the control commands that talk to a
//! running daemon (`--apply`, `--toggle`, `--status`). Each command lives in
//! its own submodule.

pub mod apply;
pub mod once;
pub mod status;
pub mod toggle;
