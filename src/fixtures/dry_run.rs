//! Backend that only logs the updates it would send.

use anyhow::Result;

use crate::fixtures::{FixtureBackend, FixtureCommand, PowerState};
use crate::logger::Log;

/// Every fixture reports as on, so the full target list is "adjusted".
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunBackend;

impl FixtureBackend for DryRunBackend {
    fn power_state(&self, _fixture_id: &str) -> Result<PowerState> {
        Ok(PowerState::On)
    }

    fn set_parameters(&self, command: &FixtureCommand) -> Result<()> {
        Log::log_decorated(&format!(
            "[dry run] {} → {}% at {}K over {}s",
            command.fixture_ids.join(", "),
            command.brightness_pct,
            command.color_temp_kelvin,
            command.transition_secs
        ));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "dry-run"
    }
}
