//! Fixture backend driven by user-supplied shell commands.
//!
//! Two templates are configured:
//!
//! - `power_command` runs once per fixture with `{id}` substituted and must
//!   print `on` or `off`; anything else is treated as unknown
//! - `apply_command` runs once per cycle with `{ids}` (comma-joined),
//!   `{brightness}`, `{kelvin}` and `{transition}` substituted; a non-zero
//!   exit status is a failure
//!
//! Commands run through `sh -c`. Fixture ids are shell-quoted before they
//! are substituted. Each command is bounded by the apply timeout and killed
//! if it overruns. Output is drained while the command runs, so a chatty
//! command never stalls on a full pipe.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::constants::COMMAND_POLL_INTERVAL_MS;
use crate::fixtures::{FixtureBackend, FixtureCommand, PowerState};
use crate::logger::Log;

pub struct CommandBackend {
    power_command: String,
    apply_command: String,
    timeout: Duration,
}

/// Captured result of one shell command.
#[derive(Debug)]
struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandBackend {
    pub fn new(power_command: String, apply_command: String, timeout: Duration) -> Self {
        Self {
            power_command,
            apply_command,
            timeout,
        }
    }

    /// The power query for one fixture, placeholders filled in.
    pub fn render_power_command(&self, fixture_id: &str) -> String {
        self.power_command.replace("{id}", &shell_quote(fixture_id))
    }

    /// The batched apply command, placeholders filled in.
    pub fn render_apply_command(&self, command: &FixtureCommand) -> String {
        self.apply_command
            .replace("{ids}", &quoted_ids(&command.fixture_ids))
            .replace("{brightness}", &command.brightness_pct.to_string())
            .replace("{kelvin}", &command.color_temp_kelvin.to_string())
            .replace("{transition}", &format_transition(command.transition_secs))
    }

    /// Run `script` with `sh -c`, killing it once the timeout passes.
    fn run(&self, script: &str) -> Result<CommandOutput> {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("{}", describe_spawn_error(&e)))?;

        let (stdout_reader, stderr_reader) = match spawn_readers(&mut child) {
            Ok(readers) => readers,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        let started = Instant::now();
        let status = loop {
            match child.try_wait().context("Failed to wait for command")? {
                Some(status) => break status,
                None if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait(); // reap
                    // Readers finish on their own once every pipe writer is gone
                    anyhow::bail!(
                        "Command did not finish within {} seconds: {}",
                        self.timeout.as_secs_f64(),
                        script
                    );
                }
                None => thread::sleep(Duration::from_millis(COMMAND_POLL_INTERVAL_MS)),
            }
        };

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            stdout: stdout_reader.join().unwrap_or_default(),
            stderr: stderr_reader.join().unwrap_or_default(),
        })
    }
}

/// Start draining the child's stdout and stderr.
fn spawn_readers(child: &mut Child) -> Result<(JoinHandle<String>, JoinHandle<String>)> {
    let stdout = spawn_reader(child.stdout.take(), "stdout")?;
    let stderr = spawn_reader(child.stderr.take(), "stderr")?;
    Ok((stdout, stderr))
}

fn spawn_reader<R>(pipe: Option<R>, label: &'static str) -> Result<JoinHandle<String>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("command-{}", label))
        .spawn(move || {
            let mut buffer = Vec::new();
            if let Some(mut pipe) = pipe {
                if let Err(e) = pipe.read_to_end(&mut buffer) {
                    Log::log_debug(&format!("Failed to read command {}: {}", label, e));
                }
            }
            String::from_utf8_lossy(&buffer).into_owned()
        })
        .with_context(|| format!("Failed to start {} reader thread", label))
}

impl FixtureBackend for CommandBackend {
    fn power_state(&self, fixture_id: &str) -> Result<PowerState> {
        let script = self.render_power_command(fixture_id);
        let output = self.run(&script)?;
        if !output.success {
            anyhow::bail!(
                "Power query for {} exited with {}: {}",
                fixture_id,
                exit_description(output.code),
                output.stderr.trim()
            );
        }
        Ok(PowerState::parse(&output.stdout))
    }

    fn set_parameters(&self, command: &FixtureCommand) -> Result<()> {
        let script = self.render_apply_command(command);
        Log::log_debug(&format!("Running: {}", script));

        let output = self.run(&script)?;
        if !output.success {
            anyhow::bail!(
                "Apply command exited with {}: {}",
                exit_description(output.code),
                output.stderr.trim()
            );
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "command"
    }
}

/// Quote `value` for `sh` unless it only holds characters that need none.
fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '/' | '@' | '+' | '=')
        });
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "'\\''"))
    }
}

/// Comma-joined ids, each quoted on its own. `sh` glues the pieces back
/// into one word.
fn quoted_ids(ids: &[String]) -> String {
    ids.iter()
        .map(|id| shell_quote(id))
        .collect::<Vec<_>>()
        .join(",")
}

/// Seconds without a trailing `.0` for whole values.
fn format_transition(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{}", secs)
    }
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Turn a spawn failure into a message that points at the likely cause.
fn describe_spawn_error(error: &std::io::Error) -> String {
    match error.kind() {
        ErrorKind::NotFound => "Could not run fixture command: 'sh' was not found".to_string(),
        ErrorKind::PermissionDenied => {
            "Could not run fixture command: permission denied".to_string()
        }
        _ => format!("Could not run fixture command: {}", error),
    }
}
