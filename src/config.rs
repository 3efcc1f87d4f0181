//! Configuration system for sunlightr.
//!
//! Configuration lives in two tiers inside `$XDG_CONFIG_HOME/sunlightr/`:
//!
//! 1. **sunlightr.toml**: the data tier, created with defaults on first run
//! 2. **options.toml**: an optional options tier whose keys override the
//!    data tier one by one
//!
//! Both tiers share the [`Config`] shape. They are merged once at load time
//! (options over data, falling back to the defaults in `constants`),
//! validated, and resolved into an immutable [`Settings`] value that is
//! handed to the coordinator. Nothing is re-resolved per cycle.
//!
//! ```toml
//! name = "Living room"
//! target_lights = ["light.desk", "light.hall"]   # or "light.desk, light.hall"
//! min_brightness_pct = 20                        # 1-100
//! max_brightness_pct = 100                       # 1-100
//! min_kelvin = 2200                              # 1500-10000
//! max_kelvin = 6500                              # 1500-10000
//! enabled = true
//!
//! latitude = 51.4779                             # omit to run without a sun signal
//! longitude = 0.0
//! update_interval = 30                           # seconds
//!
//! backend = "command"                            # "command" or "dry_run"
//! power_command = "lightctl state {id}"
//! apply_command = "lightctl set {ids} --brightness {brightness} --kelvin {kelvin} --transition {transition}"
//! ```
//!
//! `min > max` is accepted for both bounds and produces a reversed profile;
//! a warning is logged so a typo does not go unnoticed.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::logger::Log;
use crate::snapshot::Bounds;

/// Fixture backend selection.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Query and command fixtures through the configured shell commands.
    Command,
    /// Treat every fixture as on and only log the command that would be sent.
    DryRun,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Command => "command",
            Backend::DryRun => "dry_run",
        }
    }
}

/// Target fixtures as written in TOML: either a list or a comma-separated string.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TargetList {
    List(Vec<String>),
    Csv(String),
}

impl TargetList {
    /// Trimmed, non-empty identifiers with duplicates removed (first wins).
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            TargetList::List(items) => items.iter().map(String::as_str).collect(),
            TargetList::Csv(text) => text.split(',').collect(),
        };

        let mut targets: Vec<String> = Vec::new();
        for item in raw {
            let item = item.trim();
            if !item.is_empty() && !targets.iter().any(|t| t == item) {
                targets.push(item.to_string());
            }
        }
        targets
    }
}

/// One configuration tier. Every key is optional.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub name: Option<String>,
    pub target_lights: Option<TargetList>,
    pub min_brightness_pct: Option<u32>,
    pub max_brightness_pct: Option<u32>,
    pub min_kelvin: Option<u32>,
    pub max_kelvin: Option<u32>,
    pub enabled: Option<bool>,
    pub update_interval: Option<u64>, // seconds between scheduled cycles
    pub transition: Option<f64>,      // seconds sent with each apply
    pub apply_timeout: Option<u64>,   // seconds
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fixed_elevation: Option<f64>, // degrees; overrides the solar calculation
    pub backend: Option<Backend>,
    pub power_command: Option<String>, // placeholder: {id}
    pub apply_command: Option<String>, // placeholders: {ids} {brightness} {kelvin} {transition}
}

/// Fully resolved, validated configuration handed to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub name: String,
    pub targets: Vec<String>,
    pub bounds: Bounds,
    pub enabled: bool,
    pub update_interval: Duration,
    pub transition_secs: f64,
    pub apply_timeout: Duration,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub fixed_elevation: Option<f64>,
    pub backend: Backend,
    pub power_command: Option<String>,
    pub apply_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            targets: Vec::new(),
            bounds: Bounds::default(),
            enabled: DEFAULT_ENABLED,
            update_interval: Duration::from_secs(DEFAULT_UPDATE_INTERVAL),
            transition_secs: DEFAULT_TRANSITION_SECS,
            apply_timeout: Duration::from_secs(DEFAULT_APPLY_TIMEOUT),
            latitude: None,
            longitude: None,
            fixed_elevation: None,
            backend: DEFAULT_BACKEND,
            power_command: None,
            apply_command: None,
        }
    }
}

impl Config {
    /// Directory holding both configuration tiers.
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("sunlightr"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Path of the options tier that sits beside `config_path`.
    pub fn options_path_for(config_path: &Path) -> Option<PathBuf> {
        config_path.parent().map(|parent| parent.join(OPTIONS_FILE_NAME))
    }

    /// Parse a single tier without applying defaults.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    /// Layer `options` over `self`, key by key.
    pub fn merged_with(&self, options: &Config) -> Config {
        Config {
            name: options.name.clone().or_else(|| self.name.clone()),
            target_lights: options
                .target_lights
                .clone()
                .or_else(|| self.target_lights.clone()),
            min_brightness_pct: options.min_brightness_pct.or(self.min_brightness_pct),
            max_brightness_pct: options.max_brightness_pct.or(self.max_brightness_pct),
            min_kelvin: options.min_kelvin.or(self.min_kelvin),
            max_kelvin: options.max_kelvin.or(self.max_kelvin),
            enabled: options.enabled.or(self.enabled),
            update_interval: options.update_interval.or(self.update_interval),
            transition: options.transition.or(self.transition),
            apply_timeout: options.apply_timeout.or(self.apply_timeout),
            latitude: options.latitude.or(self.latitude),
            longitude: options.longitude.or(self.longitude),
            fixed_elevation: options.fixed_elevation.or(self.fixed_elevation),
            backend: options.backend.or(self.backend),
            power_command: options
                .power_command
                .clone()
                .or_else(|| self.power_command.clone()),
            apply_command: options
                .apply_command
                .clone()
                .or_else(|| self.apply_command.clone()),
        }
    }

    /// Apply defaults and validate, producing the immutable settings.
    pub fn resolve(&self) -> Result<Settings> {
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NAME)
            .to_string();

        let targets = self
            .target_lights
            .as_ref()
            .map(TargetList::normalize)
            .unwrap_or_default();

        let min_brightness = validate_brightness(
            "Minimum brightness",
            self.min_brightness_pct,
            DEFAULT_MIN_BRIGHTNESS,
        )?;
        let max_brightness = validate_brightness(
            "Maximum brightness",
            self.max_brightness_pct,
            DEFAULT_MAX_BRIGHTNESS,
        )?;
        let min_kelvin = validate_kelvin("Minimum color temperature", self.min_kelvin, DEFAULT_MIN_KELVIN)?;
        let max_kelvin = validate_kelvin("Maximum color temperature", self.max_kelvin, DEFAULT_MAX_KELVIN)?;

        let update_interval = self.update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL);
        if !(MINIMUM_UPDATE_INTERVAL..=MAXIMUM_UPDATE_INTERVAL).contains(&update_interval) {
            anyhow::bail!(
                "Update interval must be between {} and {} seconds (got {})",
                MINIMUM_UPDATE_INTERVAL,
                MAXIMUM_UPDATE_INTERVAL,
                update_interval
            );
        }

        let transition_secs = self.transition.unwrap_or(DEFAULT_TRANSITION_SECS);
        if !transition_secs.is_finite()
            || !(MINIMUM_TRANSITION_SECS..=MAXIMUM_TRANSITION_SECS).contains(&transition_secs)
        {
            anyhow::bail!(
                "Transition must be between {} and {} seconds (got {})",
                MINIMUM_TRANSITION_SECS,
                MAXIMUM_TRANSITION_SECS,
                transition_secs
            );
        }

        let apply_timeout = self.apply_timeout.unwrap_or(DEFAULT_APPLY_TIMEOUT);
        if !(MINIMUM_APPLY_TIMEOUT..=MAXIMUM_APPLY_TIMEOUT).contains(&apply_timeout) {
            anyhow::bail!(
                "Apply timeout must be between {} and {} seconds (got {})",
                MINIMUM_APPLY_TIMEOUT,
                MAXIMUM_APPLY_TIMEOUT,
                apply_timeout
            );
        }

        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => crate::geo::solar::validate_coordinates(lat, lon)?,
            (None, None) => {}
            _ => anyhow::bail!("Latitude and longitude must be set together"),
        }

        if let Some(elevation) = self.fixed_elevation {
            if !(-90.0..=90.0).contains(&elevation) {
                anyhow::bail!(
                    "Fixed elevation must be between -90 and 90 degrees (got {})",
                    elevation
                );
            }
        }

        let backend = self.backend.unwrap_or(DEFAULT_BACKEND);
        let power_command = non_empty(self.power_command.as_deref());
        let apply_command = non_empty(self.apply_command.as_deref());
        if backend == Backend::Command {
            if power_command.is_none() || apply_command.is_none() {
                anyhow::bail!(
                    "backend=\"command\" requires both power_command and apply_command.\n\
                    Set them in sunlightr.toml, or use backend=\"dry_run\" to only log commands."
                );
            }
            if let Some(ref command) = power_command {
                if !command.contains("{id}") {
                    anyhow::bail!("power_command must contain the {{id}} placeholder");
                }
            }
            if let Some(ref command) = apply_command {
                if !command.contains("{ids}") {
                    anyhow::bail!("apply_command must contain the {{ids}} placeholder");
                }
            }
        }

        let settings = Settings {
            name,
            targets,
            bounds: Bounds {
                min_brightness,
                max_brightness,
                min_kelvin,
                max_kelvin,
            },
            enabled: self.enabled.unwrap_or(DEFAULT_ENABLED),
            update_interval: Duration::from_secs(update_interval),
            transition_secs,
            apply_timeout: Duration::from_secs(apply_timeout),
            latitude: self.latitude,
            longitude: self.longitude,
            fixed_elevation: self.fixed_elevation,
            backend,
            power_command,
            apply_command,
        };

        warn_about_reversed_bounds(&settings.bounds);
        Ok(settings)
    }

    /// Load the data tier at `path` plus its options tier, then resolve.
    ///
    /// Does not create anything when the file is missing.
    pub fn load_from_path(path: &Path) -> Result<Settings> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file not found at specified path: {}",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let data: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let options = Self::load_options_for(path);
        data.merged_with(&options).resolve()
    }

    /// Read the options tier beside `config_path`.
    ///
    /// A missing file is normal. An unreadable or malformed file is reported
    /// and ignored so the data tier still applies.
    fn load_options_for(config_path: &Path) -> Config {
        let Some(options_path) = Self::options_path_for(config_path) else {
            return Config::default();
        };
        if !options_path.exists() {
            return Config::default();
        }

        match fs::read_to_string(&options_path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(options) => {
                    Log::log_indented(&format!(
                        "Loaded option overrides from {}",
                        crate::utils::path_for_display(&options_path)
                    ));
                    options
                }
                Err(e) => {
                    Log::log_warning(&format!(
                        "Failed to parse {}: {}. Using the main configuration only.",
                        OPTIONS_FILE_NAME, e
                    ));
                    Config::default()
                }
            },
            Err(e) => {
                Log::log_warning(&format!(
                    "Failed to read {}: {}. Using the main configuration only.",
                    OPTIONS_FILE_NAME, e
                ));
                Config::default()
            }
        }
    }

    /// Load from the default location, creating a default file on first run.
    pub fn load() -> Result<Settings> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)
                .context("Failed to create default config during load")?;
            Log::log_block_start(&format!(
                "Created default configuration at {}",
                crate::utils::path_for_display(&config_path)
            ));
        }

        Self::load_from_path(&config_path).with_context(|| {
            Log::log_pipe();
            format!("Failed to load configuration from {}", config_path.display())
        })
    }

    /// Write a commented default configuration file.
    pub fn create_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = ConfigBuilder::new()
            .add_section("Sunlightr configuration")
            .add_setting(
                "name",
                &format!("\"{}\"", DEFAULT_NAME),
                "Shown in the status view",
            )
            .add_setting(
                "target_lights",
                "[]",
                "Fixture identifiers, e.g. [\"light.desk\", \"light.hall\"]",
            )
            .add_setting(
                "enabled",
                &DEFAULT_ENABLED.to_string(),
                "Apply setpoints when the daemon starts",
            )
            .add_section("Setpoint bounds")
            .add_setting(
                "min_brightness_pct",
                &DEFAULT_MIN_BRIGHTNESS.to_string(),
                &format!(
                    "Brightness at night ({}-{}%)",
                    MINIMUM_BRIGHTNESS, MAXIMUM_BRIGHTNESS
                ),
            )
            .add_setting(
                "max_brightness_pct",
                &DEFAULT_MAX_BRIGHTNESS.to_string(),
                &format!(
                    "Brightness with the sun high ({}-{}%)",
                    MINIMUM_BRIGHTNESS, MAXIMUM_BRIGHTNESS
                ),
            )
            .add_setting(
                "min_kelvin",
                &DEFAULT_MIN_KELVIN.to_string(),
                &format!(
                    "Color temperature at night ({}-{}) Kelvin",
                    MINIMUM_KELVIN, MAXIMUM_KELVIN
                ),
            )
            .add_setting(
                "max_kelvin",
                &DEFAULT_MAX_KELVIN.to_string(),
                &format!(
                    "Color temperature with the sun high ({}-{}) Kelvin",
                    MINIMUM_KELVIN, MAXIMUM_KELVIN
                ),
            )
            .add_section("Timing")
            .add_setting(
                "update_interval",
                &DEFAULT_UPDATE_INTERVAL.to_string(),
                &format!(
                    "Seconds between scheduled updates ({}-{})",
                    MINIMUM_UPDATE_INTERVAL, MAXIMUM_UPDATE_INTERVAL
                ),
            )
            .add_setting(
                "transition",
                &format!("{:.1}", DEFAULT_TRANSITION_SECS),
                "Fade length in seconds sent with every update",
            )
            .add_setting(
                "apply_timeout",
                &DEFAULT_APPLY_TIMEOUT.to_string(),
                "Seconds before a fixture command counts as failed",
            )
            .add_section("Sun position")
            .add_commented_setting("latitude", "51.477900", "Geographic latitude")
            .add_commented_setting("longitude", "0.000000", "Geographic longitude")
            .add_section("Fixture backend")
            .add_setting(
                "backend",
                &format!("\"{}\"", DEFAULT_BACKEND.as_str()),
                "\"command\" or \"dry_run\"",
            )
            .add_commented_setting(
                "power_command",
                "\"lightctl state {id}\"",
                "Must print on/off",
            )
            .add_commented_setting(
                "apply_command",
                "\"lightctl set {ids} -b {brightness} -k {kelvin} -t {transition}\"",
                "One call for all fixtures",
            )
            .build();

        fs::write(path, content).context("Failed to write default config file")?;
        Ok(())
    }
}

impl Settings {
    pub fn log_config(&self, config_path: &Path) {
        Log::log_block_start(&format!(
            "Loaded configuration from {}",
            crate::utils::path_for_display(config_path)
        ));
        Log::log_indented(&format!("Name: {}", self.name));
        if self.targets.is_empty() {
            Log::log_indented("Target lights: none");
        } else {
            Log::log_indented(&format!("Target lights: {}", self.targets.join(", ")));
        }
        Log::log_indented(&format!(
            "Brightness: {}% → {}%",
            self.bounds.min_brightness, self.bounds.max_brightness
        ));
        Log::log_indented(&format!(
            "Color temperature: {}K → {}K",
            self.bounds.min_kelvin, self.bounds.max_kelvin
        ));
        Log::log_indented(&format!("Enabled at start: {}", self.enabled));
        Log::log_indented(&format!(
            "Update interval: {} seconds",
            self.update_interval.as_secs()
        ));
        Log::log_indented(&format!("Transition: {} seconds", self.transition_secs));
        Log::log_indented(&format!(
            "Apply timeout: {} seconds",
            self.apply_timeout.as_secs()
        ));
        Log::log_indented(&format!("Backend: {}", self.backend.as_str()));
    }
}

fn validate_brightness(label: &str, value: Option<u32>, default: u8) -> Result<u8> {
    let Some(value) = value else {
        return Ok(default);
    };
    if !(u32::from(MINIMUM_BRIGHTNESS)..=u32::from(MAXIMUM_BRIGHTNESS)).contains(&value) {
        anyhow::bail!(
            "{} must be between {}% and {}% (got {})",
            label,
            MINIMUM_BRIGHTNESS,
            MAXIMUM_BRIGHTNESS,
            value
        );
    }
    Ok(value as u8)
}

fn validate_kelvin(label: &str, value: Option<u32>, default: u32) -> Result<u32> {
    let Some(value) = value else {
        return Ok(default);
    };
    if !(MINIMUM_KELVIN..=MAXIMUM_KELVIN).contains(&value) {
        anyhow::bail!(
            "{} must be between {} and {} Kelvin (got {})",
            label,
            MINIMUM_KELVIN,
            MAXIMUM_KELVIN,
            value
        );
    }
    Ok(value)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn warn_about_reversed_bounds(bounds: &Bounds) {
    if bounds.is_brightness_reversed() {
        Log::log_warning(&format!(
            "min_brightness_pct ({}) is above max_brightness_pct ({}): brightness will fall as the sun rises",
            bounds.min_brightness, bounds.max_brightness
        ));
    }
    if bounds.is_kelvin_reversed() {
        Log::log_warning(&format!(
            "min_kelvin ({}) is above max_kelvin ({}): lights will warm up as the sun rises",
            bounds.min_kelvin, bounds.max_kelvin
        ));
    }
}

/// Builder for the aligned, commented default configuration file.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{}]", title)));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{} = {}", key, value),
            comment: format!("# {}", comment),
        });
        self
    }

    /// A setting that is written disabled, as an example for the user.
    fn add_commented_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("# {} = {}", key, value),
            comment: format!("# {}", comment),
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_section = true;

        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !first_section {
                        result.push(String::new());
                    }
                    result.push(title);
                    first_section = false;
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.len());
                    result.push(format!("{}{}{}", line, padding, comment));
                }
            }
        }

        result.push(String::new());
        result.join("\n")
    }
}
