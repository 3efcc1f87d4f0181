//! Lighting snapshots and the pure snapshot computation.
//!
//! A [`Snapshot`] is one immutable computed lighting state: the sun
//! elevation it was derived from, the brightness and color temperature
//! interpolated between the configured bounds, the coarse [`Mode`], and the
//! [`ApplyOutcome`] once the coordinator has (or has not) commanded the
//! fixtures.
//!
//! ## Elevation mapping
//!
//! The elevation is normalised onto a unit interval, with civil twilight
//! (-6°) at 0.0 and +45° at 1.0:
//!
//! ```text
//! t = clamp((elevation + 6) / 51, 0, 1)
//! ```
//!
//! Values outside that window saturate, so the deep night and the high
//! midday sun both produce the configured extremes.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Coarse classification of where the sun is in the day/night cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Night,
    Transition,
    Day,
}

impl Mode {
    /// Classify a normalised elevation. Both thresholds are inclusive.
    pub fn from_normalized(t: f64) -> Self {
        if t <= NIGHT_THRESHOLD {
            Mode::Night
        } else if t >= DAY_THRESHOLD {
            Mode::Day
        } else {
            Mode::Transition
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Night => "night",
            Mode::Transition => "transition",
            Mode::Day => "day",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of attempting to command the fixtures during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The applier did not run (coordinator disabled).
    Idle,
    /// One batched command reached the powered-on fixtures.
    Applied,
    /// No fixtures are configured.
    SkippedNoTargets,
    /// Every configured fixture is off or cannot be queried.
    SkippedAllOff,
    /// The fixture command failed or timed out.
    Failed,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Idle => "idle",
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::SkippedNoTargets => "skipped_no_targets",
            ApplyOutcome::SkippedAllOff => "skipped_all_off",
            ApplyOutcome::Failed => "failed",
        }
    }

    /// True for the degraded indicator shown by the status view.
    pub fn is_fault(&self) -> bool {
        matches!(self, ApplyOutcome::Failed)
    }
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Brightness and color temperature bounds the snapshot interpolates between.
///
/// `min > max` is accepted and yields a reversed profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_brightness: u8,
    pub max_brightness: u8,
    pub min_kelvin: u32,
    pub max_kelvin: u32,
}

impl Bounds {
    pub fn is_brightness_reversed(&self) -> bool {
        self.min_brightness > self.max_brightness
    }

    pub fn is_kelvin_reversed(&self) -> bool {
        self.min_kelvin > self.max_kelvin
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_brightness: DEFAULT_MIN_BRIGHTNESS,
            max_brightness: DEFAULT_MAX_BRIGHTNESS,
            min_kelvin: DEFAULT_MIN_KELVIN,
            max_kelvin: DEFAULT_MAX_KELVIN,
        }
    }
}

/// One computed lighting state plus its apply outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub sun_elevation: f64,
    pub brightness_pct: u8,
    pub color_temp_kelvin: u32,
    pub target_fixtures: Vec<String>,
    pub adjusted_fixtures: Vec<String>,
    pub apply_outcome: ApplyOutcome,
    pub enabled_at_snapshot: bool,
    pub computed_at: DateTime<Local>,
}

impl Snapshot {
    /// Copy of this snapshot carrying the applier's result.
    ///
    /// `adjusted` is expected to be a subset of `target_fixtures`; a
    /// `Failed` outcome always clears it.
    pub fn with_outcome(&self, outcome: ApplyOutcome, adjusted: Vec<String>) -> Snapshot {
        let adjusted_fixtures = if outcome.is_fault() { Vec::new() } else { adjusted };
        Snapshot {
            apply_outcome: outcome,
            adjusted_fixtures,
            ..self.clone()
        }
    }
}

/// Map a sun elevation onto the unit interval.
///
/// Non-finite input is treated like an unavailable signal.
pub fn normalize_elevation(elevation: f64) -> f64 {
    let elevation = if elevation.is_finite() {
        elevation
    } else {
        UNAVAILABLE_ELEVATION
    };
    ((elevation - ELEVATION_FLOOR_DEGREES) / ELEVATION_SPAN_DEGREES).clamp(0.0, 1.0)
}

/// Linear interpolation rounded half-to-even.
///
/// Works for reversed ranges (`start > end`) as well.
pub fn interpolate_rounded(start: u32, end: u32, t: f64) -> u32 {
    let start_f = f64::from(start);
    let end_f = f64::from(end);
    let value = start_f + (end_f - start_f) * t.clamp(0.0, 1.0);
    let low = start_f.min(end_f);
    let high = start_f.max(end_f);
    value.round_ties_even().clamp(low, high) as u32
}

/// Compute a fresh snapshot. Pure: identical inputs give identical output,
/// apart from the `computed_at` stamp.
///
/// The result always carries `ApplyOutcome::Idle` and no adjusted fixtures.
pub fn compute(sun_elevation: f64, bounds: &Bounds, targets: &[String], enabled: bool) -> Snapshot {
    compute_at(sun_elevation, bounds, targets, enabled, Local::now())
}

/// [`compute`] with an explicit timestamp.
pub fn compute_at(
    sun_elevation: f64,
    bounds: &Bounds,
    targets: &[String],
    enabled: bool,
    computed_at: DateTime<Local>,
) -> Snapshot {
    let t = normalize_elevation(sun_elevation);

    let brightness = interpolate_rounded(
        u32::from(bounds.min_brightness),
        u32::from(bounds.max_brightness),
        t,
    );
    let kelvin = interpolate_rounded(bounds.min_kelvin, bounds.max_kelvin, t);

    Snapshot {
        mode: Mode::from_normalized(t),
        sun_elevation,
        // Bounded by two u8 endpoints
        brightness_pct: brightness as u8,
        color_temp_kelvin: kelvin,
        target_fixtures: targets.to_vec(),
        adjusted_fixtures: Vec::new(),
        apply_outcome: ApplyOutcome::Idle,
        enabled_at_snapshot: enabled,
        computed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;

    fn standard_bounds() -> Bounds {
        Bounds {
            min_brightness: TEST_MIN_BRIGHTNESS,
            max_brightness: TEST_MAX_BRIGHTNESS,
            min_kelvin: TEST_MIN_KELVIN,
            max_kelvin: TEST_MAX_KELVIN,
        }
    }

    fn targets() -> Vec<String> {
        vec!["light.desk".to_string(), "light.hall".to_string()]
    }

    #[test]
    fn test_normalize_elevation_saturates() {
        assert_eq!(normalize_elevation(-90.0), 0.0);
        assert_eq!(normalize_elevation(-6.0), 0.0);
        assert_eq!(normalize_elevation(45.0), 1.0);
        assert_eq!(normalize_elevation(90.0), 1.0);
        assert_eq!(normalize_elevation(19.5), 0.5);
    }

    #[test]
    fn test_normalize_elevation_non_finite() {
        let fallback = normalize_elevation(UNAVAILABLE_ELEVATION);
        assert_eq!(normalize_elevation(f64::NAN), fallback);
        assert_eq!(normalize_elevation(f64::INFINITY), fallback);
    }

    #[test]
    fn test_mode_boundaries_are_closed() {
        // (1.65 + 6) / 51 == 0.15 exactly in f64
        assert_eq!(normalize_elevation(1.65), 0.15);
        assert_eq!(Mode::from_normalized(normalize_elevation(1.65)), Mode::Night);
        // (37.35 + 6) / 51 == 0.85 exactly in f64
        assert_eq!(normalize_elevation(37.35), 0.85);
        assert_eq!(Mode::from_normalized(normalize_elevation(37.35)), Mode::Day);
        assert_eq!(Mode::from_normalized(0.5), Mode::Transition);
        assert_eq!(Mode::from_normalized(0.150001), Mode::Transition);
        assert_eq!(Mode::from_normalized(0.849999), Mode::Transition);
    }

    #[test]
    fn test_reference_elevations() {
        let bounds = standard_bounds();
        assert_eq!(compute(-1.35, &bounds, &[], true).mode, Mode::Night);
        assert_eq!(compute(37.35, &bounds, &[], true).mode, Mode::Day);
        assert_eq!(compute(19.5, &bounds, &[], true).mode, Mode::Transition);
        // An unavailable signal lands in the night band
        assert_eq!(compute(UNAVAILABLE_ELEVATION, &bounds, &[], true).mode, Mode::Night);
    }

    #[test]
    fn test_interpolation_midpoint() {
        let snapshot = compute(19.5, &standard_bounds(), &targets(), true);
        assert_eq!(snapshot.brightness_pct, 60);
        assert_eq!(snapshot.color_temp_kelvin, 4350);
    }

    #[test]
    fn test_interpolation_extremes() {
        let bounds = standard_bounds();
        let night = compute(-30.0, &bounds, &targets(), true);
        assert_eq!(night.brightness_pct, TEST_MIN_BRIGHTNESS);
        assert_eq!(night.color_temp_kelvin, TEST_MIN_KELVIN);

        let day = compute(70.0, &bounds, &targets(), true);
        assert_eq!(day.brightness_pct, TEST_MAX_BRIGHTNESS);
        assert_eq!(day.color_temp_kelvin, TEST_MAX_KELVIN);
    }

    #[test]
    fn test_rounding_half_to_even() {
        // t = 0.5 exactly: 1.5 -> 2, 2.5 -> 2
        assert_eq!(interpolate_rounded(1, 2, 0.5), 2);
        assert_eq!(interpolate_rounded(2, 3, 0.5), 2);
        assert_eq!(interpolate_rounded(3, 4, 0.5), 4);

        let bounds = Bounds {
            min_brightness: 2,
            max_brightness: 3,
            min_kelvin: 2001,
            max_kelvin: 2002,
        };
        let snapshot = compute(19.5, &bounds, &[], true);
        assert_eq!(snapshot.brightness_pct, 2);
        assert_eq!(snapshot.color_temp_kelvin, 2002);
    }

    #[test]
    fn test_reversed_bounds_produce_reversed_profile() {
        let bounds = Bounds {
            min_brightness: 100,
            max_brightness: 20,
            min_kelvin: 6500,
            max_kelvin: 2200,
        };
        assert!(bounds.is_brightness_reversed());
        assert!(bounds.is_kelvin_reversed());

        let night = compute(-10.0, &bounds, &[], true);
        let day = compute(50.0, &bounds, &[], true);
        assert_eq!(night.brightness_pct, 100);
        assert_eq!(day.brightness_pct, 20);
        assert_eq!(night.color_temp_kelvin, 6500);
        assert_eq!(day.color_temp_kelvin, 2200);
    }

    #[test]
    fn test_compute_is_idle_and_copies_targets() {
        let snapshot = compute(10.0, &standard_bounds(), &targets(), false);
        assert_eq!(snapshot.apply_outcome, ApplyOutcome::Idle);
        assert!(snapshot.adjusted_fixtures.is_empty());
        assert_eq!(snapshot.target_fixtures, targets());
        assert!(!snapshot.enabled_at_snapshot);
        assert_eq!(snapshot.sun_elevation, 10.0);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let at = Local::now();
        let first = compute_at(12.34, &standard_bounds(), &targets(), true, at);
        let second = compute_at(12.34, &standard_bounds(), &targets(), true, at);
        assert_eq!(first, second);
    }

    #[test]
    fn test_with_outcome_failed_clears_adjusted() {
        let snapshot = compute(10.0, &standard_bounds(), &targets(), true);
        let applied = snapshot.with_outcome(ApplyOutcome::Applied, vec!["light.desk".into()]);
        assert_eq!(applied.adjusted_fixtures, vec!["light.desk".to_string()]);
        assert_eq!(applied.brightness_pct, snapshot.brightness_pct);

        let failed = snapshot.with_outcome(ApplyOutcome::Failed, vec!["light.desk".into()]);
        assert!(failed.adjusted_fixtures.is_empty());
        assert!(failed.apply_outcome.is_fault());
    }

    #[test]
    fn test_outcome_serialization_names() {
        let json = serde_json::to_string(&ApplyOutcome::SkippedAllOff).unwrap();
        assert_eq!(json, "\"skipped_all_off\"");
        let json = serde_json::to_string(&Mode::Transition).unwrap();
        assert_eq!(json, "\"transition\"");
    }
}
