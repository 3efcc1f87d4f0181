//! Environmental signal: where the sun is right now.
//!
//! The coordinator reads one value per cycle through [`ElevationSource`].
//! Sources may legitimately have nothing to report (no coordinates
//! configured, calculation failure), in which case the cycle degrades to
//! [`UNAVAILABLE_ELEVATION`] instead of failing.

pub mod solar;

use chrono::Utc;

use crate::config::Settings;
use crate::constants::UNAVAILABLE_ELEVATION;
use crate::logger::Log;

/// Provider of the current sun elevation in degrees.
#[cfg_attr(test, mockall::automock)]
pub trait ElevationSource: Send + Sync {
    /// Current elevation, or `None` when the signal is unavailable.
    fn elevation(&self) -> Option<f64>;

    fn describe(&self) -> String;
}

/// Elevation computed from geographic coordinates and the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SolarElevation {
    pub latitude: f64,
    pub longitude: f64,
}

impl ElevationSource for SolarElevation {
    fn elevation(&self) -> Option<f64> {
        match solar::solar_elevation(self.latitude, self.longitude, Utc::now()) {
            Ok(elevation) => Some(elevation),
            Err(e) => {
                Log::log_warning(&format!("Solar elevation unavailable: {}", e));
                None
            }
        }
    }

    fn describe(&self) -> String {
        let lat_dir = if self.latitude >= 0.0 { "N" } else { "S" };
        let lon_dir = if self.longitude >= 0.0 { "E" } else { "W" };
        format!(
            "solar position at {:.4}°{}, {:.4}°{}",
            self.latitude.abs(),
            lat_dir,
            self.longitude.abs(),
            lon_dir
        )
    }
}

/// A constant elevation, or a permanently unavailable signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedElevation(pub Option<f64>);

impl ElevationSource for FixedElevation {
    fn elevation(&self) -> Option<f64> {
        self.0
    }

    fn describe(&self) -> String {
        match self.0 {
            Some(elevation) => format!("fixed elevation {:.2}°", elevation),
            None => "no elevation source (defaulting to 0°)".to_string(),
        }
    }
}

/// Read the source, substituting the default for a missing or non-finite value.
pub fn read_elevation(source: &dyn ElevationSource) -> f64 {
    match source.elevation() {
        Some(elevation) if elevation.is_finite() => elevation,
        _ => UNAVAILABLE_ELEVATION,
    }
}

/// Pick the elevation source described by the settings.
///
/// A fixed override wins over coordinates; with neither, the signal is
/// unavailable.
pub fn create_source(settings: &Settings) -> Box<dyn ElevationSource> {
    if let Some(fixed) = settings.fixed_elevation {
        return Box::new(FixedElevation(Some(fixed)));
    }
    match (settings.latitude, settings.longitude) {
        (Some(latitude), Some(longitude)) => Box::new(SolarElevation {
            latitude,
            longitude,
        }),
        _ => Box::new(FixedElevation(None)),
    }
}
