//! Solar position calculations.
//!
//! The elevation angle is computed with the low-precision solar coordinates
//! from the Astronomical Almanac (good to about 0.01° between 1950 and 2050),
//! which is plenty for driving fixture setpoints. Sunrise and sunset for the
//! status view come from the `sunrise` crate.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use sunrise::{Coordinates, DawnType, SolarDay, SolarEvent};

/// Julian date of the J2000.0 epoch.
const J2000: f64 = 2_451_545.0;
/// Julian date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Reject coordinates outside the valid ranges.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        anyhow::bail!(
            "Invalid latitude: {}. Must be between -90 and 90 degrees",
            latitude
        );
    }
    if !(-180.0..=180.0).contains(&longitude) {
        anyhow::bail!(
            "Invalid longitude: {}. Must be between -180 and 180 degrees",
            longitude
        );
    }
    Ok(())
}

/// Sun elevation above the horizon in degrees at `at` for the given location.
///
/// Negative values mean the sun is below the horizon. Atmospheric refraction
/// is not modelled.
pub fn solar_elevation(latitude: f64, longitude: f64, at: DateTime<Utc>) -> Result<f64> {
    validate_coordinates(latitude, longitude)?;

    let unix_seconds = at.timestamp() as f64 + f64::from(at.timestamp_subsec_millis()) / 1000.0;
    let days = unix_seconds / 86_400.0 + UNIX_EPOCH_JD - J2000;

    // Ecliptic coordinates of the sun
    let mean_longitude = (280.460 + 0.985_647_4 * days).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.985_600_3 * days).rem_euclid(360.0).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * days).to_radians();

    // Equatorial coordinates
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();
    let right_ascension = (obliquity.cos() * ecliptic_longitude.sin())
        .atan2(ecliptic_longitude.cos())
        .to_degrees();

    // Local hour angle from Greenwich mean sidereal time
    let gmst_hours = (18.697_374_558 + 24.065_709_824_419_08 * days).rem_euclid(24.0);
    let hour_angle = (gmst_hours * 15.0 + longitude - right_ascension).to_radians();

    let lat = latitude.to_radians();
    let sin_elevation =
        lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();

    Ok(sin_elevation.clamp(-1.0, 1.0).asin().to_degrees())
}

/// Sunrise, sunset, and civil dusk for a date, in local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub civil_dawn: DateTime<Local>,
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
    pub civil_dusk: DateTime<Local>,
}

/// Sun event times for display in the status view.
pub fn sun_times(latitude: f64, longitude: f64, date: NaiveDate) -> Result<SunTimes> {
    validate_coordinates(latitude, longitude)?;

    let coord = Coordinates::new(latitude, longitude)
        .ok_or_else(|| anyhow::anyhow!("Failed to create coordinates"))?;
    let solar_day = SolarDay::new(coord, date);

    Ok(SunTimes {
        civil_dawn: solar_day
            .event_time(SolarEvent::Dawn(DawnType::Civil))
            .with_timezone(&Local),
        sunrise: solar_day
            .event_time(SolarEvent::Sunrise)
            .with_timezone(&Local),
        sunset: solar_day.event_time(SolarEvent::Sunset).with_timezone(&Local),
        civil_dusk: solar_day
            .event_time(SolarEvent::Dusk(DawnType::Civil))
            .with_timezone(&Local),
    })
}
