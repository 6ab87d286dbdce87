//! Solar geometry from the NOAA solar calculator algorithm.
//!
//! The low-accuracy NOAA equations (fractional year, equation of time,
//! declination series) are plenty for irradiance work: they stay within about
//! 0.1° of ephemeris positions, far below the uncertainty of any of the
//! irradiance sources this crate handles.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

/// Sun position for one location and instant, all angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    /// Angle between the sun and the local vertical (0° = overhead).
    pub zenith_deg: f64,
    /// Angle between the sun and the horizon; negative once the sun sets.
    pub elevation_deg: f64,
    /// Compass direction of the sun, clockwise from North (180° = South).
    pub azimuth_deg: f64,
}

impl SolarPosition {
    pub fn is_above_horizon(&self) -> bool {
        self.elevation_deg > 0.0
    }
}

/// Computes the sun position for a UTC instant at the given coordinates.
///
/// Latitude is positive north, longitude positive east, both in degrees.
pub fn solar_position(time: DateTime<Utc>, latitude_deg: f64, longitude_deg: f64) -> SolarPosition {
    let day_of_year = f64::from(time.ordinal());
    let days_in_year = if NaiveDate::from_ymd_opt(time.year(), 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    let hour = f64::from(time.hour())
        + f64::from(time.minute()) / 60.0
        + f64::from(time.second()) / 3600.0;

    // Fractional year, radians.
    let gamma = 2.0 * PI * (day_of_year - 1.0 + (hour - 12.0) / 24.0) / days_in_year;

    // Equation of time, minutes.
    let eqtime_minutes = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    // Solar declination, radians.
    let decl_rad = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    // True solar time in minutes; the timezone term is zero because the
    // input instant is already UTC.
    let time_offset_minutes = eqtime_minutes + 4.0 * longitude_deg;
    let tst_minutes = hour * 60.0 + time_offset_minutes;

    // Solar hour angle, degrees.
    let ha_deg = tst_minutes / 4.0 - 180.0;

    let lat_rad = latitude_deg.to_radians();
    let ha_rad = ha_deg.to_radians();

    let cos_zenith = lat_rad.sin() * decl_rad.sin() + lat_rad.cos() * decl_rad.cos() * ha_rad.cos();
    let zenith_deg = cos_zenith.clamp(-1.0, 1.0).acos().to_degrees();
    let elevation_deg = 90.0 - zenith_deg;

    // Azimuth measured from South (positive toward West), then rotated to the
    // compass convention. The atan2 form stays defined at the poles and when
    // the sun passes overhead.
    let south_az_rad = ha_rad
        .sin()
        .atan2(ha_rad.cos() * lat_rad.sin() - decl_rad.tan() * lat_rad.cos());
    let mut azimuth_deg = (south_az_rad.to_degrees() + 180.0) % 360.0;
    if azimuth_deg < 0.0 {
        azimuth_deg += 360.0;
    }

    SolarPosition {
        zenith_deg,
        elevation_deg,
        azimuth_deg,
    }
}
