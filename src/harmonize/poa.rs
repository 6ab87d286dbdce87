//! Derives the plane-of-array irradiance family shared by all sources.
//!
//! Reanalysis only reports global horizontal irradiance, the typical
//! year adds beam and diffuse, and the clear-sky model starts from
//! nothing but geometry. Each path below ends at the same column set so
//! the harmonized tables line up regardless of where the data came from.

use chrono::{DateTime, Datelike};
use polars::prelude::*;

use crate::harmonize::calendar::{half_hour_slots, local_wall_to_utc};
use crate::harmonize::error::HarmonizeError;
use crate::solar::irradiance::{
    clearsky_irradiance, disc_dni, isotropic_poa, PoaIrradiance, DEFAULT_ALBEDO,
};
use crate::solar::position::{solar_position, SolarPosition};
use crate::types::location::GeoLocation;
use crate::types::schema;

/// Collector geometry every source is transposed onto: a horizontal
/// plane, nominally facing the equator.
pub const SURFACE_TILT_DEG: f64 = 0.0;
pub const SURFACE_AZIMUTH_DEG: f64 = 180.0;

/// Expands a single-variable irradiance table into the full column set.
///
/// The input must hold exactly one data column next to the time axis;
/// it is taken as global horizontal irradiance. Beam and diffuse parts
/// are estimated per row, then everything is transposed onto the
/// collector plane. Timestamps must be UTC.
pub fn derive_solar_components(
    df: DataFrame,
    latitude: f64,
    longitude: f64,
) -> Result<DataFrame, HarmonizeError> {
    let ghi_only = rename_single_data_column(df)?;
    let with_beam = split_beam_components(ghi_only, latitude, longitude)?;
    transpose_to_plane(with_beam, latitude, longitude)
}

/// Transposes a table that already carries `ghi`, `dni` and `dhi` onto
/// the collector plane, appending the plane-of-array columns and the
/// solar elevation. All other columns pass through untouched.
pub fn transpose_to_plane(
    df: DataFrame,
    latitude: f64,
    longitude: f64,
) -> Result<DataFrame, HarmonizeError> {
    let time_ms = time_column_ms(&df)?;
    let ghi = float_column(&df, schema::GHI)?;
    let dni = float_column(&df, schema::DNI)?;
    let dhi = float_column(&df, schema::DHI)?;

    let rows = df.height();
    let mut global = Vec::with_capacity(rows);
    let mut direct = Vec::with_capacity(rows);
    let mut diffuse = Vec::with_capacity(rows);
    let mut sky = Vec::with_capacity(rows);
    let mut ground = Vec::with_capacity(rows);
    let mut elevation = Vec::with_capacity(rows);

    for row in 0..rows {
        let Some(utc) = time_ms[row].and_then(DateTime::from_timestamp_millis) else {
            global.push(None);
            direct.push(None);
            diffuse.push(None);
            sky.push(None);
            ground.push(None);
            elevation.push(None);
            continue;
        };
        let position = solar_position(utc, latitude, longitude);
        elevation.push(Some(position.elevation_deg));
        match (ghi[row], dni[row], dhi[row]) {
            (Some(g), Some(b), Some(d)) => {
                let poa = plane_irradiance(&position, g, b, d);
                global.push(Some(poa.global()));
                direct.push(Some(poa.direct));
                diffuse.push(Some(poa.diffuse()));
                sky.push(Some(poa.sky_diffuse));
                ground.push(Some(poa.ground_diffuse));
            }
            _ => {
                global.push(None);
                direct.push(None);
                diffuse.push(None);
                sky.push(None);
                ground.push(None);
            }
        }
    }

    let df = df.hstack(&[
        float_series(schema::POA_GLOBAL, global),
        float_series(schema::POA_DIRECT, direct),
        float_series(schema::POA_DIFFUSE, diffuse),
        float_series(schema::POA_SKY_DIFFUSE, sky),
        float_series(schema::POA_GROUND_DIFFUSE, ground),
        float_series(schema::SOLAR_ELEVATION, elevation),
    ])?;
    Ok(df)
}

/// Synthesizes a full clear-sky weather table on the half-hourly
/// calendar of `year`, already in site-local wall time.
///
/// Wall times skipped by a spring-forward transition have no instant to
/// evaluate the sky at; their rows come out null and are filled when
/// the table is aligned to the calendar.
pub fn clearsky_weather_frame(
    location: &GeoLocation,
    year: i32,
) -> Result<DataFrame, HarmonizeError> {
    let slots = half_hour_slots(year)?;

    let rows = slots.len();
    let mut time_ms = Vec::with_capacity(rows);
    let mut ghi = Vec::with_capacity(rows);
    let mut dni = Vec::with_capacity(rows);
    let mut dhi = Vec::with_capacity(rows);
    let mut global = Vec::with_capacity(rows);
    let mut direct = Vec::with_capacity(rows);
    let mut diffuse = Vec::with_capacity(rows);
    let mut sky_diffuse = Vec::with_capacity(rows);
    let mut ground_diffuse = Vec::with_capacity(rows);
    let mut elevation = Vec::with_capacity(rows);

    for slot in slots {
        time_ms.push(slot.and_utc().timestamp_millis());
        match local_wall_to_utc(slot, location.timezone) {
            Some(utc) => {
                let position = solar_position(utc, location.latitude, location.longitude);
                let sky = clearsky_irradiance(position.zenith_deg);
                let poa = plane_irradiance(&position, sky.ghi, sky.dni, sky.dhi);
                ghi.push(Some(sky.ghi));
                dni.push(Some(sky.dni));
                dhi.push(Some(sky.dhi));
                global.push(Some(poa.global()));
                direct.push(Some(poa.direct));
                diffuse.push(Some(poa.diffuse()));
                sky_diffuse.push(Some(poa.sky_diffuse));
                ground_diffuse.push(Some(poa.ground_diffuse));
                elevation.push(Some(position.elevation_deg));
            }
            None => {
                ghi.push(None);
                dni.push(None);
                dhi.push(None);
                global.push(None);
                direct.push(None);
                diffuse.push(None);
                sky_diffuse.push(None);
                ground_diffuse.push(None);
                elevation.push(None);
            }
        }
    }

    let time = Series::new(PlSmallStr::from_str(schema::TIME), time_ms)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let df = DataFrame::new(vec![
        time.into_column(),
        float_series(schema::GHI, ghi),
        float_series(schema::DNI, dni),
        float_series(schema::DHI, dhi),
        float_series(schema::POA_GLOBAL, global),
        float_series(schema::POA_DIRECT, direct),
        float_series(schema::POA_DIFFUSE, diffuse),
        float_series(schema::POA_SKY_DIFFUSE, sky_diffuse),
        float_series(schema::POA_GROUND_DIFFUSE, ground_diffuse),
        float_series(schema::SOLAR_ELEVATION, elevation),
    ])?;
    Ok(df)
}

fn plane_irradiance(position: &SolarPosition, ghi: f64, dni: f64, dhi: f64) -> PoaIrradiance {
    isotropic_poa(
        SURFACE_TILT_DEG,
        SURFACE_AZIMUTH_DEG,
        position,
        ghi,
        dni,
        dhi,
        DEFAULT_ALBEDO,
    )
}

fn rename_single_data_column(df: DataFrame) -> Result<DataFrame, HarmonizeError> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if !names.iter().any(|name| name == schema::TIME) {
        return Err(HarmonizeError::MissingColumn(schema::TIME.to_string()));
    }
    let data_columns: Vec<String> = names
        .into_iter()
        .filter(|name| name != schema::TIME)
        .collect();
    let [source] = data_columns.as_slice() else {
        return Err(HarmonizeError::AmbiguousDataColumn {
            time: schema::TIME.to_string(),
            found: data_columns,
        });
    };

    let renamed = df
        .lazy()
        .select([
            col(schema::TIME),
            col(source.as_str()).alias(schema::GHI),
        ])
        .collect()?;
    Ok(renamed)
}

/// Splits global horizontal irradiance into beam and diffuse parts row
/// by row. The beam estimate feeds back into `dhi = ghi - dni cos(z)`.
fn split_beam_components(
    df: DataFrame,
    latitude: f64,
    longitude: f64,
) -> Result<DataFrame, HarmonizeError> {
    let time_ms = time_column_ms(&df)?;
    let ghi = float_column(&df, schema::GHI)?;

    let rows = df.height();
    let mut dni = Vec::with_capacity(rows);
    let mut dhi = Vec::with_capacity(rows);
    for row in 0..rows {
        let instant = time_ms[row].and_then(DateTime::from_timestamp_millis);
        match (instant, ghi[row]) {
            (Some(utc), Some(g)) => {
                let position = solar_position(utc, latitude, longitude);
                let beam = disc_dni(g, position.zenith_deg, utc.ordinal());
                dni.push(Some(beam));
                dhi.push(Some(g - beam * position.zenith_deg.to_radians().cos()));
            }
            _ => {
                dni.push(None);
                dhi.push(None);
            }
        }
    }

    let df = df.hstack(&[
        float_series(schema::DNI, dni),
        float_series(schema::DHI, dhi),
    ])?;
    Ok(df)
}

fn time_column_ms(df: &DataFrame) -> Result<Vec<Option<i64>>, HarmonizeError> {
    let series = df
        .column(schema::TIME)
        .map_err(|_| HarmonizeError::MissingColumn(schema::TIME.to_string()))?;
    Ok(series.datetime()?.into_iter().collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, HarmonizeError> {
    let series = df
        .column(name)
        .map_err(|_| HarmonizeError::MissingColumn(name.to_string()))?;
    Ok(series.f64()?.into_iter().collect())
}

fn float_series(name: &str, values: Vec<Option<f64>>) -> Column {
    Series::new(PlSmallStr::from_str(name), values).into_column()
}
