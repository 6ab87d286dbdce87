//! The half-hourly site calendar and alignment of raw samples onto it.
//!
//! Every source ends up on the same wall-clock grid: one slot every
//! thirty minutes from January 1st 00:00 through December 31st 23:30
//! of the simulation year. Sources that report hourly get their gaps
//! interpolated, sources with sub-hourly samples get averaged per slot.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use polars::prelude::*;

use crate::harmonize::error::HarmonizeError;
use crate::types::schema;
use crate::types::weather_frame::HALF_HOUR_MS;

/// Every half-hour wall-clock slot of the given year, in order.
///
/// The list covers the full year inclusively, so a regular year yields
/// 17520 entries and a leap year 17568.
pub fn half_hour_slots(year: i32) -> Result<Vec<NaiveDateTime>, HarmonizeError> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(HarmonizeError::InvalidYear(year))?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 30, 0))
        .ok_or(HarmonizeError::InvalidYear(year))?;

    let mut slots = Vec::with_capacity(366 * 48);
    let mut current = start;
    while current <= end {
        slots.push(current);
        current += Duration::minutes(30);
    }
    Ok(slots)
}

/// A single-column frame holding the half-hourly calendar of `year`.
pub fn calendar_frame(year: i32) -> Result<DataFrame, HarmonizeError> {
    let slot_ms: Vec<i64> = half_hour_slots(year)?
        .iter()
        .map(|slot| slot.and_utc().timestamp_millis())
        .collect();
    let time = Series::new(PlSmallStr::from_str(schema::TIME), slot_ms)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(DataFrame::new(vec![time.into_column()])?)
}

/// Aligns a raw weather table onto the half-hourly calendar of `year`.
///
/// Samples are first snapped down to their half-hour slot and averaged
/// per slot, then left-joined against the full calendar. Slots the
/// source never covered are filled by linear interpolation, with the
/// leading and trailing edges padded from the nearest sample.
pub fn normalize_to_calendar(df: DataFrame, year: i32) -> Result<DataFrame, HarmonizeError> {
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

    let slot_ms = col(schema::TIME).cast(DataType::Int64);
    // Euclidean remainder so pre-epoch timestamps still snap downwards.
    let remainder =
        (slot_ms.clone() % lit(HALF_HOUR_MS) + lit(HALF_HOUR_MS)) % lit(HALF_HOUR_MS);
    let bucket = (slot_ms - remainder)
        .cast(DataType::Datetime(TimeUnit::Milliseconds, None))
        .alias(schema::TIME);

    let means: Vec<Expr> = data_columns
        .iter()
        .map(|name| col(name.as_str()).mean())
        .collect();
    let bucketed = df
        .lazy()
        .with_column(bucket)
        .group_by_stable([col(schema::TIME)])
        .agg(means);

    let filled: Vec<Expr> = data_columns
        .iter()
        .map(|name| {
            col(name.as_str())
                .interpolate(InterpolationMethod::Linear)
                .forward_fill(None)
                .backward_fill(None)
        })
        .collect();

    let aligned = calendar_frame(year)?
        .lazy()
        .left_join(bucketed, col(schema::TIME), col(schema::TIME))
        .with_columns(filled)
        .collect()?;
    Ok(aligned)
}

/// Rewrites the frame's UTC timestamps as wall time in `timezone`.
///
/// The column stays a naive datetime; only the instant each row points
/// at changes. Null timestamps stay null.
pub fn utc_to_local_wall(df: DataFrame, timezone: Tz) -> Result<DataFrame, HarmonizeError> {
    let time = df
        .column(schema::TIME)
        .map_err(|_| HarmonizeError::MissingColumn(schema::TIME.to_string()))?;
    let shifted: Vec<Option<i64>> = time
        .datetime()?
        .into_iter()
        .map(|slot| {
            slot.and_then(DateTime::from_timestamp_millis).map(|utc| {
                timezone
                    .from_utc_datetime(&utc.naive_utc())
                    .naive_local()
                    .and_utc()
                    .timestamp_millis()
            })
        })
        .collect();
    let series = Series::new(PlSmallStr::from_str(schema::TIME), shifted)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut df = df;
    df.replace(schema::TIME, series)?;
    Ok(df)
}

/// Resolves a wall-clock time in `timezone` to the UTC instant it names.
///
/// Ambiguous times (the repeated hour when clocks fall back) resolve to
/// the earlier instant. Times skipped by a spring-forward transition do
/// not exist and yield `None`.
pub fn local_wall_to_utc(wall: NaiveDateTime, timezone: Tz) -> Option<DateTime<Utc>> {
    timezone
        .from_local_datetime(&wall)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
