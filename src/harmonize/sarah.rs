//! Shapes the PVGIS satellite series like the other sources.

use chrono_tz::Tz;
use polars::prelude::*;

use crate::harmonize::calendar::utc_to_local_wall;
use crate::harmonize::error::HarmonizeError;
use crate::types::schema;

/// Completes a satellite plane-of-array table and moves it to wall time.
///
/// PVGIS reports the three plane-of-array components separately; the
/// totals are summed here so the table carries the same irradiance
/// columns as the derived sources.
pub fn format_satellite_hourly(df: DataFrame, timezone: Tz) -> Result<DataFrame, HarmonizeError> {
    for required in [
        schema::TIME,
        schema::POA_DIRECT,
        schema::POA_SKY_DIFFUSE,
        schema::POA_GROUND_DIFFUSE,
    ] {
        if df.column(required).is_err() {
            return Err(HarmonizeError::MissingColumn(required.to_string()));
        }
    }

    let summed = df
        .lazy()
        .with_columns([
            (col(schema::POA_DIRECT)
                + col(schema::POA_GROUND_DIFFUSE)
                + col(schema::POA_SKY_DIFFUSE))
            .alias(schema::POA_GLOBAL),
            (col(schema::POA_GROUND_DIFFUSE) + col(schema::POA_SKY_DIFFUSE))
                .alias(schema::POA_DIFFUSE),
        ])
        .collect()?;
    utc_to_local_wall(summed, timezone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn wall(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn satellite_frame(times: &[NaiveDateTime], direct: &[Option<f64>]) -> DataFrame {
        let ms: Vec<i64> = times.iter().map(|t| t.and_utc().timestamp_millis()).collect();
        let time = Series::new(PlSmallStr::from_str(schema::TIME), ms)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let sky: Vec<Option<f64>> = direct.iter().map(|v| v.map(|_| 40.0)).collect();
        let ground: Vec<Option<f64>> = direct.iter().map(|v| v.map(|_| 10.0)).collect();
        DataFrame::new(vec![
            time.into_column(),
            Series::new(PlSmallStr::from_str(schema::POA_DIRECT), direct.to_vec()).into_column(),
            Series::new(PlSmallStr::from_str(schema::POA_SKY_DIFFUSE), sky).into_column(),
            Series::new(PlSmallStr::from_str(schema::POA_GROUND_DIFFUSE), ground).into_column(),
        ])
        .unwrap()
    }

    fn float_at(df: &DataFrame, name: &str, row: usize) -> Option<f64> {
        df.column(name).unwrap().f64().unwrap().get(row)
    }

    #[test]
    fn sums_the_component_columns() -> Result<(), HarmonizeError> {
        let df = satellite_frame(&[wall(2021, 6, 1, 12, 0)], &[Some(500.0)]);
        let formatted = format_satellite_hourly(df, Tz::UTC)?;

        assert_eq!(
            float_at(&formatted, schema::POA_GLOBAL, 0),
            Some(500.0 + 10.0 + 40.0)
        );
        assert_eq!(float_at(&formatted, schema::POA_DIFFUSE, 0), Some(50.0));
        Ok(())
    }

    #[test]
    fn shifts_timestamps_to_wall_time() -> Result<(), HarmonizeError> {
        let tz: Tz = "Europe/Paris".parse().unwrap();
        let df = satellite_frame(&[wall(2021, 1, 15, 12, 0)], &[Some(100.0)]);
        let formatted = format_satellite_hourly(df, tz)?;

        let times = formatted.column(schema::TIME)?.datetime()?;
        assert_eq!(
            times.get(0),
            Some(wall(2021, 1, 15, 13, 0).and_utc().timestamp_millis())
        );
        Ok(())
    }

    #[test]
    fn null_components_stay_null() -> Result<(), HarmonizeError> {
        let df = satellite_frame(&[wall(2021, 6, 1, 12, 0)], &[None]);
        let formatted = format_satellite_hourly(df, Tz::UTC)?;

        assert_eq!(float_at(&formatted, schema::POA_GLOBAL, 0), None);
        assert_eq!(float_at(&formatted, schema::POA_DIFFUSE, 0), None);
        Ok(())
    }

    #[test]
    fn missing_component_is_an_error() {
        let time = Series::new(PlSmallStr::from_str(schema::TIME), vec![0i64])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let df = DataFrame::new(vec![time.into_column()]).unwrap();

        let result = format_satellite_hourly(df, Tz::UTC);
        assert!(matches!(result, Err(HarmonizeError::MissingColumn(_))));
    }
}
