//! Turns downloaded ERA5-Land NetCDF files into two-column DataFrames.
//!
//! Reading requires the `netcdf` cargo feature; without it the open call
//! reports [`ReanalysisError::NetcdfDisabled`] so the rest of the pipeline
//! stays usable for sources that never touch NetCDF.

use std::path::Path;

#[cfg(any(feature = "netcdf", test))]
use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::reanalysis::error::ReanalysisError;
use crate::types::data_source::ReanalysisVariable;
use crate::types::schema;

/// Combines the two ERA5 experiment streams into one series.
///
/// Recent months of ERA5 come from the preliminary stream (`expver = 5`)
/// while the consolidated stream (`expver = 1`) lags a few months behind.
/// Rows take the preferred value where present and fall back otherwise; the
/// result covers the union of both time axes in ascending order.
pub fn merge_experiment_versions(
    preferred: DataFrame,
    fallback: DataFrame,
    value_column: &str,
) -> Result<DataFrame, ReanalysisError> {
    let merged = concat([preferred.lazy(), fallback.lazy()], UnionArgs::default())?
        .group_by_stable([col(schema::TIME)])
        .agg([col(value_column).drop_nulls().first()])
        .sort([schema::TIME], Default::default())
        .collect()?;
    Ok(merged)
}

/// Parses a CF `units` attribute such as `"hours since 1900-01-01 00:00:00.0"`
/// into the epoch offset (ms) and the step size (ms) of one unit.
#[cfg(any(feature = "netcdf", test))]
pub(crate) fn parse_time_units(units: &str) -> Option<(i64, i64)> {
    let (unit, base) = units.split_once(" since ")?;
    let step_ms: i64 = match unit.trim() {
        "seconds" | "second" => 1_000,
        "minutes" | "minute" => 60 * 1_000,
        "hours" | "hour" => 3_600 * 1_000,
        "days" | "day" => 86_400 * 1_000,
        _ => return None,
    };

    let base = base.trim();
    let base_naive = NaiveDateTime::parse_from_str(base, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(base, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .ok()?;
    Some((base_naive.and_utc().timestamp_millis(), step_ms))
}

/// Reads one variable from an ERA5-Land NetCDF file as a `[time, <column>]`
/// frame, applying packing attributes and merging experiment versions when
/// the file carries both.
#[cfg(feature = "netcdf")]
pub fn read_variable_frame(
    path: &Path,
    variable: ReanalysisVariable,
) -> Result<DataFrame, ReanalysisError> {
    let file =
        netcdf::open(path).map_err(|e| ReanalysisError::NetcdfOpen(path.to_path_buf(), e))?;
    let var = file
        .variable(variable.short_name())
        .ok_or_else(|| ReanalysisError::MissingVariable {
            path: path.to_path_buf(),
            variable: variable.short_name().to_string(),
        })?;

    let time_ms = read_time_axis(&file, path)?;
    let values = read_scaled_values(&var, path, variable)?;

    let experiment_count = var
        .dimensions()
        .iter()
        .find(|d| d.name() == "expver")
        .map(|d| d.len())
        .unwrap_or(1);

    if time_ms.len() * experiment_count != values.len() {
        return Err(ReanalysisError::TimeAxis {
            path: path.to_path_buf(),
            reason: format!(
                "{} values do not divide into {} timestamps",
                values.len(),
                time_ms.len()
            ),
        });
    }

    let column = variable.short_name();
    if experiment_count == 1 {
        return variable_frame(&time_ms, values, column);
    }

    // Dimension order is (time, expver, ...); slot t*E+e holds timestamp t
    // of experiment e.
    let preferred_index = preferred_experiment_index(&file, experiment_count);
    let slice = |index: usize| -> Vec<Option<f64>> {
        (0..time_ms.len())
            .map(|t| values[t * experiment_count + index])
            .collect()
    };

    let preferred = variable_frame(&time_ms, slice(preferred_index), column)?;
    let mut merged = preferred;
    for index in (0..experiment_count).filter(|&i| i != preferred_index) {
        let fallback = variable_frame(&time_ms, slice(index), column)?;
        merged = merge_experiment_versions(merged, fallback, column)?;
    }
    Ok(merged)
}

#[cfg(not(feature = "netcdf"))]
pub fn read_variable_frame(
    path: &Path,
    _variable: ReanalysisVariable,
) -> Result<DataFrame, ReanalysisError> {
    Err(ReanalysisError::NetcdfDisabled(path.to_path_buf()))
}

#[cfg(feature = "netcdf")]
fn read_time_axis(file: &netcdf::File, path: &Path) -> Result<Vec<i64>, ReanalysisError> {
    for name in ["time", "valid_time"] {
        let Some(var) = file.variable(name) else {
            continue;
        };
        let units = attribute_str(&var, "units").ok_or_else(|| ReanalysisError::TimeAxis {
            path: path.to_path_buf(),
            reason: format!("coordinate '{name}' has no units attribute"),
        })?;
        let (base_ms, step_ms) =
            parse_time_units(&units).ok_or_else(|| ReanalysisError::TimeAxis {
                path: path.to_path_buf(),
                reason: format!("unsupported units '{units}'"),
            })?;
        let raw: Vec<f64> = var
            .get_values(..)
            .map_err(|e| ReanalysisError::NetcdfRead {
                path: path.to_path_buf(),
                variable: name.to_string(),
                source: e,
            })?;
        return Ok(raw
            .into_iter()
            .map(|v| base_ms + (v * step_ms as f64).round() as i64)
            .collect());
    }
    Err(ReanalysisError::TimeAxis {
        path: path.to_path_buf(),
        reason: "no 'time' or 'valid_time' coordinate found".to_string(),
    })
}

#[cfg(feature = "netcdf")]
fn read_scaled_values(
    var: &netcdf::Variable,
    path: &Path,
    variable: ReanalysisVariable,
) -> Result<Vec<Option<f64>>, ReanalysisError> {
    let scale = attribute_f64(var, "scale_factor").unwrap_or(1.0);
    let offset = attribute_f64(var, "add_offset").unwrap_or(0.0);
    let fill = attribute_f64(var, "_FillValue").or_else(|| attribute_f64(var, "missing_value"));

    let raw: Vec<f64> = var
        .get_values(..)
        .map_err(|e| ReanalysisError::NetcdfRead {
            path: path.to_path_buf(),
            variable: variable.short_name().to_string(),
            source: e,
        })?;

    Ok(raw
        .into_iter()
        .map(|v| {
            if !v.is_finite() || fill.is_some_and(|f| v == f) {
                None
            } else {
                Some(v * scale + offset)
            }
        })
        .collect())
}

#[cfg(feature = "netcdf")]
fn preferred_experiment_index(file: &netcdf::File, experiment_count: usize) -> usize {
    // The consolidated stream is labeled 1; default to the first slot when
    // the coordinate is missing or does not mention it.
    file.variable("expver")
        .and_then(|var| var.get_values::<f64, _>(..).ok())
        .and_then(|labels| labels.iter().position(|&v| v == 1.0))
        .filter(|&i| i < experiment_count)
        .unwrap_or(0)
}

#[cfg(feature = "netcdf")]
fn attribute_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            _ => None,
        })
}

#[cfg(feature = "netcdf")]
fn attribute_str(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}

#[cfg(feature = "netcdf")]
fn variable_frame(
    time_ms: &[i64],
    values: Vec<Option<f64>>,
    column: &str,
) -> Result<DataFrame, ReanalysisError> {
    let time = Series::new(PlSmallStr::from_str(schema::TIME), time_ms.to_vec())
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let data = Series::new(PlSmallStr::from_str(column), values);
    Ok(DataFrame::new(vec![time.into_column(), data.into_column()])?)
}
