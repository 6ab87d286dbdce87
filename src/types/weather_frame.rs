//! Contains the `WeatherFrame` structure for lazy operations on harmonized
//! weather tables.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::{col, lit, DataFrame, Expr, LazyFrame, PolarsError};

use crate::types::schema;

/// Milliseconds in one half-hour calendar slot.
pub const HALF_HOUR_MS: i64 = 30 * 60 * 1000;

/// A wrapper around a Polars `LazyFrame` holding a harmonized weather table.
///
/// The table is indexed by the [`schema::TIME`] column: timezone-naive
/// millisecond datetimes expressing site-local wall time, one row per
/// half-hour slot of the simulation year. Methods return new `WeatherFrame`s
/// and keep evaluation lazy; call [`WeatherFrame::collect`] to materialize.
///
/// Instances are typically obtained via [`crate::SolarMet::weather_data`].
#[derive(Clone)]
pub struct WeatherFrame {
    /// The underlying Polars LazyFrame containing the weather data.
    pub frame: LazyFrame,
}

impl WeatherFrame {
    /// Wraps the given `LazyFrame`.
    ///
    /// The frame is assumed to carry a [`schema::TIME`] column of
    /// timezone-naive millisecond datetimes.
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Applies an arbitrary Polars predicate, returning a new `WeatherFrame`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use solarmet::{SolarMet, WeatherSource};
    /// use polars::prelude::{col, lit};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let solarmet: SolarMet = unimplemented!();
    /// let weather = solarmet.weather_data().call().await?;
    ///
    /// // Keep only the slots where the sun is up.
    /// let daylight = weather.filter(col("solar_elevation").gt(lit(0.0f64)));
    /// let df = daylight.frame.collect()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn filter(&self, predicate: Expr) -> WeatherFrame {
        WeatherFrame::new(self.frame.clone().filter(predicate))
    }

    /// Restricts the table to rows within `[start, end]` (inclusive), both
    /// expressed in site-local wall time.
    pub fn get_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> WeatherFrame {
        self.filter(
            col(schema::TIME)
                .gt_eq(lit(start))
                .and(col(schema::TIME).lt_eq(lit(end))),
        )
    }

    /// Restricts the table to the half-hour slot nearest to `datetime`.
    ///
    /// A time fifteen or more minutes past its slot rounds up to the next
    /// one. Collecting the result yields zero or one row.
    pub fn get_at(&self, datetime: NaiveDateTime) -> WeatherFrame {
        let ms = datetime.and_utc().timestamp_millis();
        let remainder = ms.rem_euclid(HALF_HOUR_MS);
        let mut slot_ms = ms - remainder;
        if remainder >= HALF_HOUR_MS / 2 {
            slot_ms += HALF_HOUR_MS;
        }
        match DateTime::from_timestamp_millis(slot_ms) {
            Some(slot) => self.filter(col(schema::TIME).eq(lit(slot.naive_utc()))),
            // Unreachable for datetimes chrono can represent; an empty
            // selection is the sane answer if it ever happens.
            None => self.filter(lit(false)),
        }
    }

    /// Runs the lazy plan and returns the materialized table.
    pub fn collect(self) -> Result<DataFrame, PolarsError> {
        self.frame.collect()
    }
}
