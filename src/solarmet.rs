//! This module provides the main entry point for downloading site weather
//! data. It harmonizes four very different sources, from typical
//! meteorological years to raw reanalysis archives, into one half-hourly
//! table per site and simulation year.

use std::path::PathBuf;

use bon::bon;
use log::info;
use polars::prelude::*;
use tempfile::NamedTempFile;
use tokio::task;

use crate::error::SolarMetError;
use crate::harmonize::calendar::{normalize_to_calendar, utc_to_local_wall};
use crate::harmonize::poa::{
    clearsky_weather_frame, derive_solar_components, transpose_to_plane,
};
use crate::harmonize::sarah::format_satellite_hourly;
use crate::pvgis::seriescalc::PvgisSeriesCalcClient;
use crate::pvgis::tmy::PvgisTmyClient;
use crate::pvgis::PVGIS_BASE_URL;
use crate::reanalysis::archive::CdsArchiveClient;
use crate::reanalysis::config::CdsConfig;
use crate::reanalysis::extractor::ReanalysisExtractor;
use crate::types::data_source::WeatherSource;
use crate::types::location::GeoLocation;
use crate::types::schema;
use crate::types::weather_frame::WeatherFrame;
use crate::utils::{default_data_dir, ensure_dir_exists};

const WEATHER_DATA_DIR: &str = "weather_data";

/// The main client struct for producing harmonized weather tables.
///
/// For a fixed site and simulation year, this struct turns any of the
/// supported [`WeatherSource`]s into the same half-hourly table: one row per
/// half hour of site-local wall time, from January 1st 00:00 through
/// December 31st 23:30, with irradiance on the collector plane and, where the
/// source provides it, air temperature. Every produced table is also written
/// as a CSV file under `<saving_path>/weather_data/` so later runs can pick
/// it up without recomputing.
///
/// Create an instance with the builder. Only the location and the simulation
/// year are required; everything else has a sensible default.
///
/// # Examples
///
/// ```rust
/// # use solarmet::{GeoLocation, SolarMet, SolarMetError, WeatherSource};
/// # use chrono_tz::Tz;
/// # async fn run() -> Result<(), SolarMetError> {
/// let site = GeoLocation::new("Demo site", 52.414, -1.143, 90.6, Tz::Europe__London);
/// let client = SolarMet::builder()
///     .location(site)
///     .simulation_year(2021)
///     .source(WeatherSource::ClearskyModel)
///     .build()?;
///
/// let weather = client.weather_data().call().await?;
/// let table = weather.frame.collect()?;
/// assert_eq!(table.height(), 17520);
/// # Ok(())
/// # }
/// ```
pub struct SolarMet {
    location: GeoLocation,
    simulation_year: i32,
    source: WeatherSource,
    saving_path: PathBuf,
    cds_config: Option<CdsConfig>,
    pvgis_base_url: String,
    http: reqwest::Client,
}

#[bon]
impl SolarMet {
    /// Creates a new `SolarMet` client for one site and simulation year.
    ///
    /// Construction is cheap and touches neither the network nor the disk;
    /// directories are created lazily when data is first downloaded or saved.
    ///
    /// # Arguments
    ///
    /// * `.location(GeoLocation)`: **Required.** The site to produce weather
    ///   data for, including its IANA timezone.
    /// * `.simulation_year(i32)`: **Required.** The calendar year the output
    ///   table covers.
    /// * `.source(WeatherSource)`: Optional. The default source used when
    ///   [`SolarMet::weather_data`] is called without an override. Defaults
    ///   to [`WeatherSource::Reanalysis`].
    /// * `.saving_path(PathBuf)`: Optional. Root directory for downloads and
    ///   saved tables. Defaults to a `solarmet` folder in the OS cache
    ///   directory.
    /// * `.cds_config(CdsConfig)`: Optional. Credentials for the Climate Data
    ///   Store, required only when reanalysis files actually have to be
    ///   downloaded. Files already on disk are used as-is without it.
    /// * `.pvgis_base_url(String)`: Optional. Overrides the PVGIS endpoint,
    ///   mainly useful for pointing tests at a local server.
    ///
    /// # Errors
    ///
    /// Returns [`SolarMetError::DataDirResolution`] if no `saving_path` was
    /// given and the OS cache directory cannot be determined.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use solarmet::{CdsConfig, GeoLocation, SolarMet, SolarMetError};
    /// # use chrono_tz::Tz;
    /// # fn run() -> Result<(), SolarMetError> {
    /// let site = GeoLocation::new("Demo site", 52.414, -1.143, 90.6, Tz::Europe__London);
    /// let client = SolarMet::builder()
    ///     .location(site)
    ///     .simulation_year(2020)
    ///     .maybe_cds_config(CdsConfig::from_env().ok().flatten())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub fn new(
        location: GeoLocation,
        simulation_year: i32,
        source: Option<WeatherSource>,
        saving_path: Option<PathBuf>,
        cds_config: Option<CdsConfig>,
        pvgis_base_url: Option<String>,
    ) -> Result<Self, SolarMetError> {
        let saving_path = match saving_path {
            Some(path) => path,
            None => default_data_dir().map_err(SolarMetError::DataDirResolution)?,
        };
        Ok(Self {
            location,
            simulation_year,
            source: source.unwrap_or(WeatherSource::Reanalysis),
            saving_path,
            cds_config,
            pvgis_base_url: pvgis_base_url.unwrap_or_else(|| PVGIS_BASE_URL.to_string()),
            http: reqwest::Client::new(),
        })
    }

    /// Produces the harmonized weather table for the configured site and year.
    ///
    /// The raw series is fetched (or generated, for the clear-sky model),
    /// expanded to the full irradiance column set, moved to site-local wall
    /// time and aligned onto the half-hourly calendar. The finished table is
    /// saved as `Weather_data_<source>_<year>.csv` under
    /// `<saving_path>/weather_data/` and returned as a [`WeatherFrame`].
    ///
    /// This method uses a builder pattern.
    ///
    /// # Arguments
    ///
    /// * `.source(WeatherSource)`: Optional. Overrides the source configured
    ///   at construction for this one call.
    ///
    /// # Returns
    ///
    /// A [`WeatherFrame`] wrapping the harmonized table as a lazy frame. A
    /// regular year has 17520 rows, a leap year 17568.
    ///
    /// # Errors
    ///
    /// Returns [`SolarMetError::Reanalysis`] variants for archive download or
    /// NetCDF problems, [`SolarMetError::Provider`] variants for PVGIS
    /// failures, [`SolarMetError::Harmonize`] variants if the raw series
    /// cannot be aligned, and the save variants if writing the CSV fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use solarmet::{GeoLocation, SolarMet, SolarMetError, WeatherSource};
    /// # use chrono_tz::Tz;
    /// # async fn run() -> Result<(), SolarMetError> {
    /// # let site = GeoLocation::new("Demo site", 52.414, -1.143, 90.6, Tz::UTC);
    /// let client = SolarMet::builder()
    ///     .location(site)
    ///     .simulation_year(2021)
    ///     .build()?;
    ///
    /// // Clear-sky needs no credentials and no network at all.
    /// let weather = client
    ///     .weather_data()
    ///     .source(WeatherSource::ClearskyModel)
    ///     .call()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn weather_data(
        &self,
        source: Option<WeatherSource>,
    ) -> Result<WeatherFrame, SolarMetError> {
        let source = source.unwrap_or(self.source);
        info!(
            "Preparing {} weather data for {} ({})",
            source, self.location.name, self.simulation_year
        );

        let raw = match source {
            WeatherSource::TypicalYear => self.typical_year_frame().await?,
            WeatherSource::ClearskyModel => self.clearsky_frame()?,
            WeatherSource::Reanalysis => self.reanalysis_frame().await?,
            WeatherSource::SatelliteHourly => self.satellite_hourly_frame().await?,
        };

        let aligned = normalize_to_calendar(raw, self.simulation_year)?;
        let ordered = canonical_column_order(aligned)?;
        self.save_weather_data(source, ordered.clone()).await?;
        Ok(WeatherFrame::new(ordered.lazy()))
    }

    /// Typical meteorological year from PVGIS, remapped onto the simulation
    /// year and transposed onto the collector plane.
    async fn typical_year_frame(&self) -> Result<DataFrame, SolarMetError> {
        let client = PvgisTmyClient::with_base_url(self.http.clone(), &self.pvgis_base_url);
        let tmy = client
            .fetch(
                self.location.latitude,
                self.location.longitude,
                self.simulation_year,
            )
            .await?;
        let transposed =
            transpose_to_plane(tmy, self.location.latitude, self.location.longitude)?;
        Ok(utc_to_local_wall(transposed, self.location.timezone)?)
    }

    /// Synthetic cloud-free year, generated locally from solar geometry.
    fn clearsky_frame(&self) -> Result<DataFrame, SolarMetError> {
        Ok(clearsky_weather_frame(&self.location, self.simulation_year)?)
    }

    /// ERA5-Land radiation and temperature, downloaded once per year and
    /// expanded from global horizontal irradiance to the full column set.
    async fn reanalysis_frame(&self) -> Result<DataFrame, SolarMetError> {
        let client = self.cds_config.clone().map(CdsArchiveClient::new);
        let extractor = ReanalysisExtractor::new(&self.location, &self.saving_path, client);
        extractor.download_year(self.simulation_year).await?;

        let radiation = extractor.radiation_frame(self.simulation_year).await?;
        let temperature = extractor.temperature_frame(self.simulation_year).await?;

        let solar = derive_solar_components(
            radiation,
            self.location.latitude,
            self.location.longitude,
        )?;
        let with_temperature = attach_temperature(solar, temperature)?;
        Ok(utc_to_local_wall(with_temperature, self.location.timezone)?)
    }

    /// Satellite-derived hourly series from PVGIS, already on the collector
    /// plane.
    async fn satellite_hourly_frame(&self) -> Result<DataFrame, SolarMetError> {
        let client = PvgisSeriesCalcClient::with_base_url(self.http.clone(), &self.pvgis_base_url);
        let series = client
            .fetch(
                self.location.latitude,
                self.location.longitude,
                self.simulation_year,
            )
            .await?;
        Ok(format_satellite_hourly(series, self.location.timezone)?)
    }

    /// Writes the finished table as CSV, atomically via a sibling temp file.
    async fn save_weather_data(
        &self,
        source: WeatherSource,
        mut df: DataFrame,
    ) -> Result<PathBuf, SolarMetError> {
        let dir = self.saving_path.join(WEATHER_DATA_DIR);
        ensure_dir_exists(&dir)
            .await
            .map_err(|e| SolarMetError::DataDirCreation(dir.clone(), e))?;
        let path = dir.join(format!(
            "Weather_data_{}_{}.csv",
            source.path_segment(),
            self.simulation_year
        ));

        let target = path.clone();
        let written = task::spawn_blocking(move || {
            let mut temp_file =
                NamedTempFile::new_in(&dir).map_err(|e| SolarMetError::SaveIo(target.clone(), e))?;
            CsvWriter::new(temp_file.as_file_mut())
                .include_header(true)
                .finish(&mut df)
                .map_err(|e| SolarMetError::SavePolars(target.clone(), e))?;
            temp_file
                .persist(&target)
                .map_err(|e| SolarMetError::SaveIo(target.clone(), e.error))?;
            Ok::<PathBuf, SolarMetError>(target)
        })
        .await??;

        info!("Saved weather table to {:?}", written);
        Ok(written)
    }
}

/// Puts the table's columns into the harmonized vocabulary order, time first.
///
/// Sources supply different column subsets; the fixed order keeps returned
/// frames and saved files comparable across sources.
fn canonical_column_order(df: DataFrame) -> Result<DataFrame, SolarMetError> {
    let ordered: Vec<Expr> = schema::harmonized_columns()
        .into_iter()
        .filter(|name| df.column(name).is_ok())
        .map(col)
        .collect();
    Ok(df.lazy().select(ordered).collect()?)
}

/// Joins the temperature series onto the irradiance table by timestamp.
///
/// An empty temperature series, the normal case when the file was missing,
/// joins to an all-null column rather than failing.
fn attach_temperature(
    solar: DataFrame,
    temperature: DataFrame,
) -> Result<DataFrame, SolarMetError> {
    let joined = solar
        .lazy()
        .left_join(temperature.lazy(), col(schema::TIME), col(schema::TIME))
        .with_column(col(schema::AIR_TEMPERATURE).alias(schema::TEMP_AIR))
        .select([col("*").exclude([schema::AIR_TEMPERATURE])])
        .collect()?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use tempfile::tempdir;

    fn demo_location() -> GeoLocation {
        GeoLocation::new("Demo site", 52.414, -1.143, 90.6, Tz::UTC)
    }

    #[test]
    fn construction_touches_nothing_on_disk() -> Result<(), SolarMetError> {
        let dir = tempdir().unwrap();
        let _client = SolarMet::builder()
            .location(demo_location())
            .simulation_year(2021)
            .saving_path(dir.path().to_path_buf())
            .build()?;

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 0);
        Ok(())
    }

    #[tokio::test]
    async fn clearsky_year_is_harmonized_and_saved() -> Result<(), SolarMetError> {
        let dir = tempdir().unwrap();
        let client = SolarMet::builder()
            .location(demo_location())
            .simulation_year(2021)
            .source(WeatherSource::ClearskyModel)
            .saving_path(dir.path().to_path_buf())
            .build()?;

        let weather = client.weather_data().call().await?;
        let table = weather.frame.collect()?;

        assert_eq!(table.height(), 17520);
        for name in [
            schema::TIME,
            schema::GHI,
            schema::DNI,
            schema::DHI,
            schema::POA_GLOBAL,
            schema::POA_DIRECT,
            schema::POA_DIFFUSE,
            schema::POA_SKY_DIFFUSE,
            schema::POA_GROUND_DIFFUSE,
            schema::SOLAR_ELEVATION,
        ] {
            assert!(table.column(name).is_ok(), "missing {name}");
        }
        // No gaps anywhere in a fixed-offset zone.
        assert_eq!(table.column(schema::GHI).unwrap().null_count(), 0);

        let saved = dir
            .path()
            .join("weather_data")
            .join("Weather_data_clearsky_model_2021.csv");
        assert!(saved.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn output_columns_follow_the_canonical_order() -> Result<(), SolarMetError> {
        let dir = tempdir().unwrap();
        let client = SolarMet::builder()
            .location(demo_location())
            .simulation_year(2021)
            .source(WeatherSource::ClearskyModel)
            .saving_path(dir.path().to_path_buf())
            .build()?;

        let table = client.weather_data().call().await?.frame.collect()?;

        let names: Vec<String> = table
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(
            names,
            [
                schema::TIME,
                schema::GHI,
                schema::DNI,
                schema::DHI,
                schema::POA_GLOBAL,
                schema::POA_DIRECT,
                schema::POA_DIFFUSE,
                schema::POA_SKY_DIFFUSE,
                schema::POA_GROUND_DIFFUSE,
                schema::SOLAR_ELEVATION,
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn leap_year_has_the_extra_day() -> Result<(), SolarMetError> {
        let dir = tempdir().unwrap();
        let client = SolarMet::builder()
            .location(demo_location())
            .simulation_year(2020)
            .source(WeatherSource::ClearskyModel)
            .saving_path(dir.path().to_path_buf())
            .build()?;

        let weather = client.weather_data().call().await?;
        let table = weather.frame.collect()?;
        assert_eq!(table.height(), 17568);
        Ok(())
    }

    #[tokio::test]
    async fn per_call_source_override_wins() -> Result<(), SolarMetError> {
        let dir = tempdir().unwrap();
        // Default source stays reanalysis; the override must keep the call
        // fully offline.
        let client = SolarMet::builder()
            .location(demo_location())
            .simulation_year(2021)
            .saving_path(dir.path().to_path_buf())
            .build()?;

        client
            .weather_data()
            .source(WeatherSource::ClearskyModel)
            .call()
            .await?;

        let saved = dir
            .path()
            .join("weather_data")
            .join("Weather_data_clearsky_model_2021.csv");
        assert!(saved.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn dst_zone_output_has_no_gaps() -> Result<(), SolarMetError> {
        let dir = tempdir().unwrap();
        let site = GeoLocation::new("Paris site", 48.85, 2.35, 35.0, Tz::Europe__Paris);
        let client = SolarMet::builder()
            .location(site)
            .simulation_year(2021)
            .source(WeatherSource::ClearskyModel)
            .saving_path(dir.path().to_path_buf())
            .build()?;

        let weather = client.weather_data().call().await?;
        let table = weather.frame.collect()?;

        assert_eq!(table.height(), 17520);
        // The spring-forward rows are interpolated, never left null.
        assert_eq!(table.column(schema::GHI).unwrap().null_count(), 0);
        assert_eq!(table.column(schema::POA_GLOBAL).unwrap().null_count(), 0);
        Ok(())
    }

    #[test]
    fn empty_temperature_joins_as_nulls() -> Result<(), SolarMetError> {
        let time = Series::new(PlSmallStr::from_str(schema::TIME), vec![0i64, 1_800_000])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let ghi = Series::new(PlSmallStr::from_str(schema::GHI), vec![100.0f64, 200.0]);
        let solar = DataFrame::new(vec![time.into_column(), ghi.into_column()])?;

        let empty_time = Series::new_empty(
            PlSmallStr::from_str(schema::TIME),
            &DataType::Datetime(TimeUnit::Milliseconds, None),
        );
        let empty_temp = Series::new_empty(
            PlSmallStr::from_str(schema::AIR_TEMPERATURE),
            &DataType::Float64,
        );
        let temperature =
            DataFrame::new(vec![empty_time.into_column(), empty_temp.into_column()])?;

        let joined = attach_temperature(solar, temperature)?;
        assert!(joined.column(schema::AIR_TEMPERATURE).is_err());
        let temp = joined.column(schema::TEMP_AIR)?;
        assert_eq!(temp.null_count(), 2);
        Ok(())
    }
}
