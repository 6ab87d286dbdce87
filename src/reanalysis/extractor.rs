//! Download orchestration and post-processing for ERA5-Land data.

use std::path::{Path, PathBuf};

use log::{info, warn};
use polars::prelude::*;
use tokio::{fs, task};

use crate::reanalysis::archive::{bounding_box, ArchiveClient, ArchiveRequest, ERA5_LAND_DATASET};
use crate::reanalysis::error::ReanalysisError;
use crate::reanalysis::reader;
use crate::types::data_source::ReanalysisVariable;
use crate::types::location::GeoLocation;
use crate::types::schema;

/// Fetches ERA5-Land NetCDF files for one site and serves their variables as
/// tidy `[time, value]` frames.
///
/// Files already on disk are never downloaded again, so a populated data
/// directory works entirely offline. The client is optional: it is only
/// consulted when a file is actually missing.
pub struct ReanalysisExtractor<C> {
    location: GeoLocation,
    netcdf_dir: PathBuf,
    client: Option<C>,
}

impl<C: ArchiveClient> ReanalysisExtractor<C> {
    /// Creates an extractor rooted at `<saving_path>/weather_data/`.
    ///
    /// Nothing is created on disk until a download actually happens.
    pub fn new(location: &GeoLocation, saving_path: &Path, client: Option<C>) -> Self {
        let netcdf_dir = saving_path
            .join("weather_data")
            .join(format!("{}_netcdf_data", location.path_name()));
        ReanalysisExtractor {
            location: location.clone(),
            netcdf_dir,
            client,
        }
    }

    /// On-disk location of one downloaded variable file.
    pub fn variable_path(&self, variable: ReanalysisVariable, year: i32) -> PathBuf {
        self.netcdf_dir.join(format!(
            "{}_{}_{}.nc",
            self.location.path_name(),
            variable.request_name(),
            year
        ))
    }

    /// Ensures both variable files for `year` are on disk, downloading the
    /// missing ones.
    pub async fn download_year(&self, year: i32) -> Result<(), ReanalysisError> {
        for variable in ReanalysisVariable::ALL {
            self.download_variable(variable, year).await?;
        }
        Ok(())
    }

    async fn download_variable(
        &self,
        variable: ReanalysisVariable,
        year: i32,
    ) -> Result<PathBuf, ReanalysisError> {
        let path = self.variable_path(variable, year);
        if fs::metadata(&path).await.is_ok() {
            info!("File hit for {} {} at {:?}", variable, year, path);
            return Ok(path);
        }

        warn!("File miss for {} {}. Downloading from the archive.", variable, year);
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ReanalysisError::ClientNotConfigured(path.clone()))?;

        fs::create_dir_all(&self.netcdf_dir)
            .await
            .map_err(|e| ReanalysisError::DownloadDirCreation(self.netcdf_dir.clone(), e))?;

        let request = ArchiveRequest::full_year(
            variable,
            year,
            bounding_box(self.location.latitude, self.location.longitude),
        );
        client.retrieve(ERA5_LAND_DATASET, &request, &path).await?;
        Ok(path)
    }

    /// Half-processed radiation series for `year`: accumulated J/m² turned
    /// into mean W/m² per hour, under the [`schema::GLOBAL_IRRADIANCE`]
    /// column.
    ///
    /// A missing file yields an empty frame with the right columns, matching
    /// the behavior of the other variable accessors.
    pub async fn radiation_frame(&self, year: i32) -> Result<DataFrame, ReanalysisError> {
        match self.read_frame(ReanalysisVariable::SolarRadiation, year).await? {
            Some(df) => radiation_to_power(df),
            None => empty_variable_frame(schema::GLOBAL_IRRADIANCE),
        }
    }

    /// Temperature series for `year` in °C under the
    /// [`schema::AIR_TEMPERATURE`] column, or an empty frame when the file is
    /// missing.
    pub async fn temperature_frame(&self, year: i32) -> Result<DataFrame, ReanalysisError> {
        match self.read_frame(ReanalysisVariable::Temperature, year).await? {
            Some(df) => kelvin_to_celsius(df),
            None => empty_variable_frame(schema::AIR_TEMPERATURE),
        }
    }

    async fn read_frame(
        &self,
        variable: ReanalysisVariable,
        year: i32,
    ) -> Result<Option<DataFrame>, ReanalysisError> {
        let path = self.variable_path(variable, year);
        if fs::metadata(&path).await.is_err() {
            warn!(
                "No {} file for {} at {:?}; continuing with an empty series",
                variable, year, path
            );
            return Ok(None);
        }
        let df = task::spawn_blocking(move || reader::read_variable_frame(&path, variable))
            .await??;
        Ok(Some(df))
    }
}

/// De-accumulates ERA5 surface net solar radiation into mean power.
///
/// The archive stores J/m² summed since the previous 00:00 UTC, so the step
/// difference recovers one hour's worth of energy. The daily reset shows up
/// as a negative step and is clamped to zero, as is the undefined first step.
pub fn radiation_to_power(df: DataFrame) -> Result<DataFrame, ReanalysisError> {
    let accumulated = col(ReanalysisVariable::SolarRadiation.short_name());
    let step = (accumulated.clone() - accumulated.shift(lit(1))).fill_null(lit(0.0));
    let power = when(step.clone().lt(lit(0.0)))
        .then(lit(0.0))
        .otherwise(step)
        / lit(3600.0);

    let df = df
        .lazy()
        .select([col(schema::TIME), power.alias(schema::GLOBAL_IRRADIANCE)])
        .collect()?;
    Ok(df)
}

/// Converts the 2 m temperature series from K to °C.
pub fn kelvin_to_celsius(df: DataFrame) -> Result<DataFrame, ReanalysisError> {
    let df = df
        .lazy()
        .select([
            col(schema::TIME),
            (col(ReanalysisVariable::Temperature.short_name()) - lit(273.15))
                .alias(schema::AIR_TEMPERATURE),
        ])
        .collect()?;
    Ok(df)
}

fn empty_variable_frame(column: &str) -> Result<DataFrame, ReanalysisError> {
    let time = Series::new_empty(
        PlSmallStr::from_str(schema::TIME),
        &DataType::Datetime(TimeUnit::Milliseconds, None),
    );
    let data = Series::new_empty(PlSmallStr::from_str(column), &DataType::Float64);
    Ok(DataFrame::new(vec![time.into_column(), data.into_column()])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn demo_location() -> GeoLocation {
        GeoLocation::new("Demo site", 52.414, -1.143, 90.6, Tz::UTC)
    }

    fn raw_frame(column: &str, values: &[Option<f64>]) -> DataFrame {
        let times: Vec<i64> = (0..values.len() as i64).map(|i| i * 3_600_000).collect();
        let time = Series::new(PlSmallStr::from_str(schema::TIME), times)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let data = Series::new(PlSmallStr::from_str(column), values.to_vec());
        DataFrame::new(vec![time.into_column(), data.into_column()]).unwrap()
    }

    /// Archive double that counts retrievals and writes a marker file.
    struct RecordingArchive {
        calls: Arc<AtomicUsize>,
    }

    impl ArchiveClient for RecordingArchive {
        async fn retrieve(
            &self,
            _dataset: &str,
            _request: &ArchiveRequest,
            target: &Path,
        ) -> Result<(), ReanalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(target, b"netcdf bytes").await?;
            Ok(())
        }
    }

    #[test]
    fn radiation_steps_become_hourly_power() -> Result<(), Box<dyn std::error::Error>> {
        let df = raw_frame(
            "ssr",
            &[Some(0.0), Some(3600.0), Some(7200.0), Some(10800.0)],
        );
        let power = radiation_to_power(df)?;
        let values = power.column(schema::GLOBAL_IRRADIANCE)?.f64()?;
        assert_eq!(values.get(0), Some(0.0));
        assert_eq!(values.get(1), Some(1.0));
        assert_eq!(values.get(2), Some(1.0));
        assert_eq!(values.get(3), Some(1.0));
        Ok(())
    }

    #[test]
    fn radiation_daily_reset_clamps_to_zero() -> Result<(), Box<dyn std::error::Error>> {
        // Accumulation drops back at 00:00 UTC; the negative step must not
        // leak into the power series.
        let df = raw_frame("ssr", &[Some(3600.0), Some(7200.0), Some(0.0), Some(3600.0)]);
        let power = radiation_to_power(df)?;
        let values = power.column(schema::GLOBAL_IRRADIANCE)?.f64()?;
        assert_eq!(values.get(0), Some(0.0));
        assert_eq!(values.get(1), Some(1.0));
        assert_eq!(values.get(2), Some(0.0));
        assert_eq!(values.get(3), Some(1.0));
        Ok(())
    }

    #[test]
    fn temperature_converts_to_celsius() -> Result<(), Box<dyn std::error::Error>> {
        let df = raw_frame("t2m", &[Some(300.0), None, Some(273.15)]);
        let celsius = kelvin_to_celsius(df)?;
        let values = celsius.column(schema::AIR_TEMPERATURE)?.f64()?;
        assert!((values.get(0).unwrap() - 26.85).abs() < 1e-9);
        assert_eq!(values.get(1), None);
        assert!(values.get(2).unwrap().abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn variable_path_follows_site_layout() {
        let extractor = ReanalysisExtractor::<RecordingArchive>::new(
            &demo_location(),
            Path::new("/data"),
            None,
        );
        let path = extractor.variable_path(ReanalysisVariable::SolarRadiation, 2020);
        assert_eq!(
            path,
            Path::new(
                "/data/weather_data/Demo_site_netcdf_data/Demo_site_surface_net_solar_radiation_2020.nc"
            )
        );
    }

    #[tokio::test]
    async fn downloads_happen_once_per_variable() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let calls = Arc::new(AtomicUsize::new(0));
        let extractor = ReanalysisExtractor::new(
            &demo_location(),
            dir.path(),
            Some(RecordingArchive {
                calls: calls.clone(),
            }),
        );

        extractor.download_year(2020).await?;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Second pass finds the files on disk and never touches the client.
        extractor.download_year(2020).await?;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn missing_client_is_an_error_only_when_downloading() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let extractor =
            ReanalysisExtractor::<RecordingArchive>::new(&demo_location(), dir.path(), None);

        let result = extractor.download_year(2020).await;
        assert!(matches!(
            result,
            Err(ReanalysisError::ClientNotConfigured(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn present_files_satisfy_download_without_client() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let extractor =
            ReanalysisExtractor::<RecordingArchive>::new(&demo_location(), dir.path(), None);
        for variable in ReanalysisVariable::ALL {
            let path = extractor.variable_path(variable, 2020);
            fs::create_dir_all(path.parent().unwrap()).await?;
            fs::write(&path, b"already here").await?;
        }

        extractor.download_year(2020).await?;
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_yields_empty_series() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let extractor =
            ReanalysisExtractor::<RecordingArchive>::new(&demo_location(), dir.path(), None);

        let radiation = extractor.radiation_frame(2020).await?;
        assert_eq!(radiation.height(), 0);
        assert!(radiation.column(schema::TIME).is_ok());
        assert!(radiation.column(schema::GLOBAL_IRRADIANCE).is_ok());

        let temperature = extractor.temperature_frame(2020).await?;
        assert_eq!(temperature.height(), 0);
        assert!(temperature.column(schema::AIR_TEMPERATURE).is_ok());
        Ok(())
    }

    #[cfg(not(feature = "netcdf"))]
    #[tokio::test]
    async fn reading_without_netcdf_feature_is_reported() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let extractor =
            ReanalysisExtractor::<RecordingArchive>::new(&demo_location(), dir.path(), None);
        let path = extractor.variable_path(ReanalysisVariable::SolarRadiation, 2020);
        fs::create_dir_all(path.parent().unwrap()).await?;
        fs::write(&path, b"netcdf bytes").await?;

        let result = extractor.radiation_frame(2020).await;
        assert!(matches!(result, Err(ReanalysisError::NetcdfDisabled(_))));
        Ok(())
    }
}
