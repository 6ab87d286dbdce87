//! Typical meteorological year retrieval from PVGIS.

use chrono::Datelike;
use log::{info, warn};
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;

use crate::pvgis::error::ProviderError;
use crate::pvgis::{check_status, parse_pvgis_timestamp, PVGIS_BASE_URL};
use crate::types::schema;

#[derive(Debug, Deserialize)]
struct TmyResponse {
    outputs: TmyOutputs,
}

#[derive(Debug, Deserialize)]
struct TmyOutputs {
    tmy_hourly: Vec<TmyRecord>,
}

/// One hour of the typical year as PVGIS serializes it.
#[derive(Debug, Deserialize)]
struct TmyRecord {
    #[serde(rename = "time(UTC)")]
    time: String,
    #[serde(rename = "T2m")]
    temp_air: Option<f64>,
    #[serde(rename = "G(h)")]
    ghi: Option<f64>,
    #[serde(rename = "Gb(n)")]
    dni: Option<f64>,
    #[serde(rename = "Gd(h)")]
    dhi: Option<f64>,
    #[serde(rename = "WS10m")]
    wind_speed: Option<f64>,
}

/// Fetches the PVGIS typical meteorological year for a site.
///
/// The TMY stitches together the most representative real months of the last
/// couple of decades, so its timestamps carry a different year per month.
/// [`PvgisTmyClient::fetch`] remaps them all onto the requested simulation
/// year so the series lines up with the output calendar.
pub struct PvgisTmyClient {
    base_url: String,
    http: Client,
}

impl PvgisTmyClient {
    pub fn new() -> Self {
        PvgisTmyClient::with_base_url(Client::new(), PVGIS_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        PvgisTmyClient { base_url, http }
    }

    pub(crate) fn tmy_url(&self, latitude: f64, longitude: f64) -> String {
        format!(
            "{}/tmy?lat={}&lon={}&outputformat=json",
            self.base_url, latitude, longitude
        )
    }

    /// Downloads the typical year and returns it on the simulation year's
    /// timestamps, hourly in UTC.
    ///
    /// Columns: [`schema::TIME`], [`schema::GHI`], [`schema::DNI`],
    /// [`schema::DHI`], [`schema::TEMP_AIR`], [`schema::WIND_SPEED`].
    pub async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        simulation_year: i32,
    ) -> Result<DataFrame, ProviderError> {
        let url = self.tmy_url(latitude, longitude);
        info!("Fetching typical meteorological year from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;
        let response = check_status(response, &url)?;
        let decoded = response
            .json::<TmyResponse>()
            .await
            .map_err(|e| ProviderError::Decode(url, e))?;

        typical_year_frame(decoded, simulation_year)
    }
}

impl Default for PvgisTmyClient {
    fn default() -> Self {
        PvgisTmyClient::new()
    }
}

fn typical_year_frame(
    response: TmyResponse,
    simulation_year: i32,
) -> Result<DataFrame, ProviderError> {
    let records = response.outputs.tmy_hourly;

    let mut time_ms: Vec<i64> = Vec::with_capacity(records.len());
    let mut ghi: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut dni: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut dhi: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut temp_air: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut wind_speed: Vec<Option<f64>> = Vec::with_capacity(records.len());

    for record in &records {
        let stamp = parse_pvgis_timestamp(&record.time)?;
        // A TMY February picked from a leap year can carry a 29th with no
        // slot in a non-leap simulation year; those hours are dropped.
        let Some(remapped) = stamp.with_year(simulation_year) else {
            warn!(
                "Dropping typical-year hour {}: no equivalent in {}",
                record.time, simulation_year
            );
            continue;
        };
        time_ms.push(remapped.and_utc().timestamp_millis());
        ghi.push(record.ghi);
        dni.push(record.dni);
        dhi.push(record.dhi);
        temp_air.push(record.temp_air);
        wind_speed.push(record.wind_speed);
    }

    let time = Series::new(PlSmallStr::from_str(schema::TIME), time_ms)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let df = DataFrame::new(vec![
        time.into_column(),
        Series::new(PlSmallStr::from_str(schema::GHI), ghi).into_column(),
        Series::new(PlSmallStr::from_str(schema::DNI), dni).into_column(),
        Series::new(PlSmallStr::from_str(schema::DHI), dhi).into_column(),
        Series::new(PlSmallStr::from_str(schema::TEMP_AIR), temp_air).into_column(),
        Series::new(PlSmallStr::from_str(schema::WIND_SPEED), wind_speed).into_column(),
    ])?;
    Ok(df)
}
