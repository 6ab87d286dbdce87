//! Hourly satellite-derived irradiance series from PVGIS (SARAH2).

use log::info;
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;

use crate::pvgis::error::ProviderError;
use crate::pvgis::{check_status, parse_pvgis_timestamp, PVGIS_BASE_URL};
use crate::types::schema;

/// Radiation database requested from the series endpoint.
pub const SARAH2_DATABASE: &str = "PVGIS-SARAH2";

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    outputs: SeriesOutputs,
}

#[derive(Debug, Deserialize)]
struct SeriesOutputs {
    hourly: Vec<SeriesRecord>,
}

/// One hour of the satellite series; irradiance components arrive already
/// transposed onto the requested plane.
#[derive(Debug, Deserialize)]
struct SeriesRecord {
    time: String,
    #[serde(rename = "Gb(i)")]
    poa_direct: Option<f64>,
    #[serde(rename = "Gd(i)")]
    poa_sky_diffuse: Option<f64>,
    #[serde(rename = "Gr(i)")]
    poa_ground_diffuse: Option<f64>,
    #[serde(rename = "H_sun")]
    solar_elevation: Option<f64>,
    #[serde(rename = "T2m")]
    temp_air: Option<f64>,
    #[serde(rename = "WS10m")]
    wind_speed: Option<f64>,
}

/// Fetches one year of hourly SARAH2 irradiance for a horizontal plane.
///
/// `components=1` makes PVGIS return the individual beam, sky and ground
/// terms instead of only their sum; `angle=0` and `aspect=0` pin the plane
/// horizontal so the series matches the other sources' geometry.
pub struct PvgisSeriesCalcClient {
    base_url: String,
    http: Client,
}

impl PvgisSeriesCalcClient {
    pub fn new() -> Self {
        PvgisSeriesCalcClient::with_base_url(Client::new(), PVGIS_BASE_URL)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        PvgisSeriesCalcClient { base_url, http }
    }

    pub(crate) fn series_url(&self, latitude: f64, longitude: f64, year: i32) -> String {
        format!(
            "{}/seriescalc?lat={}&lon={}&startyear={}&endyear={}&raddatabase={}&components=1&angle=0&aspect=0&outputformat=json",
            self.base_url, latitude, longitude, year, year, SARAH2_DATABASE
        )
    }

    /// Downloads the hourly series for `year`, timestamps in UTC.
    ///
    /// Columns: [`schema::TIME`], [`schema::POA_DIRECT`],
    /// [`schema::POA_SKY_DIFFUSE`], [`schema::POA_GROUND_DIFFUSE`],
    /// [`schema::SOLAR_ELEVATION`], [`schema::TEMP_AIR`],
    /// [`schema::WIND_SPEED`].
    pub async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        year: i32,
    ) -> Result<DataFrame, ProviderError> {
        let url = self.series_url(latitude, longitude, year);
        info!("Fetching satellite irradiance series from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.clone(), e))?;
        let response = check_status(response, &url)?;
        let decoded = response
            .json::<SeriesResponse>()
            .await
            .map_err(|e| ProviderError::Decode(url, e))?;

        series_frame(decoded)
    }
}

impl Default for PvgisSeriesCalcClient {
    fn default() -> Self {
        PvgisSeriesCalcClient::new()
    }
}

fn series_frame(response: SeriesResponse) -> Result<DataFrame, ProviderError> {
    let records = response.outputs.hourly;

    let mut time_ms: Vec<i64> = Vec::with_capacity(records.len());
    let mut poa_direct: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut poa_sky: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut poa_ground: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut solar_elevation: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut temp_air: Vec<Option<f64>> = Vec::with_capacity(records.len());
    let mut wind_speed: Vec<Option<f64>> = Vec::with_capacity(records.len());

    for record in &records {
        let stamp = parse_pvgis_timestamp(&record.time)?;
        time_ms.push(stamp.and_utc().timestamp_millis());
        poa_direct.push(record.poa_direct);
        poa_sky.push(record.poa_sky_diffuse);
        poa_ground.push(record.poa_ground_diffuse);
        solar_elevation.push(record.solar_elevation);
        temp_air.push(record.temp_air);
        wind_speed.push(record.wind_speed);
    }

    let time = Series::new(PlSmallStr::from_str(schema::TIME), time_ms)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let df = DataFrame::new(vec![
        time.into_column(),
        Series::new(PlSmallStr::from_str(schema::POA_DIRECT), poa_direct).into_column(),
        Series::new(PlSmallStr::from_str(schema::POA_SKY_DIFFUSE), poa_sky).into_column(),
        Series::new(PlSmallStr::from_str(schema::POA_GROUND_DIFFUSE), poa_ground).into_column(),
        Series::new(PlSmallStr::from_str(schema::SOLAR_ELEVATION), solar_elevation).into_column(),
        Series::new(PlSmallStr::from_str(schema::TEMP_AIR), temp_air).into_column(),
        Series::new(PlSmallStr::from_str(schema::WIND_SPEED), wind_speed).into_column(),
    ])?;
    Ok(df)
}
