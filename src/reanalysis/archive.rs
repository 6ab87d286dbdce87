//! Climate Data Store archive retrieval: request shape, the client trait and
//! the HTTP implementation speaking the CDS API.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;

use crate::reanalysis::config::CdsConfig;
use crate::reanalysis::error::ReanalysisError;
use crate::types::data_source::ReanalysisVariable;

/// Dataset identifier of the hourly ERA5-Land archive.
pub const ERA5_LAND_DATASET: &str = "reanalysis-era5-land";

const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Quarter-degree-free bounding box around a site, `[north, west, south,
/// east]` in the order the archive expects.
///
/// The second corner is offset by 0.01° toward zero for positive coordinates
/// and away from zero for negative ones, matching the retrieval area the rest
/// of the pipeline was validated against.
pub fn bounding_box(latitude: f64, longitude: f64) -> [f64; 4] {
    let buffer = |x: f64| if x > 0.0 { x - 0.01 } else { x + 0.01 };
    [latitude, longitude, buffer(latitude), buffer(longitude)]
}

/// One year-long retrieval request for a single variable.
///
/// Serializes to the JSON body the CDS API expects: every month, day and
/// hourly mark of the year, NetCDF output, restricted to a small area around
/// the site. Days absent from a month are silently skipped by the archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveRequest {
    pub format: String,
    pub variable: String,
    pub year: String,
    pub month: Vec<String>,
    pub day: Vec<String>,
    pub time: Vec<String>,
    pub area: [f64; 4],
}

impl ArchiveRequest {
    pub fn full_year(variable: ReanalysisVariable, year: i32, area: [f64; 4]) -> Self {
        ArchiveRequest {
            format: "netcdf".to_string(),
            variable: variable.request_name().to_string(),
            year: year.to_string(),
            month: (1..=12).map(|m| format!("{m:02}")).collect(),
            day: (1..=31).map(|d| format!("{d:02}")).collect(),
            time: (0..24).map(|h| format!("{h:02}:00")).collect(),
            area,
        }
    }
}

/// Something that can materialize an [`ArchiveRequest`] as a file on disk.
///
/// The production implementation is [`CdsArchiveClient`]; tests substitute
/// recording stand-ins to exercise the download orchestration offline.
pub trait ArchiveClient {
    fn retrieve(
        &self,
        dataset: &str,
        request: &ArchiveRequest,
        target: &Path,
    ) -> impl Future<Output = Result<(), ReanalysisError>> + Send;
}

#[derive(Debug, Deserialize)]
struct TaskReply {
    state: String,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    error: Option<TaskFailure>,
}

#[derive(Debug, Deserialize)]
struct TaskFailure {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl TaskFailure {
    fn describe(&self) -> String {
        match (&self.message, &self.reason) {
            (Some(message), Some(reason)) => format!("{message}: {reason}"),
            (Some(message), None) => message.clone(),
            (None, Some(reason)) => reason.clone(),
            (None, None) => "no detail given".to_string(),
        }
    }
}

/// HTTP client for the Climate Data Store archive API.
///
/// A retrieval is queued on the archive, polled until the product is built
/// and then streamed to the target path. Writes go through a `.part` file
/// that is renamed at the end, so an interrupted download never looks like a
/// finished one.
pub struct CdsArchiveClient {
    config: CdsConfig,
    http: Client,
}

impl CdsArchiveClient {
    pub fn new(config: CdsConfig) -> Self {
        CdsArchiveClient {
            config,
            http: Client::new(),
        }
    }

    /// Reuses an existing reqwest client instead of building a fresh one.
    pub fn with_http_client(config: CdsConfig, http: Client) -> Self {
        CdsArchiveClient { config, http }
    }

    async fn submit(
        &self,
        dataset: &str,
        request: &ArchiveRequest,
    ) -> Result<TaskReply, ReanalysisError> {
        let url = format!("{}/resources/{}", self.config.url(), dataset);
        info!("Requesting {} from {}", request.variable, url);

        let response = self
            .http
            .post(&url)
            .basic_auth(self.config.uid(), Some(self.config.secret()))
            .json(request)
            .send()
            .await
            .map_err(|e| ReanalysisError::NetworkRequest(url.clone(), e))?;
        let response = check_status(response, &url)?;
        response
            .json::<TaskReply>()
            .await
            .map_err(|e| ReanalysisError::Decode(url, e))
    }

    async fn poll(&self, request_id: &str) -> Result<TaskReply, ReanalysisError> {
        let url = format!("{}/tasks/{}", self.config.url(), request_id);
        let response = self
            .http
            .get(&url)
            .basic_auth(self.config.uid(), Some(self.config.secret()))
            .send()
            .await
            .map_err(|e| ReanalysisError::NetworkRequest(url.clone(), e))?;
        let response = check_status(response, &url)?;
        response
            .json::<TaskReply>()
            .await
            .map_err(|e| ReanalysisError::Decode(url, e))
    }

    async fn download_product(&self, location: &str, target: &Path) -> Result<(), ReanalysisError> {
        let url = if location.starts_with("http") {
            location.to_string()
        } else {
            format!("{}/{}", self.config.url(), location.trim_start_matches('/'))
        };
        info!("Downloading archive product from {}", url);

        let response = self
            .http
            .get(&url)
            .basic_auth(self.config.uid(), Some(self.config.secret()))
            .send()
            .await
            .map_err(|e| ReanalysisError::NetworkRequest(url.clone(), e))?;
        let response = check_status(response, &url)?;

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);

        let part_path = partial_path(target);
        let mut file = fs::File::create(&part_path).await?;
        let bytes = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        drop(file);

        fs::rename(&part_path, target)
            .await
            .map_err(|e| ReanalysisError::PersistDownload(target.to_path_buf(), e))?;
        info!("Downloaded {} bytes to {:?}", bytes, target);
        Ok(())
    }
}

impl ArchiveClient for CdsArchiveClient {
    async fn retrieve(
        &self,
        dataset: &str,
        request: &ArchiveRequest,
        target: &Path,
    ) -> Result<(), ReanalysisError> {
        let mut reply = self.submit(dataset, request).await?;

        loop {
            match reply.state.as_str() {
                "completed" => {
                    let location = reply.location.as_deref().ok_or_else(|| {
                        ReanalysisError::RetrievalFailed(
                            "archive reported completion without a download location".to_string(),
                        )
                    })?;
                    return self.download_product(location, target).await;
                }
                "failed" => {
                    let detail = reply
                        .error
                        .as_ref()
                        .map(TaskFailure::describe)
                        .unwrap_or_else(|| "no detail given".to_string());
                    warn!("Archive retrieval failed: {}", detail);
                    return Err(ReanalysisError::RetrievalFailed(detail));
                }
                state => {
                    let request_id = reply.request_id.as_deref().ok_or_else(|| {
                        ReanalysisError::RetrievalFailed(format!(
                            "archive reply in state '{state}' carried no request id"
                        ))
                    })?;
                    info!(
                        "Archive request {} is {}, polling again in {:?}",
                        request_id, state, POLL_INTERVAL
                    );
                    tokio::time::sleep(POLL_INTERVAL).await;
                    reply = self.poll(request_id).await?;
                }
            }
        }
    }
}

fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, ReanalysisError> {
    match response.error_for_status() {
        Ok(response) => Ok(response),
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            Err(if let Some(status) = e.status() {
                ReanalysisError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                ReanalysisError::NetworkRequest(url.to_string(), e)
            })
        }
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bounding_box_shrinks_positive_coordinates_toward_zero() {
        let area = bounding_box(52.414, -1.143);
        assert_eq!(area, [52.414, -1.143, 52.404, -1.133]);
    }

    #[test]
    fn bounding_box_in_southern_western_quadrant() {
        let area = bounding_box(-33.86, -151.2);
        assert_eq!(area, [-33.86, -151.2, -33.85, -151.19]);
    }

    #[test]
    fn bounding_box_keeps_first_corner_exact() {
        for (lat, lon) in [(52.414, -1.143), (0.0, 0.0), (-12.5, 130.8)] {
            let area = bounding_box(lat, lon);
            assert_eq!(area[0], lat);
            assert_eq!(area[1], lon);
        }
    }

    #[test]
    fn full_year_request_serializes_expected_shape() {
        let request = ArchiveRequest::full_year(
            ReanalysisVariable::SolarRadiation,
            2020,
            bounding_box(52.414, -1.143),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["format"], json!("netcdf"));
        assert_eq!(value["variable"], json!("surface_net_solar_radiation"));
        assert_eq!(value["year"], json!("2020"));
        assert_eq!(value["month"].as_array().unwrap().len(), 12);
        assert_eq!(value["month"][0], json!("01"));
        assert_eq!(value["month"][11], json!("12"));
        assert_eq!(value["day"].as_array().unwrap().len(), 31);
        assert_eq!(value["day"][30], json!("31"));
        assert_eq!(value["time"].as_array().unwrap().len(), 24);
        assert_eq!(value["time"][0], json!("00:00"));
        assert_eq!(value["time"][23], json!("23:00"));
        assert_eq!(value["area"], json!([52.414, -1.143, 52.404, -1.133]));
    }

    #[test]
    fn temperature_request_uses_long_variable_name() {
        let request =
            ArchiveRequest::full_year(ReanalysisVariable::Temperature, 2021, [0.0, 0.0, 0.01, 0.01]);
        assert_eq!(request.variable, "2m_temperature");
    }

    #[test]
    fn partial_path_appends_part_suffix() {
        let target = Path::new("/tmp/era5/surface_net_solar_radiation_2020.nc");
        assert_eq!(
            partial_path(target),
            Path::new("/tmp/era5/surface_net_solar_radiation_2020.nc.part")
        );
    }

    #[test]
    fn task_failure_describe_prefers_both_fields() {
        let failure = TaskFailure {
            message: Some("request too large".to_string()),
            reason: Some("cost limit exceeded".to_string()),
        };
        assert_eq!(failure.describe(), "request too large: cost limit exceeded");

        let bare = TaskFailure {
            message: None,
            reason: None,
        };
        assert_eq!(bare.describe(), "no detail given");
    }

    #[test]
    fn task_reply_parses_queued_and_completed_states() {
        let queued: TaskReply = serde_json::from_str(
            r#"{"state": "queued", "request_id": "abc-123"}"#,
        )
        .unwrap();
        assert_eq!(queued.state, "queued");
        assert_eq!(queued.request_id.as_deref(), Some("abc-123"));
        assert!(queued.location.is_none());

        let completed: TaskReply = serde_json::from_str(
            r#"{"state": "completed", "location": "https://download.example/result.nc"}"#,
        )
        .unwrap();
        assert_eq!(completed.state, "completed");
        assert_eq!(
            completed.location.as_deref(),
            Some("https://download.example/result.nc")
        );
    }
}
