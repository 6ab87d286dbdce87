use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReanalysisError {
    #[error("Archive client is not configured and '{0}' is not already on disk")]
    ClientNotConfigured(PathBuf),

    #[error("Failed to create download directory '{0}'")]
    DownloadDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode archive reply from {0}")]
    Decode(String, #[source] reqwest::Error),

    #[error("Archive retrieval failed: {0}")]
    RetrievalFailed(String),

    #[error("Data download failed")]
    DownloadIo(#[from] std::io::Error),

    #[error("Failed to persist download to '{0}'")]
    PersistDownload(PathBuf, #[source] std::io::Error),

    #[error("Reading '{0}' requires building with the 'netcdf' feature")]
    NetcdfDisabled(PathBuf),

    #[cfg(feature = "netcdf")]
    #[error("Failed to open NetCDF file '{0}'")]
    NetcdfOpen(PathBuf, #[source] netcdf::Error),

    #[cfg(feature = "netcdf")]
    #[error("Failed to read variable '{variable}' from '{path}'")]
    NetcdfRead {
        path: PathBuf,
        variable: String,
        #[source]
        source: netcdf::Error,
    },

    #[error("Variable '{variable}' not found in '{path}'")]
    MissingVariable { path: PathBuf, variable: String },

    #[error("Cannot interpret the time axis of '{path}': {reason}")]
    TimeAxis { path: PathBuf, reason: String },

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
