use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {0}")]
    Decode(String, #[source] reqwest::Error),

    #[error("Cannot parse timestamp '{0}'")]
    BadTimestamp(String),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),
}
