//! Credentials for the Climate Data Store archive API.

use thiserror::Error;

/// Default endpoint of the Copernicus Climate Data Store API.
pub const DEFAULT_CDS_URL: &str = "https://cds.climate.copernicus.eu/api/v2";

const CDS_URL_VAR: &str = "CDSAPI_URL";
const CDS_KEY_VAR: &str = "CDSAPI_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CdsConfigError {
    #[error("Archive API url must not be empty")]
    EmptyUrl,

    #[error("Archive API url '{0}' must start with http:// or https://")]
    InvalidUrl(String),

    #[error("Archive API key must not be empty")]
    EmptyKey,

    #[error("Archive API key must have the form '<uid>:<secret>'")]
    MalformedKey,
}

/// Validated Climate Data Store credentials.
///
/// The key uses the `<uid>:<secret>` form the CDS hands out on its profile
/// page. Construction validates shape only; whether the credentials are
/// accepted is known once a retrieval runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdsConfig {
    url: String,
    uid: String,
    secret: String,
}

impl CdsConfig {
    pub fn new(url: impl Into<String>, key: &str) -> Result<Self, CdsConfigError> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();
        if url.is_empty() {
            return Err(CdsConfigError::EmptyUrl);
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CdsConfigError::InvalidUrl(url));
        }

        let key = key.trim();
        if key.is_empty() {
            return Err(CdsConfigError::EmptyKey);
        }
        let (uid, secret) = key.split_once(':').ok_or(CdsConfigError::MalformedKey)?;
        if uid.is_empty() || secret.is_empty() {
            return Err(CdsConfigError::MalformedKey);
        }

        Ok(CdsConfig {
            url,
            uid: uid.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Builds a config against the public CDS endpoint.
    pub fn with_default_url(key: &str) -> Result<Self, CdsConfigError> {
        CdsConfig::new(DEFAULT_CDS_URL, key)
    }

    /// Reads `CDSAPI_URL` and `CDSAPI_KEY` from the environment, the same
    /// variables the official CDS client understands.
    ///
    /// Returns `Ok(None)` when the key variable is unset; the url falls back
    /// to [`DEFAULT_CDS_URL`] when only the key is present.
    pub fn from_env() -> Result<Option<Self>, CdsConfigError> {
        let Ok(key) = std::env::var(CDS_KEY_VAR) else {
            return Ok(None);
        };
        let url = std::env::var(CDS_URL_VAR).unwrap_or_else(|_| DEFAULT_CDS_URL.to_string());
        CdsConfig::new(url, &key).map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_credentials() {
        let config = CdsConfig::new("https://cds.example.org/api/v2", "12345:abcdef").unwrap();
        assert_eq!(config.url(), "https://cds.example.org/api/v2");
        assert_eq!(config.uid(), "12345");
        assert_eq!(config.secret(), "abcdef");
    }

    #[test]
    fn trims_trailing_slash_from_url() {
        let config = CdsConfig::new("https://cds.example.org/api/v2/", "1:a").unwrap();
        assert_eq!(config.url(), "https://cds.example.org/api/v2");
    }

    #[test]
    fn rejects_empty_url() {
        assert_eq!(CdsConfig::new("  ", "1:a"), Err(CdsConfigError::EmptyUrl));
    }

    #[test]
    fn rejects_non_http_url() {
        assert_eq!(
            CdsConfig::new("ftp://cds.example.org", "1:a"),
            Err(CdsConfigError::InvalidUrl("ftp://cds.example.org".into()))
        );
    }

    #[test]
    fn rejects_empty_key() {
        assert_eq!(
            CdsConfig::with_default_url(""),
            Err(CdsConfigError::EmptyKey)
        );
    }

    #[test]
    fn rejects_key_without_separator_or_parts() {
        assert_eq!(
            CdsConfig::with_default_url("justonefield"),
            Err(CdsConfigError::MalformedKey)
        );
        assert_eq!(
            CdsConfig::with_default_url(":secret"),
            Err(CdsConfigError::MalformedKey)
        );
        assert_eq!(
            CdsConfig::with_default_url("uid:"),
            Err(CdsConfigError::MalformedKey)
        );
    }

    #[test]
    fn secret_may_contain_colons() {
        let config = CdsConfig::with_default_url("42:ab:cd").unwrap();
        assert_eq!(config.uid(), "42");
        assert_eq!(config.secret(), "ab:cd");
    }
}
