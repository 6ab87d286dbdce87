//! Clients for the PVGIS web API (typical year and satellite time series).

pub mod error;
pub mod seriescalc;
pub mod tmy;

use chrono::NaiveDateTime;
use log::warn;

use crate::pvgis::error::ProviderError;

/// Public endpoint of the PVGIS API version this crate targets.
pub const PVGIS_BASE_URL: &str = "https://re.jrc.ec.europa.eu/api/v5_2";

/// Parses the `YYYYMMDD:HHMM` timestamps PVGIS uses in both the TMY and the
/// hourly series payloads.
pub(crate) fn parse_pvgis_timestamp(value: &str) -> Result<NaiveDateTime, ProviderError> {
    NaiveDateTime::parse_from_str(value, "%Y%m%d:%H%M")
        .map_err(|_| ProviderError::BadTimestamp(value.to_string()))
}

pub(crate) fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, ProviderError> {
    match response.error_for_status() {
        Ok(response) => Ok(response),
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            Err(if let Some(status) = e.status() {
                ProviderError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                ProviderError::NetworkRequest(url.to_string(), e)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_midnight_and_offset_timestamps() {
        let midnight = parse_pvgis_timestamp("20070101:0000").unwrap();
        assert_eq!(midnight.to_string(), "2007-01-01 00:00:00");

        let offset = parse_pvgis_timestamp("20200615:1210").unwrap();
        assert_eq!(offset.to_string(), "2020-06-15 12:10:00");
    }

    #[test]
    fn rejects_malformed_timestamps() {
        assert!(matches!(
            parse_pvgis_timestamp("2020-01-01 00:00"),
            Err(ProviderError::BadTimestamp(_))
        ));
        assert!(matches!(
            parse_pvgis_timestamp("20201301:0000"),
            Err(ProviderError::BadTimestamp(_))
        ));
    }
}
