use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A site the weather pipeline collects data for.
///
/// Latitude and longitude are in decimal degrees (WGS84, north and east
/// positive), altitude in meters above sea level. The timezone is the IANA
/// zone the output calendar is expressed in; all sources are converted to
/// this zone before normalization.
///
/// # Examples
///
/// ```
/// use chrono_tz::Tz;
/// use solarmet::GeoLocation;
///
/// let site = GeoLocation::new("Demo site", 52.414, -1.143, 90.6, Tz::UTC);
/// assert_eq!(site.latitude, 52.414);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Human-readable site name, also used in on-disk directory names.
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub timezone: Tz,
}

impl GeoLocation {
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        timezone: Tz,
    ) -> Self {
        GeoLocation {
            name: name.into(),
            latitude,
            longitude,
            altitude,
            timezone,
        }
    }

    /// Site name with whitespace collapsed to underscores, safe for paths.
    pub fn path_name(&self) -> String {
        self.name.split_whitespace().collect::<Vec<_>>().join("_")
    }
}
