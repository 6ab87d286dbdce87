//! Defines the weather data sources the pipeline can draw from and the
//! reanalysis variables it retrieves.

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::schema;

/// Where a weather table comes from.
///
/// Every variant yields the same half-hourly calendar in the end; they differ
/// in which columns they can supply and whether they touch the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherSource {
    /// PVGIS typical meteorological year, remapped onto the simulation year.
    TypicalYear,
    /// Synthetic cloud-free irradiance from a simple transmittance model.
    /// Works fully offline.
    ClearskyModel,
    /// ERA5-Land hourly surface radiation and temperature from the Climate
    /// Data Store.
    Reanalysis,
    /// SARAH2 satellite-derived hourly plane-of-array irradiance served by
    /// PVGIS.
    SatelliteHourly,
}

impl WeatherSource {
    /// Segment used in output file names, e.g.
    /// `Weather_data_reanalysis_2020.csv`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            WeatherSource::TypicalYear => "typical_year",
            WeatherSource::ClearskyModel => "clearsky_model",
            WeatherSource::Reanalysis => "reanalysis",
            WeatherSource::SatelliteHourly => "satellite_hourly",
        }
    }

    /// Resolves a free-form tag to a source, accepting a few common aliases.
    ///
    /// Unrecognized tags fall back to [`WeatherSource::TypicalYear`] with a
    /// warning instead of failing, so a misspelled configuration value still
    /// produces a usable table.
    pub fn from_tag(tag: &str) -> WeatherSource {
        match tag.trim().to_ascii_lowercase().as_str() {
            "typical_year" | "tmy" => WeatherSource::TypicalYear,
            "clearsky_model" | "clearsky" => WeatherSource::ClearskyModel,
            "reanalysis" | "era5" | "era5_land" => WeatherSource::Reanalysis,
            "satellite_hourly" | "sarah2" => WeatherSource::SatelliteHourly,
            other => {
                warn!("Unknown weather source tag {other:?}, using the typical year instead.");
                WeatherSource::TypicalYear
            }
        }
    }
}

/// Allows formatting a `WeatherSource` variant using its `path_segment`.
///
/// # Examples
///
/// ```
/// use solarmet::WeatherSource;
///
/// assert_eq!(format!("{}", WeatherSource::Reanalysis), "reanalysis");
/// assert_eq!(WeatherSource::TypicalYear.to_string(), "typical_year");
/// ```
impl fmt::Display for WeatherSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// The two ERA5-Land variables the reanalysis pipeline retrieves.
///
/// Each variable carries three names: the long name used in retrieval
/// requests and on-disk file names, the short name of the series inside the
/// NetCDF file, and the column name the post-processed series is published
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReanalysisVariable {
    /// Surface net solar radiation, accumulated J/m².
    SolarRadiation,
    /// Air temperature at 2 m, K.
    Temperature,
}

impl ReanalysisVariable {
    pub const ALL: [ReanalysisVariable; 2] = [
        ReanalysisVariable::SolarRadiation,
        ReanalysisVariable::Temperature,
    ];

    /// Variable name used in archive retrieval requests and file names.
    pub fn request_name(&self) -> &'static str {
        match self {
            ReanalysisVariable::SolarRadiation => "surface_net_solar_radiation",
            ReanalysisVariable::Temperature => "2m_temperature",
        }
    }

    /// Short name the series carries inside the downloaded NetCDF file.
    pub fn short_name(&self) -> &'static str {
        match self {
            ReanalysisVariable::SolarRadiation => "ssr",
            ReanalysisVariable::Temperature => "t2m",
        }
    }

    /// Column name the post-processed series is published under.
    pub fn column_name(&self) -> &'static str {
        match self {
            ReanalysisVariable::SolarRadiation => schema::GLOBAL_IRRADIANCE,
            ReanalysisVariable::Temperature => schema::AIR_TEMPERATURE,
        }
    }
}

impl fmt::Display for ReanalysisVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.request_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segments_are_distinct() {
        let segments = [
            WeatherSource::TypicalYear,
            WeatherSource::ClearskyModel,
            WeatherSource::Reanalysis,
            WeatherSource::SatelliteHourly,
        ]
        .map(|s| s.path_segment());
        for (i, a) in segments.iter().enumerate() {
            for b in segments.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn from_tag_accepts_aliases_and_case() {
        assert_eq!(WeatherSource::from_tag("ERA5"), WeatherSource::Reanalysis);
        assert_eq!(
            WeatherSource::from_tag(" clearsky "),
            WeatherSource::ClearskyModel
        );
        assert_eq!(
            WeatherSource::from_tag("sarah2"),
            WeatherSource::SatelliteHourly
        );
        assert_eq!(WeatherSource::from_tag("tmy"), WeatherSource::TypicalYear);
    }

    #[test]
    fn from_tag_falls_back_to_typical_year() {
        assert_eq!(
            WeatherSource::from_tag("full_physics"),
            WeatherSource::TypicalYear
        );
    }

    #[test]
    fn reanalysis_variable_names_line_up() {
        let radiation = ReanalysisVariable::SolarRadiation;
        assert_eq!(radiation.request_name(), "surface_net_solar_radiation");
        assert_eq!(radiation.short_name(), "ssr");
        assert_eq!(radiation.column_name(), "global_irradiance");

        let temperature = ReanalysisVariable::Temperature;
        assert_eq!(temperature.request_name(), "2m_temperature");
        assert_eq!(temperature.short_name(), "t2m");
        assert_eq!(temperature.column_name(), "air_temperature");
    }
}
