mod error;
mod harmonize;
mod pvgis;
mod reanalysis;
mod solar;
mod solarmet;
mod types;
mod utils;

pub use error::SolarMetError;
pub use solarmet::*;

pub use harmonize::calendar::{
    calendar_frame, half_hour_slots, local_wall_to_utc, normalize_to_calendar, utc_to_local_wall,
};
pub use harmonize::error::HarmonizeError;
pub use harmonize::poa::{
    clearsky_weather_frame, derive_solar_components, transpose_to_plane, SURFACE_AZIMUTH_DEG,
    SURFACE_TILT_DEG,
};
pub use harmonize::sarah::format_satellite_hourly;

pub use pvgis::error::ProviderError;
pub use pvgis::seriescalc::PvgisSeriesCalcClient;
pub use pvgis::tmy::PvgisTmyClient;
pub use pvgis::PVGIS_BASE_URL;

pub use reanalysis::archive::{
    bounding_box, ArchiveClient, ArchiveRequest, CdsArchiveClient, ERA5_LAND_DATASET,
};
pub use reanalysis::config::{CdsConfig, CdsConfigError, DEFAULT_CDS_URL};
pub use reanalysis::error::ReanalysisError;
pub use reanalysis::extractor::{kelvin_to_celsius, radiation_to_power, ReanalysisExtractor};
pub use reanalysis::reader::merge_experiment_versions;

pub use solar::irradiance::{
    clearsky_irradiance, disc_dni, isotropic_poa, relative_airmass, ClearskyIrradiance,
    PoaIrradiance, DEFAULT_ALBEDO, SOLAR_CONSTANT,
};
pub use solar::position::{solar_position, SolarPosition};

pub use types::data_source::{ReanalysisVariable, WeatherSource};
pub use types::location::GeoLocation;
pub use types::schema;
pub use types::weather_frame::{WeatherFrame, HALF_HOUR_MS};
