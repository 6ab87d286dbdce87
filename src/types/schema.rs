//! Canonical column names shared by every weather table in this crate.
//!
//! All sources converge on (a subset of) this vocabulary before the calendar
//! normalization step; no module invents column names of its own.

/// Name of the time column every frame is indexed by (millisecond datetimes).
pub const TIME: &str = "time";

/// Global horizontal irradiance, W/m².
pub const GHI: &str = "ghi";
/// Direct normal irradiance, W/m².
pub const DNI: &str = "dni";
/// Diffuse horizontal irradiance, W/m².
pub const DHI: &str = "dhi";

/// Total irradiance on the collector plane, W/m².
pub const POA_GLOBAL: &str = "poa_global";
/// Beam irradiance on the collector plane, W/m².
pub const POA_DIRECT: &str = "poa_direct";
/// Sky plus ground diffuse irradiance on the collector plane, W/m².
pub const POA_DIFFUSE: &str = "poa_diffuse";
/// Sky diffuse irradiance on the collector plane, W/m².
pub const POA_SKY_DIFFUSE: &str = "poa_sky_diffuse";
/// Ground-reflected irradiance on the collector plane, W/m².
pub const POA_GROUND_DIFFUSE: &str = "poa_ground_diffuse";

/// Sun height above the horizon, degrees.
pub const SOLAR_ELEVATION: &str = "solar_elevation";
/// Outdoor air temperature at 2 m, °C.
pub const TEMP_AIR: &str = "temp_air";
/// Wind speed at 10 m, m/s.
pub const WIND_SPEED: &str = "wind_speed";

/// Post-processed reanalysis radiation before it is renamed to [`GHI`].
pub const GLOBAL_IRRADIANCE: &str = "global_irradiance";
/// Post-processed reanalysis temperature before it is renamed to [`TEMP_AIR`].
pub const AIR_TEMPERATURE: &str = "air_temperature";

/// The full harmonized-table vocabulary, in output order.
///
/// A given source emits the subset it can supply; see the source strategies
/// on [`crate::SolarMet`].
pub fn harmonized_columns() -> [&'static str; 12] {
    [
        TIME,
        GHI,
        DNI,
        DHI,
        POA_GLOBAL,
        POA_DIRECT,
        POA_DIFFUSE,
        POA_SKY_DIFFUSE,
        POA_GROUND_DIFFUSE,
        SOLAR_ELEVATION,
        TEMP_AIR,
        WIND_SPEED,
    ]
}
