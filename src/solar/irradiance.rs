//! Broadband irradiance models: airmass, a simple clear-sky model, the DISC
//! beam decomposition and the isotropic plane-of-array transposition.

use crate::solar::position::SolarPosition;

/// Solar constant used by the broadband models, W/m².
pub const SOLAR_CONSTANT: f64 = 1367.0;

/// Ground reflectance used when none is given.
pub const DEFAULT_ALBEDO: f64 = 0.25;

/// DISC returns no beam above this zenith angle; the regression was never
/// fitted that close to the horizon.
const MAX_DISC_ZENITH_DEG: f64 = 87.0;

/// Relative optical airmass after Kasten (1965).
///
/// Returns `None` once the sun reaches the horizon. The value is 1 for an
/// overhead sun and grows to roughly 36 just above the horizon.
pub fn relative_airmass(zenith_deg: f64) -> Option<f64> {
    if !(0.0..90.0).contains(&zenith_deg) {
        return None;
    }
    let cos_zenith = zenith_deg.to_radians().cos();
    Some(1.0 / (cos_zenith + 0.15 * (93.885 - zenith_deg).powf(-1.253)))
}

/// Cloud-free irradiance components for one sun position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClearskyIrradiance {
    pub ghi: f64,
    pub dni: f64,
    pub dhi: f64,
}

/// Simple clear-sky model: bulk atmospheric transmittance of 0.7 raised to
/// `airmass^0.678`, with diffuse taken as 10 % of the horizontal beam.
///
/// The closure `ghi = dni * cos(zenith) + dhi` holds exactly by construction.
/// All components are zero when the sun is below the horizon.
pub fn clearsky_irradiance(zenith_deg: f64) -> ClearskyIrradiance {
    match relative_airmass(zenith_deg) {
        Some(airmass) => {
            let dni = SOLAR_CONSTANT * 0.7f64.powf(airmass.powf(0.678));
            let cos_zenith = zenith_deg.to_radians().cos();
            let dhi = 0.1 * dni * cos_zenith;
            ClearskyIrradiance {
                ghi: dni * cos_zenith + dhi,
                dni,
                dhi,
            }
        }
        None => ClearskyIrradiance::default(),
    }
}

/// Estimates direct normal irradiance from global horizontal irradiance with
/// the DISC model (Maxwell 1987).
///
/// The model regresses the clearness index against the direct beam
/// transmittance. Zero is returned for non-positive input, for zenith angles
/// beyond 87° and whenever the regression would go negative.
pub fn disc_dni(ghi: f64, zenith_deg: f64, day_of_year: u32) -> f64 {
    if ghi <= 0.0 || !(0.0..=MAX_DISC_ZENITH_DEG).contains(&zenith_deg) {
        return 0.0;
    }
    let Some(airmass) = relative_airmass(zenith_deg) else {
        return 0.0;
    };

    let extraterrestrial = SOLAR_CONSTANT
        * (1.0 + 0.033 * (2.0 * std::f64::consts::PI * f64::from(day_of_year) / 365.0).cos());
    let cos_zenith = zenith_deg.to_radians().cos();
    let kt = (ghi / (extraterrestrial * cos_zenith)).clamp(0.0, 1.0);

    let (a, b, c) = if kt > 0.6 {
        (
            -5.743 + 21.77 * kt - 27.49 * kt.powi(2) + 11.56 * kt.powi(3),
            41.4 - 118.5 * kt + 66.05 * kt.powi(2) + 31.9 * kt.powi(3),
            -47.01 + 184.2 * kt - 222.0 * kt.powi(2) + 73.81 * kt.powi(3),
        )
    } else {
        (
            0.512 - 1.56 * kt + 2.286 * kt.powi(2) - 2.222 * kt.powi(3),
            0.37 + 0.962 * kt,
            -0.28 + 0.932 * kt - 2.048 * kt.powi(2),
        )
    };

    let delta_kn = a + b * (c * airmass).exp();
    let knc = 0.886 - 0.122 * airmass + 0.0121 * airmass.powi(2) - 0.000653 * airmass.powi(3)
        + 0.000014 * airmass.powi(4);

    (extraterrestrial * (knc - delta_kn)).max(0.0)
}

/// Irradiance received by a tilted collector plane, W/m².
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoaIrradiance {
    pub direct: f64,
    pub sky_diffuse: f64,
    pub ground_diffuse: f64,
}

impl PoaIrradiance {
    /// Total plane-of-array irradiance.
    pub fn global(&self) -> f64 {
        self.direct + self.sky_diffuse + self.ground_diffuse
    }

    /// Diffuse plane-of-array irradiance (sky plus ground).
    pub fn diffuse(&self) -> f64 {
        self.sky_diffuse + self.ground_diffuse
    }
}

/// Transposes horizontal irradiance components onto a tilted plane with the
/// isotropic sky model.
///
/// Surface azimuth follows the compass convention (180° = facing South).
/// The beam term uses the incidence cosine between the sun vector and the
/// surface normal in east-north-up coordinates, floored at zero so a sun
/// behind the plane contributes nothing.
pub fn isotropic_poa(
    surface_tilt_deg: f64,
    surface_azimuth_deg: f64,
    position: &SolarPosition,
    ghi: f64,
    dni: f64,
    dhi: f64,
    albedo: f64,
) -> PoaIrradiance {
    let tilt_rad = surface_tilt_deg.to_radians();

    let cos_incidence = if position.is_above_horizon() {
        let alt = position.elevation_deg.to_radians();
        let az = position.azimuth_deg.to_radians();
        let surface_az = surface_azimuth_deg.to_radians();
        (tilt_rad.sin() * surface_az.sin() * alt.cos() * az.sin()
            + tilt_rad.sin() * surface_az.cos() * alt.cos() * az.cos()
            + tilt_rad.cos() * alt.sin())
        .max(0.0)
    } else {
        0.0
    };

    PoaIrradiance {
        direct: dni * cos_incidence,
        sky_diffuse: dhi * (1.0 + tilt_rad.cos()) / 2.0,
        ground_diffuse: ghi * albedo * (1.0 - tilt_rad.cos()) / 2.0,
    }
}
