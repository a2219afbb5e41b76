use crate::core::geometry::{acosd, cosd, sind, SceneGeometry};
use crate::types::{CENTER_WAVELENGTH, NUM_BANDS, RAYLEIGH_GAMMA, SOLAR_IRRADIANCE};
use std::f64::consts::PI;

/// Per-band Rayleigh scattering terms for the scene geometry
///
/// All closed-form (Dash et al. 2012 and references therein); malformed
/// geometry propagates as NaN rather than failing.
#[derive(Debug, Clone)]
pub struct RayleighModel {
    /// Scattering angle between sun and sensor (degrees)
    pub scattering_angle: f64,
    /// Rayleigh scattering phase function per band (Bucholtz 1995)
    pub phase_function: [f64; NUM_BANDS],
    /// Rayleigh optical thickness per band at standard sea-level pressure
    pub optical_thickness: [f64; NUM_BANDS],
    /// Rayleigh path radiance per band (W/m2/um/sr)
    pub path_radiance: [f64; NUM_BANDS],
}

impl RayleighModel {
    pub fn compute(geom: &SceneGeometry) -> Self {
        // Scattering angle via the spherical law of cosines in angle space
        let theta = acosd(
            cosd(90.0 - geom.sun_elevation) * cosd(90.0 - geom.sat_elevation)
                - sind(90.0 - geom.sun_elevation)
                    * sind(90.0 - geom.sat_elevation)
                    * cosd(geom.relative_azimuth),
        );

        let mut phase_function = [0.0; NUM_BANDS];
        let mut optical_thickness = [0.0; NUM_BANDS];
        let mut path_radiance = [0.0; NUM_BANDS];

        // Single-scattering albedo is taken as 1
        let w0 = 1.0;
        for d in 0..NUM_BANDS {
            let gamma = RAYLEIGH_GAMMA[d];
            phase_function[d] = (3.0 / (4.0 * (1.0 + 2.0 * gamma)))
                * ((1.0 + 3.0 * gamma) + (1.0 - gamma) * cosd(theta).powi(2));

            // Hansen and Travis; Dash et al. 2012 eq 7, P == P_0 (1013.25 mb)
            let cw = CENTER_WAVELENGTH[d];
            optical_thickness[d] = 0.008_569
                * cw.powi(-4)
                * (1.0 + 0.0113 * cw.powi(-2) + 0.000_13 * cw.powi(-4));

            // Path radiance, Dash et al. 2012 eq 16
            path_radiance[d] = ((SOLAR_IRRADIANCE[d] / geom.earth_sun_distance)
                * w0
                * optical_thickness[d]
                * phase_function[d])
                / (4.0 * PI * cosd(90.0 - geom.sat_elevation));
        }

        log::debug!("rayleigh: theta={:.3} tau={:?}", theta, optical_thickness);

        Self {
            scattering_angle: theta,
            phase_function,
            optical_thickness,
            path_radiance,
        }
    }
}
