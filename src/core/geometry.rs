use crate::types::{BenthosError, BenthosResult, SceneMetadata};
use chrono::{Datelike, Timelike};

/// Degree-argument trigonometry helpers shared by the geometry, Rayleigh and
/// surface-optics computations.
pub(crate) fn cosd(deg: f64) -> f64 {
    deg.to_radians().cos()
}

pub(crate) fn sind(deg: f64) -> f64 {
    deg.to_radians().sin()
}

pub(crate) fn tand(deg: f64) -> f64 {
    deg.to_radians().tan()
}

pub(crate) fn asind(x: f64) -> f64 {
    x.asin().to_degrees()
}

pub(crate) fn acosd(x: f64) -> f64 {
    x.acos().to_degrees()
}

/// Solar/view geometry derived from the scene acquisition metadata
///
/// Holds the Earth-Sun distance factor and the atmospheric transmittance
/// cosines consumed by the Rayleigh model and the reflectance conversion.
#[derive(Debug, Clone)]
pub struct SceneGeometry {
    pub julian_date: f64,
    /// Earth-Sun distance factor, validated to lie in [0.983, 1.017]
    pub earth_sun_distance: f64,
    /// Solar zenith angle (degrees), 90 - sun elevation
    pub solar_zenith: f64,
    /// Atmospheric spectral transmittance cosine in the solar path
    pub tz: f64,
    /// Atmospheric spectral transmittance cosine in the view path
    pub tv: f64,
    /// Relative azimuth between sensor and sun (degrees)
    pub relative_azimuth: f64,
    pub sun_elevation: f64,
    pub sat_elevation: f64,
    pub off_nadir: f64,
}

impl SceneGeometry {
    /// Derive scene geometry from acquisition metadata.
    ///
    /// Fails when the computed Earth-Sun distance falls outside the physical
    /// range [0.983, 1.017]; the scene is rejected rather than processed with
    /// broken geometry.
    pub fn from_metadata(meta: &SceneMetadata) -> BenthosResult<Self> {
        let aq = meta.acquisition;
        let jd = julian_date(
            aq.year() as f64,
            aq.month() as f64,
            aq.day() as f64,
            aq.hour() as f64,
            aq.minute() as f64,
            aq.second() as f64,
        );

        let d = jd - 2_451_545.0;
        // Solar mean anomaly with harmonic Earth-Sun distance correction
        let degs = 357.529 + 0.985_600_28 * d;
        let esd = 1.00014 - 0.01671 * cosd(degs) - 0.00014 * cosd(2.0 * degs);
        if !(esd > 0.983 && esd < 1.017) {
            return Err(BenthosError::Geometry { esd });
        }

        let solar_zenith = 90.0 - meta.sun_elevation;
        let tz = cosd(solar_zenith);
        let tv = cosd(meta.off_nadir);

        // Azimuths normalized to (-180, 180] before the relative azimuth
        let sun_az = normalize_azimuth(meta.sun_azimuth);
        let sat_az = normalize_azimuth(meta.sat_azimuth);
        let relative_azimuth = (sat_az - 180.0 - sun_az).abs();

        log::debug!(
            "scene geometry: JD={:.4} ESd={:.6} TZ={:.4} TV={:.4} rel_az={:.2}",
            jd, esd, tz, tv, relative_azimuth
        );

        Ok(Self {
            julian_date: jd,
            earth_sun_distance: esd,
            solar_zenith,
            tz,
            tv,
            relative_azimuth,
            sun_elevation: meta.sun_elevation,
            sat_elevation: meta.sat_elevation,
            off_nadir: meta.off_nadir,
        })
    }
}

/// Gregorian to Julian date conversion. December and January roll into the
/// prior "year" per the conventional two-month offset rule.
fn julian_date(year: f64, month: f64, day: f64, hour: f64, minute: f64, second: f64) -> f64 {
    let (year, month) = if month == 1.0 || month == 2.0 {
        (year - 1.0, month + 12.0)
    } else {
        (year, month)
    };
    let ut = hour + minute / 60.0 + second / 3600.0;
    let b1 = (year / 100.0).trunc();
    let b2 = 2.0 - b1 + (b1 / 4.0).trunc();
    (365.25 * (year + 4716.0)).trunc() + (30.6001 * (month + 1.0)).trunc() + day + ut / 24.0 + b2
        - 1524.5
}

fn normalize_azimuth(az: f64) -> f64 {
    if az > 180.0 {
        az - 360.0
    } else {
        az
    }
}
