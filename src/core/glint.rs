use crate::core::geometry::{asind, sind, tand, SceneGeometry};
use crate::core::sampler::{WaterSample, WaterTag};

/// Kerr et al. 2018 eq. 3 constant
pub const G: f64 = 1.56;
/// Refractive index of air
pub const N_AIR: f64 = 1.000_29;
/// Refractive index of seawater
pub const N_WATER: f64 = 1.34;

/// Fraction of glint-tagged water rows above which the scene is deglinted
const GLINT_FRACTION: f64 = 0.25;

/// Above- to below-surface reflectance constants for the scene geometry
///
/// `zeta` (~0.52) combines the air-water and water-air Fresnel reflectances
/// via Snell's law (Mobley 1994); the ratio transform is
/// `rrs = Rrs / (zeta + G * Rrs)`.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceOptics {
    pub zeta: f32,
    pub g: f32,
}

impl SurfaceOptics {
    pub fn from_geometry(geom: &SceneGeometry) -> Self {
        let inc_ang = 90.0 - geom.sun_elevation;
        // Incident angle for water-air light from Snell's law
        let inc_ang2 = asind(sind(90.0 - geom.sat_elevation) * N_WATER / N_AIR);
        // Transmission angles for air-water and water-air incident light
        let trans_aw = asind(sind(inc_ang) * N_AIR / N_WATER);
        let trans_wa = 90.0 - geom.sat_elevation;

        // Fresnel reflectances (Mobley 1994)
        let pf1 = 0.5
            * ((sind(inc_ang - trans_aw) / sind(inc_ang + trans_aw)).powi(2)
                + (tand(inc_ang - trans_aw) / tand(inc_ang + trans_aw)).powi(2));
        let pf2 = 0.5
            * ((sind(inc_ang2 - trans_wa) / sind(inc_ang2 + trans_wa)).powi(2)
                + (tand(inc_ang2 - trans_wa) / tand(inc_ang2 + trans_wa)).powi(2));

        let zeta = (1.0 - pf1) * (1.0 - pf2) / (N_WATER * N_WATER);
        log::debug!("surface optics: zeta={:.4} G={}", zeta, G);
        Self {
            zeta: zeta as f32,
            g: G as f32,
        }
    }
}

/// Per-band sun-glint regression slopes (Hedley et al. 2005)
///
/// Slope index order matches the band order; bands 0, 3 and 5 are referenced
/// against NIR2, bands 1, 2 and 4 against NIR1.
#[derive(Debug, Clone, Copy)]
pub struct GlintCorrection {
    pub slopes: [f32; 6],
}

impl GlintCorrection {
    /// NIR reference band index for a corrected band
    pub fn reference_band(band: usize) -> usize {
        match band {
            0 | 3 | 5 => 7,
            _ => 6,
        }
    }
}

/// Decide whether the scene needs deglinting and fit the correction.
///
/// A correction vector exists if and only if more than 25% of the water
/// table rows carry a glint tag. Each slope is the no-intercept
/// least-squares solve of `band * m = nir` over the table.
pub fn estimate_glint(table: &[WaterSample]) -> Option<GlintCorrection> {
    let total = table.len();
    let glinted = table.iter().filter(|s| s.tag != WaterTag::GlintFree).count();
    if (glinted as f64) <= GLINT_FRACTION * total as f64 {
        log::info!(
            "glint-free scene: {} of {} water rows glinted",
            glinted, total
        );
        return None;
    }

    let mut slopes = [0.0f32; 6];
    for (band, slope) in slopes.iter_mut().enumerate() {
        let nir = GlintCorrection::reference_band(band);
        let (sxy, sxx) = table
            .iter()
            .map(|s| (s.bands[band] as f64, s.bands[nir] as f64))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold((0.0, 0.0), |(sxy, sxx), (x, y)| (sxy + x * y, sxx + x * x));
        *slope = (sxy / sxx) as f32;
    }
    log::info!(
        "deglinting: {} of {} water rows glinted, slopes {:?}",
        glinted, total, slopes
    );
    Some(GlintCorrection { slopes })
}

/// Immutable scene correction context produced by the sampling stage and
/// consumed read-only by the subsurface corrector and the classifier.
#[derive(Debug, Clone)]
pub struct CorrectionContext {
    pub optics: SurfaceOptics,
    pub glint: Option<GlintCorrection>,
    /// Positive minimum NIR1 over the water table (glint reference floor)
    pub mn_nir1: f32,
    /// Positive minimum NIR2 over the water table (glint reference floor)
    pub mn_nir2: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(bands: [f32; 8], tag: WaterTag) -> WaterSample {
        WaterSample { bands, tag }
    }

    fn table(total: usize, glinted: usize) -> Vec<WaterSample> {
        let mut rows = Vec::with_capacity(total);
        for i in 0..total {
            let tag = if i < glinted {
                WaterTag::GlintedDescending
            } else {
                WaterTag::GlintFree
            };
            rows.push(sample([0.02; 8], tag));
        }
        rows
    }

    #[test]
    fn test_threshold_exactly_25_percent_is_glint_free() {
        assert!(estimate_glint(&table(1000, 250)).is_none());
    }

    #[test]
    fn test_threshold_just_below() {
        assert!(estimate_glint(&table(1000, 249)).is_none());
    }

    #[test]
    fn test_threshold_just_above() {
        assert!(estimate_glint(&table(1000, 251)).is_some());
    }

    #[test]
    fn test_empty_table_is_glint_free() {
        assert!(estimate_glint(&[]).is_none());
    }

    #[test]
    fn test_regression_slopes() {
        // band value 2.0, NIR reference 1.0 everywhere: slope = 2/4 = 0.5
        let rows: Vec<WaterSample> = (0..10)
            .map(|_| sample([2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 1.0, 1.0], WaterTag::GlintedAscending))
            .collect();
        let correction = estimate_glint(&rows).unwrap();
        for slope in correction.slopes {
            assert_relative_eq!(slope, 0.5);
        }
    }

    #[test]
    fn test_reference_band_split() {
        assert_eq!(GlintCorrection::reference_band(0), 7);
        assert_eq!(GlintCorrection::reference_band(1), 6);
        assert_eq!(GlintCorrection::reference_band(2), 6);
        assert_eq!(GlintCorrection::reference_band(3), 7);
        assert_eq!(GlintCorrection::reference_band(4), 6);
        assert_eq!(GlintCorrection::reference_band(5), 7);
    }

    #[test]
    fn test_non_finite_rows_skipped() {
        let mut rows = table(4, 4);
        rows.push(sample([f32::NAN; 8], WaterTag::GlintedDescending));
        let correction = estimate_glint(&rows).unwrap();
        assert!(correction.slopes.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_surface_optics_zeta_near_mobley_constant() {
        let geom = SceneGeometry {
            julian_date: 2_458_110.2,
            earth_sun_distance: 0.9837,
            solar_zenith: 24.5,
            tz: 0.91,
            tv: 0.99,
            relative_azimuth: 125.0,
            sun_elevation: 65.5,
            sat_elevation: 82.0,
            off_nadir: 7.2,
        };
        let optics = SurfaceOptics::from_geometry(&geom);
        // rrs constant is ~0.52 (Mobley 1994)
        assert!(optics.zeta > 0.50 && optics.zeta < 0.56);
        assert_relative_eq!(optics.g, 1.56);
    }
}
