use crate::core::glint::{CorrectionContext, GlintCorrection};
use crate::types::{BandCube, BandPlane, NUM_BANDS};
use ndarray::{Array2, Axis, Zip};

/// Above- to below-surface reflectance corrector
///
/// Applies the scene's glint correction when one exists, converts the first
/// five bands to subsurface reflectance through the zeta/G ratio transform,
/// and derives the Stumpf relative-depth index. Operates per pixel with no
/// cross-pixel state.
pub struct SubsurfaceCorrector<'a> {
    ctx: &'a CorrectionContext,
}

impl<'a> SubsurfaceCorrector<'a> {
    pub fn new(ctx: &'a CorrectionContext) -> Self {
        Self { ctx }
    }

    /// Correct one pixel in place (bands 0-4 overwritten with subsurface
    /// values) and return its relative depth, 0 when invalid.
    ///
    /// The depth band pair differs between the two paths: the deglinted path
    /// rates bands 1/2, the glint-free path bands 2/3 (1-indexed).
    pub fn correct_pixel(&self, bands: &mut [f32; NUM_BANDS]) -> f32 {
        match &self.ctx.glint {
            Some(correction) => self.correct_pixel_deglinted(bands, correction),
            None => self.correct_pixel_glint_free(bands),
        }
    }

    fn correct_pixel_deglinted(
        &self,
        bands: &mut [f32; NUM_BANDS],
        correction: &GlintCorrection,
    ) -> f32 {
        let zeta = self.ctx.optics.zeta;
        let g = self.ctx.optics.g;
        let mut deglinted = [0.0f32; 6];
        for (d, value) in deglinted.iter_mut().enumerate() {
            let nir = GlintCorrection::reference_band(d);
            let floor = if nir == 7 { self.ctx.mn_nir2 } else { self.ctx.mn_nir1 };
            *value = bands[d] - correction.slopes[d] * (bands[nir] - floor);
        }
        for d in 0..5 {
            bands[d] = deglinted[d] / (zeta + g * deglinted[d]);
        }
        clip_depth(stumpf_ratio(bands[0], bands[1]))
    }

    /// Ratio transform without deglinting; also serves the classifier's
    /// fallback branch, which stays glint-free even for deglinted scenes.
    pub fn correct_pixel_glint_free(&self, bands: &mut [f32; NUM_BANDS]) -> f32 {
        let zeta = self.ctx.optics.zeta;
        let g = self.ctx.optics.g;
        for d in 0..5 {
            bands[d] = bands[d] / (zeta + g * bands[d]);
        }
        clip_depth(stumpf_ratio(bands[1], bands[2]))
    }

    /// Correct the whole reflectance cube in place and return the relative
    /// depth raster. No-data pixels (NaN coastal band) are left untouched
    /// with depth 0.
    pub fn correct_raster(&self, rrs: &mut BandCube) -> BandPlane {
        let (rows, cols, _) = rrs.dim();
        let mut bathy = Array2::<f32>::zeros((rows, cols));
        Zip::from(rrs.lanes_mut(Axis(2)))
            .and(&mut bathy)
            .par_for_each(|mut lane, depth| {
                if lane[0].is_nan() {
                    return;
                }
                let mut bands: [f32; NUM_BANDS] = std::array::from_fn(|d| lane[d]);
                *depth = self.correct_pixel(&mut bands);
                for d in 0..NUM_BANDS {
                    lane[d] = bands[d];
                }
            });
        bathy
    }
}

/// Stumpf 2003 ratio transform for relative depth in optically shallow water
pub(crate) fn stumpf_ratio(rrs_num: f32, rrs_den: f32) -> f32 {
    (1000.0 * rrs_num).ln() / (1000.0 * rrs_den).ln()
}

/// Depth values outside (0, 2) are invalid and recorded as 0
pub(crate) fn clip_depth(dp: f32) -> f32 {
    if dp > 0.0 && dp < 2.0 {
        dp
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::glint::SurfaceOptics;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn glint_free_ctx() -> CorrectionContext {
        CorrectionContext {
            optics: SurfaceOptics { zeta: 0.52, g: 1.56 },
            glint: None,
            mn_nir1: f32::NAN,
            mn_nir2: f32::NAN,
        }
    }

    fn deglinted_ctx() -> CorrectionContext {
        CorrectionContext {
            optics: SurfaceOptics { zeta: 0.52, g: 1.56 },
            glint: Some(GlintCorrection { slopes: [0.5; 6] }),
            mn_nir1: 0.01,
            mn_nir2: 0.005,
        }
    }

    #[test]
    fn test_depth_clipping_boundaries() {
        // ln(1000*r1)/ln(1000*r2) hits exactly 2 when 1000*r1 = (1000*r2)^2
        assert_eq!(clip_depth(stumpf_ratio(0.004, 0.002)), 0.0);
        // Numerator exactly 1/1000 gives dp = 0
        assert_eq!(clip_depth(stumpf_ratio(0.001, 0.002)), 0.0);
        // Negative ratio
        assert_eq!(clip_depth(stumpf_ratio(0.0005, 0.002)), 0.0);
        // Mid-range value survives
        let dp = clip_depth(stumpf_ratio(0.003, 0.002));
        assert_relative_eq!(dp, (3.0f32).ln() / (2.0f32).ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_glint_free_ratio_transform() {
        let ctx = glint_free_ctx();
        let corrector = SubsurfaceCorrector::new(&ctx);
        let mut bands = [0.02, 0.01, 0.05, 0.04, 0.03, 0.02, 0.01, 0.005];
        let original = bands;
        corrector.correct_pixel_glint_free(&mut bands);
        for d in 0..5 {
            let expected = original[d] / (0.52 + 1.56 * original[d]);
            assert_relative_eq!(bands[d], expected, epsilon = 1e-6);
        }
        // Bands 5-7 stay above-surface
        assert_eq!(&bands[5..], &original[5..]);
    }

    #[test]
    fn test_glint_free_depth_uses_bands_two_three() {
        let ctx = glint_free_ctx();
        let corrector = SubsurfaceCorrector::new(&ctx);
        let mut bands = [0.02, 0.01, 0.05, 0.04, 0.03, 0.02, 0.01, 0.005];
        let dp = corrector.correct_pixel(&mut bands);
        assert_relative_eq!(dp, stumpf_ratio(bands[1], bands[2]), epsilon = 1e-6);
        assert!(dp > 0.0 && dp < 2.0);
    }

    #[test]
    fn test_deglint_subtracts_scaled_nir_excess() {
        let ctx = deglinted_ctx();
        let corrector = SubsurfaceCorrector::new(&ctx);
        let mut bands = [0.06, 0.05, 0.05, 0.05, 0.05, 0.05, 0.03, 0.025];
        let dp = corrector.correct_pixel(&mut bands);
        // Band 0 references NIR2: 0.06 - 0.5*(0.025 - 0.005) = 0.05
        let expected0 = 0.05f32 / (0.52 + 1.56 * 0.05);
        // Band 1 references NIR1: 0.05 - 0.5*(0.03 - 0.01) = 0.04
        let expected1 = 0.04f32 / (0.52 + 1.56 * 0.04);
        assert_relative_eq!(bands[0], expected0, epsilon = 1e-6);
        assert_relative_eq!(bands[1], expected1, epsilon = 1e-6);
        assert_relative_eq!(dp, stumpf_ratio(expected0, expected1), epsilon = 1e-6);
    }

    #[test]
    fn test_deglinted_band5_not_transformed() {
        let ctx = deglinted_ctx();
        let corrector = SubsurfaceCorrector::new(&ctx);
        let mut bands = [0.06, 0.05, 0.05, 0.05, 0.05, 0.05, 0.03, 0.025];
        corrector.correct_pixel(&mut bands);
        // The red-edge band keeps its above-surface value
        assert_relative_eq!(bands[5], 0.05);
    }

    #[test]
    fn test_raster_correction_skips_nodata() {
        let ctx = glint_free_ctx();
        let corrector = SubsurfaceCorrector::new(&ctx);
        let mut rrs = Array3::<f32>::from_elem((1, 2, NUM_BANDS), 0.02);
        for d in 0..NUM_BANDS {
            rrs[[0, 1, d]] = f32::NAN;
        }
        let bathy = corrector.correct_raster(&mut rrs);
        assert!(!rrs[[0, 0, 0]].is_nan());
        assert!(rrs[[0, 1, 0]].is_nan());
        assert_eq!(bathy[[0, 1]], 0.0);
    }
}
