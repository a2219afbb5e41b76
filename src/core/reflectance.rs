use crate::core::geometry::SceneGeometry;
use crate::core::rayleigh::RayleighModel;
use crate::types::{
    BandCube, EFFECTIVE_BANDWIDTH, NUM_BANDS, SATURATION_DN, SOLAR_IRRADIANCE,
};
use ndarray::{Axis, Zip};
use std::f64::consts::PI;

/// Digital-count to above-surface remote-sensing reflectance converter
///
/// Folds calibration factor, bandwidth, irradiance, Earth-Sun distance and
/// Rayleigh path radiance into per-band affine coefficients so the whole
/// raster converts as `Rrs = DN * c1 - c2`.
#[derive(Debug, Clone)]
pub struct ReflectanceConverter {
    pub c1: [f32; NUM_BANDS],
    pub c2: [f32; NUM_BANDS],
    /// When set, pixels whose raw counts are all in {0, SATURATION_DN} are
    /// masked to NaN across all bands before conversion. Off by default;
    /// orthorectified products resample the sentinel values away.
    pub mask_sentinel_nodata: bool,
}

impl ReflectanceConverter {
    pub fn new(
        geom: &SceneGeometry,
        rayleigh: &RayleighModel,
        abs_cal_factor: &[f64; NUM_BANDS],
    ) -> Self {
        let esd2 = geom.earth_sun_distance * geom.earth_sun_distance;
        let mut c1 = [0.0f32; NUM_BANDS];
        let mut c2 = [0.0f32; NUM_BANDS];
        for d in 0..NUM_BANDS {
            let denom = SOLAR_IRRADIANCE[d] * geom.tz * geom.tv;
            c1[d] = ((PI * esd2 * abs_cal_factor[d]) / (denom * EFFECTIVE_BANDWIDTH[d])) as f32;
            c2[d] = ((PI * rayleigh.path_radiance[d] * esd2) / denom) as f32;
        }
        log::debug!("reflectance coefficients: c1={:?} c2={:?}", c1, c2);
        Self {
            c1,
            c2,
            mask_sentinel_nodata: false,
        }
    }

    pub fn with_sentinel_masking(mut self, enabled: bool) -> Self {
        self.mask_sentinel_nodata = enabled;
        self
    }

    /// Convert a raw digital-count cube to above-surface reflectance.
    ///
    /// Pure per-pixel affine map; the raw cube can be dropped afterwards.
    pub fn convert(&self, raw: &BandCube) -> BandCube {
        let mut rrs = raw.clone();
        Zip::from(rrs.lanes_mut(Axis(2))).par_for_each(|mut lane| {
            if self.mask_sentinel_nodata
                && lane.iter().all(|&v| v == 0.0 || v == SATURATION_DN)
            {
                lane.fill(f32::NAN);
                return;
            }
            for d in 0..NUM_BANDS {
                lane[d] = lane[d] * self.c1[d] - self.c2[d];
            }
        });
        rrs
    }
}
