use crate::core::glint::SurfaceOptics;
use crate::types::{BandCube, NUM_BANDS};
use ndarray::parallel::prelude::*;
use ndarray::Axis;

/// Glint tag attached to each water-table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WaterTag {
    /// No band-ordering glint signature
    GlintFree = 1,
    /// NIR-descending band ordering (B8<B7, B6<B7, B6<B5, B4<B5, B4<B3)
    GlintedDescending = 2,
    /// The mirror NIR-ascending ordering
    GlintedAscending = 3,
}

/// One water-classified pixel: full band vector plus its glint tag
#[derive(Debug, Clone, Copy)]
pub struct WaterSample {
    pub bands: [f32; NUM_BANDS],
    pub tag: WaterTag,
}

/// Running accumulators for the single sampling pass.
///
/// Write-only during the pass, merged across parallel row chunks, then
/// finalized into `SceneStats`. All reductions are order-insensitive.
#[derive(Debug, Default)]
pub struct SampleAccumulators {
    pub valid_pixels: usize,
    /// Coastal-band values of every valid pixel, for the cloud threshold
    coastal_values: Vec<f32>,
    sand_developed_sums: Vec<f32>,
    veg_sums: Vec<f32>,
    mangrove_sums: Vec<f32>,
    dead_veg_residuals: Vec<f32>,
    water_rrs_sums: Vec<f32>,
    pub water_table: Vec<WaterSample>,
}

/// Scene-adaptive statistics consumed by the decision-tree classifier
#[derive(Debug, Clone)]
pub struct SceneStats {
    pub valid_pixels: usize,
    pub water_rows: usize,
    pub glinted_rows: usize,
    /// Mean of band-6..7 sums over sand/developed sample pixels
    pub avg_sand_developed_sum: f32,
    pub std_sand_developed_sum: f32,
    /// Mean of band-3..4 sums over vegetation sample pixels
    pub avg_veg_sum: f32,
    /// Mean NIR1 value over vegetation sample pixels
    pub avg_mangrove_sum: f32,
    /// Mean dead-vegetation residual over vegetation sample pixels
    pub avg_dead_veg: f32,
    /// Mean of non-zero subsurface green+yellow sums over quality water pixels
    pub avg_water_sum: f32,
    /// Positive minimum NIR1 across the water table (deglint floor)
    pub mn_nir1: f32,
    /// Positive minimum NIR2 across the water table (deglint floor)
    pub mn_nir2: f32,
    /// Coastal-band cloud mask threshold from metadata cloud cover
    pub cloud_threshold: f32,
}

fn nd(a: f32, b: f32) -> f32 {
    (a - b) / (a + b)
}

fn nir_descending(b: &[f32; NUM_BANDS]) -> bool {
    b[7] < b[6] && b[5] < b[6] && b[5] < b[4] && b[3] < b[4] && b[3] < b[2]
}

fn nir_ascending(b: &[f32; NUM_BANDS]) -> bool {
    b[7] > b[6] && b[5] > b[6] && b[5] > b[4] && b[3] > b[4] && b[3] > b[2]
}

impl SampleAccumulators {
    /// Feed one pixel through the coarse sampling tree. At most one branch
    /// fires per pixel; branches are tested in priority order.
    pub fn observe(&mut self, b: &[f32; NUM_BANDS], optics: &SurfaceOptics) {
        if b[0].is_nan() {
            return;
        }
        self.valid_pixels += 1;
        self.coastal_values.push(b[0]);

        if nd(b[6], b[1]) < 0.65 && b[4] > b[3] && b[3] > b[2] {
            // Sand & developed
            self.sand_developed_sums.push(b[5] + b[6]);
        } else if nd(b[7], b[4]) > 0.6 && b[6] > b[2] {
            // Vegetation (excluding grass), gated by a shadow filter
            if nd(b[6], b[1]) > 0.20 {
                self.veg_sums.push(b[2] + b[3]);
                self.mangrove_sums.push(b[6]);
                // Difference of predicted red value from the actual value
                self.dead_veg_residuals
                    .push((b[6] - b[3]) / 3.0 + b[3] - b[4]);
            }
        } else if b[7] < 0.11 && b.iter().all(|&v| v > 0.0) {
            // Glint-free water. Every qualifying pixel becomes a table row;
            // only rows passing the quality sub-test feed the water-sum mean.
            let zeta = optics.zeta;
            let g = optics.g;
            let mut sub = [0.0f32; 5];
            for d in 0..5 {
                sub[d] = b[d] / (zeta + g * b[d]);
            }
            if sub[3] > sub[1] && sub[3] < 0.12 && sub[4] < sub[2] {
                self.water_rrs_sums.push(sub[2] + sub[3]);
            }
            // NDGI-style ordering tags glinted water (some confusion w/ clouds)
            let tag = if nir_descending(b) {
                WaterTag::GlintedDescending
            } else if nir_ascending(b) {
                WaterTag::GlintedAscending
            } else {
                WaterTag::GlintFree
            };
            self.water_table.push(WaterSample { bands: *b, tag });
        } else if nir_descending(b) {
            self.water_table.push(WaterSample {
                bands: *b,
                tag: WaterTag::GlintedDescending,
            });
        } else if nir_ascending(b) {
            self.water_table.push(WaterSample {
                bands: *b,
                tag: WaterTag::GlintedAscending,
            });
        }
    }

    pub fn merge(mut self, mut other: Self) -> Self {
        self.valid_pixels += other.valid_pixels;
        self.coastal_values.append(&mut other.coastal_values);
        self.sand_developed_sums.append(&mut other.sand_developed_sums);
        self.veg_sums.append(&mut other.veg_sums);
        self.mangrove_sums.append(&mut other.mangrove_sums);
        self.dead_veg_residuals.append(&mut other.dead_veg_residuals);
        self.water_rrs_sums.append(&mut other.water_rrs_sums);
        self.water_table.append(&mut other.water_table);
        self
    }

    pub fn glinted_rows(&self) -> usize {
        self.water_table
            .iter()
            .filter(|s| s.tag != WaterTag::GlintFree)
            .count()
    }

    /// Collapse the accumulators into scene statistics. Empty sample sets
    /// produce NaN means (degenerate scene); NaN propagates through the
    /// classifier's comparisons instead of raising.
    pub fn finalize(&self, cloud_cover_percent: f64) -> SceneStats {
        let avg_water_sum = mean(
            self.water_rrs_sums
                .iter()
                .copied()
                .filter(|&v| v != 0.0),
        );
        let stats = SceneStats {
            valid_pixels: self.valid_pixels,
            water_rows: self.water_table.len(),
            glinted_rows: self.glinted_rows(),
            avg_sand_developed_sum: mean(self.sand_developed_sums.iter().copied()),
            std_sand_developed_sum: std_dev(&self.sand_developed_sums),
            avg_veg_sum: mean(self.veg_sums.iter().copied()),
            avg_mangrove_sum: mean(self.mangrove_sums.iter().copied()),
            avg_dead_veg: mean(self.dead_veg_residuals.iter().copied()),
            avg_water_sum,
            mn_nir1: positive_minimum(self.water_table.iter().map(|s| s.bands[6])),
            mn_nir2: positive_minimum(self.water_table.iter().map(|s| s.bands[7])),
            cloud_threshold: self.cloud_threshold(cloud_cover_percent),
        };
        log::info!(
            "scene statistics: valid={} water={} glinted={} SD={:.4} veg={:.4} mang={:.4} water_sum={:.4} cloud_thr={:.4}",
            stats.valid_pixels, stats.water_rows, stats.glinted_rows,
            stats.avg_sand_developed_sum, stats.avg_veg_sum,
            stats.avg_mangrove_sum, stats.avg_water_sum, stats.cloud_threshold
        );
        stats
    }

    /// Coastal-band threshold for cloud masking: the n-th highest coastal
    /// value with n derived from the metadata-reported percent cloud cover,
    /// or max+1 when the scene is reported cloud-free.
    fn cloud_threshold(&self, cloud_cover_percent: f64) -> f32 {
        if self.coastal_values.is_empty() {
            return f32::NAN;
        }
        if cloud_cover_percent > 0.0 {
            let n = (self.valid_pixels as f64 * cloud_cover_percent * 0.01).round() as usize;
            let mut sorted = self.coastal_values.clone();
            sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            // n-th highest value; a rounded-to-zero count takes the maximum
            sorted[n.saturating_sub(1).min(sorted.len() - 1)]
        } else {
            self.coastal_values
                .iter()
                .fold(f32::NEG_INFINITY, |a, &b| a.max(b))
                + 1.0
        }
    }
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0f64, 0usize), |(s, c), v| (s + v as f64, c + 1));
    if count == 0 {
        f32::NAN
    } else {
        (sum / count as f64) as f32
    }
}

fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return f32::NAN;
    }
    let m = mean(values.iter().copied()) as f64;
    let var = values
        .iter()
        .map(|&v| (v as f64 - m).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    var.sqrt() as f32
}

/// Minimum over the positive members of an unordered set; NaN when none.
fn positive_minimum(values: impl Iterator<Item = f32>) -> f32 {
    let min = values
        .filter(|&v| v > 0.0)
        .fold(f32::INFINITY, |a, b| a.min(b));
    if min.is_finite() {
        min
    } else {
        f32::NAN
    }
}

/// Single full-image sampling pass
///
/// Classifies every valid pixel into coarse buckets purely to accumulate
/// scene-adaptive statistics and the labeled water-pixel table. The pass is
/// a parallel fold over rows; results are visitation-order independent.
pub struct LandCoverSampler {
    optics: SurfaceOptics,
}

impl LandCoverSampler {
    pub fn new(optics: SurfaceOptics) -> Self {
        Self { optics }
    }

    pub fn sample(&self, rrs: &BandCube) -> SampleAccumulators {
        log::info!("sampling {} x {} scene", rrs.dim().0, rrs.dim().1);
        rrs.axis_iter(Axis(0))
            .into_par_iter()
            .fold(SampleAccumulators::default, |mut acc, row| {
                for px in row.axis_iter(Axis(0)) {
                    let bands: [f32; NUM_BANDS] = std::array::from_fn(|d| px[d]);
                    acc.observe(&bands, &self.optics);
                }
                acc
            })
            .reduce(SampleAccumulators::default, SampleAccumulators::merge)
    }
}
