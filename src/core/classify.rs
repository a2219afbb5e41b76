use crate::core::glint::CorrectionContext;
use crate::core::sampler::SceneStats;
use crate::core::subsurface::SubsurfaceCorrector;
use crate::types::{BandCube, BandPlane, ClassMap, NUM_BANDS};
use ndarray::{Array2, Axis, Zip};

/// Terminal classes of the decision tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HabitatClass {
    Shadow = 0,
    Developed = 11,
    BeachSand = 21,
    Mud = 22,
    DeadVegetation = 30,
    MarshGrass = 31,
    UplandForest = 32,
    ForestedWetland = 33,
    DeepWater = 51,
    BrightSoftBottom = 52,
    SoftBottom = 53,
    Seagrass = 54,
    TurbidWater = 55,
}

impl HabitatClass {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Multi-branch decision-tree classifier
///
/// Pure function of the pixel's band vector, the built-up mask bit, the
/// immutable correction context and the scene-adaptive statistics. The five
/// top-level branches are evaluated in priority order with first-match
/// semantics; pixels matching none fall through to the glint-free water
/// path. Water branches convert the pixel to subsurface reflectance in
/// place, so the cube carries mixed above/below-surface values afterwards.
pub struct DecisionTreeClassifier<'a> {
    ctx: &'a CorrectionContext,
    stats: &'a SceneStats,
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

impl<'a> DecisionTreeClassifier<'a> {
    pub fn new(ctx: &'a CorrectionContext, stats: &'a SceneStats) -> Self {
        Self { ctx, stats }
    }

    /// Classify the scene. Returns the class map and the relative-depth
    /// raster produced as a side product of the water branches. The
    /// reflectance cube is mutated in place for water pixels.
    pub fn classify(&self, rrs: &mut BandCube, builtup: &ClassMap) -> (ClassMap, BandPlane) {
        let (rows, cols, _) = rrs.dim();
        log::info!("running decision tree over {} x {} scene", rows, cols);
        let mut map = Array2::<u8>::zeros((rows, cols));
        let mut bathy = Array2::<f32>::zeros((rows, cols));
        Zip::from(rrs.lanes_mut(Axis(2)))
            .and(&mut map)
            .and(&mut bathy)
            .and(builtup)
            .par_for_each(|mut lane, class, depth, &bw| {
                if lane[0].is_nan() {
                    return;
                }
                let mut bands: [f32; NUM_BANDS] = std::array::from_fn(|d| lane[d]);
                let (habitat, dp) = self.classify_pixel(&mut bands, bw == 1);
                *class = habitat.code();
                *depth = dp;
                for d in 0..NUM_BANDS {
                    lane[d] = bands[d];
                }
            });
        (map, bathy)
    }

    /// Classify a single pixel: the ordered top-level rules. Water rules
    /// overwrite bands 0-4 with subsurface reflectance and yield a depth.
    pub fn classify_pixel(
        &self,
        b: &mut [f32; NUM_BANDS],
        builtup: bool,
    ) -> (HabitatClass, f32) {
        if nd(b[6], b[1]) < 0.60 && b[4] > b[3] && b[3] > b[2] {
            (self.classify_sand_complex(b, builtup), 0.0)
        } else if (b[1] > b[2] && b[6] > b[2] && b[1] < 0.1 && nd(b[7], b[4]) < 0.20)
            || (b[7] > 0.05 && b[6] > b[1] && nd(b[7], b[4]) < 0.1)
        {
            // Secondary mud / developed / shadow split
            let class = if builtup {
                HabitatClass::Developed
            } else {
                HabitatClass::Mud
            };
            (class, 0.0)
        } else if nd(b[7], b[4]) > 0.20 && b[6] > b[2] {
            (self.classify_vegetation_complex(b), 0.0)
        } else if (b[7] < 0.2 && b[7] > 0.0)
            || (nir_descending(b) && b[7] > 0.0)
            || (nir_ascending(b) && b[7] > 0.0)
        {
            // Water, glinted or glint-free: correct per the scene context
            let corrector = SubsurfaceCorrector::new(self.ctx);
            let dp = corrector.correct_pixel(b);
            (self.classify_water_pixel(b), dp)
        } else {
            // Fallback: glint-free water path regardless of scene glint
            let corrector = SubsurfaceCorrector::new(self.ctx);
            let dp = corrector.correct_pixel_glint_free(b);
            (self.classify_water_pixel(b), dp)
        }
    }

    /// Mud / developed / sand complex, subdivided against the adaptive
    /// sand-developed mean
    fn classify_sand_complex(&self, b: &[f32; NUM_BANDS], builtup: bool) -> HabitatClass {
        if b[6] < b[1] && b[7] > b[4] {
            HabitatClass::Shadow
        } else if nd(b[7], b[4]) < 0.01 && b[7] > 0.05 {
            // Buildings and bright sand
            if builtup {
                HabitatClass::Developed
            } else if b[5] + b[6] + b[7] < self.stats.avg_sand_developed_sum {
                HabitatClass::Mud
            } else {
                HabitatClass::BeachSand
            }
        } else if b[4] > b[1] + (b[6] - b[1]) / 5.0 * 2.0 {
            HabitatClass::BeachSand
        } else if b[4] < ((b[6] - b[1]) / 5.0 * 3.0 + b[1]) * 0.60 && b[6] > 0.2 {
            HabitatClass::MarshGrass
        } else {
            HabitatClass::Mud
        }
    }

    /// Vegetation complex via NDVI, subdivided with the adaptive vegetation
    /// and mangrove means and a fixed 0.4 blue/red ratio threshold
    fn classify_vegetation_complex(&self, b: &[f32; NUM_BANDS]) -> HabitatClass {
        if b[6] > b[1] && nd(b[6], b[1]) < 0.20 && nd(b[6], b[7]) > 0.01 {
            // Shadowed vegetation; the B7/B8 ratio excludes marsh
            HabitatClass::Shadow
        } else if b[2] + b[3] < self.stats.avg_veg_sum {
            self.classify_wetland_or_upland(b)
        } else if b[6] < self.stats.avg_mangrove_sum {
            self.classify_wetland_or_upland(b)
        } else if nd(b[7], b[4]) > 0.65 {
            HabitatClass::UplandForest
        } else if b[4] > ((b[6] - b[1]) / 5.0 * 3.0 + b[1]) * 0.60 && b[6] < 0.2 {
            // Difference of red from its NIR1:yellow-slope prediction
            // distinguishes marsh
            HabitatClass::MarshGrass
        } else if b[6] < 0.12 {
            HabitatClass::DeadVegetation
        } else {
            HabitatClass::UplandForest
        }
    }

    /// Shared low-vigor subdivision: agriculture filter on elevated blue,
    /// then forested wetland against marsh / dead vegetation
    fn classify_wetland_or_upland(&self, b: &[f32; NUM_BANDS]) -> HabitatClass {
        if nd(b[1], b[4]) < 0.4 {
            if b[6] > 0.12 && b[6] / (b[2] + b[3]) > 2.0 {
                HabitatClass::ForestedWetland
            } else {
                HabitatClass::MarshGrass
            }
        } else {
            // Most likely agriculture
            HabitatClass::UplandForest
        }
    }

    /// Second-level shadow / soft-bottom / seagrass / turbid / deep split,
    /// applied to the subsurface-corrected pixel
    fn classify_water_pixel(&self, b: &[f32; NUM_BANDS]) -> HabitatClass {
        if b[5] < b[6] {
            HabitatClass::Shadow
        } else if nd(b[2], b[3]) < 0.10 {
            if b[3] > b[2] || b[4] > b[2] {
                HabitatClass::SoftBottom
            } else if b[2] + b[3] > self.stats.avg_water_sum && nd(b[4], b[1]) > 0.1 {
                HabitatClass::BrightSoftBottom
            } else if b[3] > b[1] && nd(b[2], b[5]) < 0.60 {
                // Separate seagrass from turbid water
                if nd(b[2], b[4]) > 0.1 {
                    HabitatClass::Seagrass
                } else {
                    HabitatClass::TurbidWater
                }
            } else {
                HabitatClass::DeepWater
            }
        } else {
            HabitatClass::DeepWater
        }
    }
}
