//! Core correction-and-classification modules

pub mod geometry;
pub mod rayleigh;
pub mod reflectance;
pub mod sampler;
pub mod glint;
pub mod subsurface;
pub mod classify;
pub mod builtup;
pub mod postfilter;

// Re-export main types
pub use geometry::SceneGeometry;
pub use rayleigh::RayleighModel;
pub use reflectance::ReflectanceConverter;
pub use sampler::{LandCoverSampler, SampleAccumulators, SceneStats, WaterSample, WaterTag};
pub use glint::{estimate_glint, CorrectionContext, GlintCorrection, SurfaceOptics};
pub use subsurface::SubsurfaceCorrector;
pub use classify::{DecisionTreeClassifier, HabitatClass};
pub use builtup::builtup_mask;
pub use postfilter::majority_filter;
