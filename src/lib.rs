//! Benthos: coastal habitat mapping from WorldView-2 imagery
//!
//! Converts raw 8-band digital counts to remote-sensing reflectance,
//! estimates and removes sun glint over water, derives relative bathymetry
//! and classifies each pixel into benthic and terrestrial habitat classes
//! with scene-adaptive thresholds.

pub mod core;
pub mod io;
pub mod pipeline;
pub mod types;

pub use pipeline::{process_scene, PipelineDepth, SceneParams};
pub use types::{BenthosError, BenthosResult, SceneMetadata};
