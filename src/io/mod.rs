//! Scene I/O: metadata document parsing and georeferenced raster access

pub mod geotiff;
pub mod metadata;

pub use metadata::MetadataParser;
