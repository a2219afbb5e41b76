use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3};

/// Multi-band reflectance or digital-count raster (rows x cols x bands)
pub type BandCube = Array3<f32>;

/// Single-band real-valued raster (rows x cols)
pub type BandPlane = Array2<f32>;

/// Categorical classification raster (rows x cols)
pub type ClassMap = Array2<u8>;

/// Number of WorldView-2 multispectral bands
pub const NUM_BANDS: usize = 8;

/// Saturated digital count; {0, SATURATION_DN} across all bands marks no-data
pub const SATURATION_DN: f32 = 2047.0;

// Per-band physical constants, ordered Coastal, Blue, Green, Yellow, Red,
// Red-Edge, NIR1, NIR2. The order must match the calibration-factor order in
// the IMD metadata.

/// Effective bandwidth per band (um, from IMD metadata files)
pub const EFFECTIVE_BANDWIDTH: [f64; NUM_BANDS] = [
    0.0473, 0.0543, 0.0630, 0.0374, 0.0574, 0.0393, 0.0989, 0.0996,
];

/// Band-averaged solar spectral irradiance (W/m2/um)
pub const SOLAR_IRRADIANCE: [f64; NUM_BANDS] = [
    1758.2229, 1974.2416, 1856.4104, 1738.4791, 1559.4555, 1342.0695,
    1069.7302, 861.2866,
];

/// Center wavelength (um, Radiometric Use of WorldView-2 Imagery)
pub const CENTER_WAVELENGTH: [f64; NUM_BANDS] = [
    0.4273, 0.4779, 0.5462, 0.6078, 0.6588, 0.7237, 0.8313, 0.9080,
];

/// Rayleigh phase function gamma factor (Bucholtz 1995)
pub const RAYLEIGH_GAMMA: [f64; NUM_BANDS] = [
    0.0150, 0.0147, 0.0144, 0.0141, 0.0141, 0.0141, 0.0138, 0.0138,
];

/// Scene acquisition metadata extracted from the WorldView IMD document
#[derive(Debug, Clone)]
pub struct SceneMetadata {
    pub rows: usize,
    pub cols: usize,
    /// Absolute calibration factor per band, IMD band order
    pub abs_cal_factor: [f64; NUM_BANDS],
    pub acquisition: DateTime<Utc>,
    /// Mean sun elevation (degrees)
    pub sun_elevation: f64,
    /// Mean sun azimuth (degrees)
    pub sun_azimuth: f64,
    /// Mean satellite elevation (degrees)
    pub sat_elevation: f64,
    /// Mean satellite azimuth (degrees)
    pub sat_azimuth: f64,
    /// Mean off-nadir view angle (degrees)
    pub off_nadir: f64,
    /// Cloud cover percent reported by the vendor
    pub cloud_cover: f64,
}

/// Georeference carried alongside raster arrays through the pipeline
#[derive(Debug, Clone)]
pub struct GeoReference {
    /// GDAL affine geotransform [origin_x, px_w, rot_x, origin_y, rot_y, px_h]
    pub geo_transform: [f64; 6],
    /// Projection in WKT form, as read from the source dataset
    pub projection: String,
}

/// Error types for scene processing
#[derive(Debug, thiserror::Error)]
pub enum BenthosError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Scene geometry error: Earth-Sun distance {esd} outside [0.983, 1.017]")]
    Geometry { esd: f64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for scene processing operations
pub type BenthosResult<T> = Result<T, BenthosError>;
