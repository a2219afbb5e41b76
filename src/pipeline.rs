use crate::core::{
    builtup_mask, estimate_glint, majority_filter, CorrectionContext, DecisionTreeClassifier,
    LandCoverSampler, RayleighModel, ReflectanceConverter, SceneGeometry, SceneStats,
    SubsurfaceCorrector, SurfaceOptics,
};
use crate::io::{geotiff, MetadataParser};
use crate::types::{BandCube, BenthosError, BenthosResult, SceneMetadata};
use ndarray::{s, Axis};
use std::path::{Path, PathBuf};

/// How deep the scene processing runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineDepth {
    /// Stop after reflectance conversion
    Reflectance,
    /// Reflectance, subsurface conversion and bathymetry
    Bathymetry,
    /// Full chain including the decision-tree classification
    Classification,
}

impl PipelineDepth {
    pub fn from_code(code: u8) -> BenthosResult<Self> {
        match code {
            0 => Ok(Self::Reflectance),
            1 => Ok(Self::Bathymetry),
            2 => Ok(Self::Classification),
            other => Err(BenthosError::Configuration(format!(
                "invalid pipeline depth {}, expected 0, 1 or 2",
                other
            ))),
        }
    }
}

/// Parameters for one scene invocation
#[derive(Debug, Clone)]
pub struct SceneParams {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub output_dir: PathBuf,
    /// Region-of-interest label carried into output file names
    pub roi: String,
    /// Coordinate system; only "EPSG:4326" is supported
    pub coordinate_system: String,
    pub depth: PipelineDepth,
    /// Persist the above-surface reflectance raster
    pub write_reflectance: bool,
    /// Post-classification majority filter radius, 0 = none
    pub filter_radius: usize,
    /// Mask raw sentinel-value no-data pixels before conversion
    pub mask_sentinel_nodata: bool,
}

/// Only EPSG:4326 output is supported; anything else is a configuration
/// error reported with the rejected string.
pub fn parse_epsg(coordinate_system: &str) -> BenthosResult<u32> {
    if coordinate_system == "EPSG:4326" {
        Ok(4326)
    } else {
        Err(BenthosError::Configuration(format!(
            "unknown coordinate system: '{}'",
            coordinate_system
        )))
    }
}

/// Convert raw digital counts to above-surface reflectance. Fails fast on
/// invalid scene geometry before touching the raster.
pub fn convert_to_reflectance(
    raw: &BandCube,
    meta: &SceneMetadata,
    mask_sentinel_nodata: bool,
) -> BenthosResult<BandCube> {
    let geom = SceneGeometry::from_metadata(meta)?;
    let rayleigh = RayleighModel::compute(&geom);
    let converter = ReflectanceConverter::new(&geom, &rayleigh, &meta.abs_cal_factor)
        .with_sentinel_masking(mask_sentinel_nodata);
    log::info!("calculating Rrs for {} x {} scene", raw.dim().0, raw.dim().1);
    Ok(converter.convert(raw))
}

/// Run the sampling pass and finalize the immutable scene correction
/// context plus the adaptive statistics. Hard barrier: the classifier must
/// not start before this returns.
pub fn build_scene_context(
    rrs: &BandCube,
    meta: &SceneMetadata,
) -> BenthosResult<(CorrectionContext, SceneStats)> {
    let geom = SceneGeometry::from_metadata(meta)?;
    let optics = SurfaceOptics::from_geometry(&geom);
    let sampler = LandCoverSampler::new(optics);
    let accumulators = sampler.sample(rrs);
    let stats = accumulators.finalize(meta.cloud_cover);
    let glint = estimate_glint(&accumulators.water_table);
    let ctx = CorrectionContext {
        optics,
        glint,
        mn_nir1: stats.mn_nir1,
        mn_nir2: stats.mn_nir2,
    };
    Ok((ctx, stats))
}

/// Reconcile raster and metadata dimensions: a warped input may carry more
/// or fewer rows/columns than the vendor document reports.
pub fn reconcile_dimensions(raw: BandCube, meta: &SceneMetadata) -> BandCube {
    let (rows, cols, _) = raw.dim();
    if rows == meta.rows && cols == meta.cols {
        return raw;
    }
    let r = rows.min(meta.rows);
    let c = cols.min(meta.cols);
    log::warn!(
        "raster {}x{} disagrees with metadata {}x{}, clamping to {}x{}",
        rows, cols, meta.rows, meta.cols, r, c
    );
    raw.slice(s![..r, ..c, ..]).to_owned()
}

fn output_path(dir: &Path, scene_id: &str, roi: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{}_{}_{}.tif", scene_id, roi, suffix))
}

fn scene_id(image_path: &Path) -> String {
    let name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.chars().take(18).collect()
}

/// Process one scene end to end: read, correct, classify, write products.
///
/// Products already written (e.g. the reflectance raster) stay on disk when
/// a later stage fails.
pub fn process_scene(params: &SceneParams) -> BenthosResult<()> {
    let epsg = parse_epsg(&params.coordinate_system)?;
    let id = scene_id(&params.image_path);
    log::info!("processing scene {} (roi {})", id, params.roi);

    let (raw, geo) = geotiff::read_multiband(&params.image_path)?;
    let meta = MetadataParser::read_file(&params.metadata_path)?;
    let raw = reconcile_dimensions(raw, &meta);

    let mut rrs = convert_to_reflectance(&raw, &meta, params.mask_sentinel_nodata)?;
    drop(raw);

    if params.write_reflectance {
        geotiff::write_multiband(
            output_path(&params.output_dir, &id, &params.roi, "Rrs"),
            &rrs,
            &geo,
            epsg,
        )?;
    }
    if params.depth == PipelineDepth::Reflectance {
        return Ok(());
    }

    let (ctx, stats) = build_scene_context(&rrs, &meta)?;

    match params.depth {
        PipelineDepth::Reflectance => unreachable!(),
        PipelineDepth::Bathymetry => {
            let corrector = SubsurfaceCorrector::new(&ctx);
            let bathy = corrector.correct_raster(&mut rrs);
            let computed = bathy.iter().filter(|&&d| d > 0.0).count();
            log::info!("bathymetry: {} pixels with valid relative depth", computed);
        }
        PipelineDepth::Classification => {
            let builtup = builtup_mask(&rrs.index_axis(Axis(2), 5).to_owned());
            let classifier = DecisionTreeClassifier::new(&ctx, &stats);
            let (map, _bathy) = classifier.classify(&mut rrs, &builtup);
            if params.filter_radius > 0 {
                let filtered = majority_filter(&map, params.filter_radius);
                geotiff::write_class_map(
                    output_path(
                        &params.output_dir,
                        &id,
                        &params.roi,
                        &format!("Map_filt_{}_benthicnew", params.filter_radius),
                    ),
                    &filtered,
                    &geo,
                    epsg,
                )?;
            } else {
                geotiff::write_class_map(
                    output_path(&params.output_dir, &id, &params.roi, "Map_benthicnew"),
                    &map,
                    &geo,
                    epsg,
                )?;
            }
        }
    }

    // Reflectance cube now carries subsurface values for water pixels
    geotiff::write_multiband(
        output_path(&params.output_dir, &id, &params.roi, "rrssub"),
        &rrs,
        &geo,
        epsg,
    )?;

    Ok(())
}
