use anyhow::Context;
use benthos::pipeline::{process_scene, PipelineDepth, SceneParams};
use clap::Parser;
use std::path::PathBuf;

/// Coastal habitat mapping from WorldView-2 imagery
#[derive(Parser, Debug)]
#[command(name = "benthos", version, about)]
struct Cli {
    /// Input multiband GeoTIFF (8-band WorldView-2 scene)
    #[arg(short, long)]
    image: PathBuf,

    /// Vendor ISD metadata document (XML)
    #[arg(short, long)]
    metadata: PathBuf,

    /// Output directory for generated products
    #[arg(short, long)]
    output: PathBuf,

    /// Region-of-interest label used in output file names
    #[arg(short, long, default_value = "scene")]
    roi: String,

    /// Output coordinate system
    #[arg(long, default_value = "EPSG:4326")]
    crs: String,

    /// Processing depth: 0 = reflectance, 1 = bathymetry, 2 = classification
    #[arg(short, long, default_value_t = 2)]
    depth: u8,

    /// Write the above-surface reflectance raster
    #[arg(long)]
    write_rrs: bool,

    /// Majority filter radius applied to the class map, 0 disables (3 = 7x7)
    #[arg(short, long, default_value_t = 3)]
    filter: usize,

    /// Mask sentinel no-data pixels (all bands 0 or 2047) before conversion
    #[arg(long)]
    mask_nodata: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let params = SceneParams {
        image_path: cli.image,
        metadata_path: cli.metadata,
        output_dir: cli.output,
        roi: cli.roi,
        coordinate_system: cli.crs,
        depth: PipelineDepth::from_code(cli.depth)?,
        write_reflectance: cli.write_rrs,
        filter_radius: cli.filter,
        mask_sentinel_nodata: cli.mask_nodata,
    };

    std::fs::create_dir_all(&params.output_dir)
        .with_context(|| format!("creating output directory {}", params.output_dir.display()))?;

    process_scene(&params).context("scene processing failed")?;
    Ok(())
}
