use crate::types::{BandCube, BenthosResult, ClassMap, GeoReference};
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use ndarray::{Array2, Array3};
use std::path::Path;

/// Read a multiband GeoTIFF as a (rows, cols, bands) cube plus its
/// georeference. Band values are widened to f32.
pub fn read_multiband<P: AsRef<Path>>(path: P) -> BenthosResult<(BandCube, GeoReference)> {
    let path = path.as_ref();
    log::info!("reading raster {}", path.display());
    let dataset = Dataset::open(path)?;
    let (cols, rows) = dataset.raster_size();
    let bands = dataset.raster_count() as usize;

    let mut cube = Array3::<f32>::zeros((rows, cols, bands));
    for b in 0..bands {
        let rasterband = dataset.rasterband(b as isize + 1)?;
        let data = rasterband.read_as::<f32>((0, 0), (cols, rows), (cols, rows), None)?;
        for i in 0..rows {
            for j in 0..cols {
                cube[[i, j, b]] = data.data[i * cols + j];
            }
        }
    }

    let geo = GeoReference {
        geo_transform: dataset.geo_transform()?,
        projection: dataset.projection(),
    };
    log::debug!("raster {} x {} x {}", rows, cols, bands);
    Ok((cube, geo))
}

/// Write a (rows, cols, bands) f32 cube to a GeoTIFF with the given
/// georeference and coordinate-system code.
pub fn write_multiband<P: AsRef<Path>>(
    path: P,
    cube: &BandCube,
    geo: &GeoReference,
    epsg: u32,
) -> BenthosResult<()> {
    let path = path.as_ref();
    let (rows, cols, bands) = cube.dim();
    log::info!("writing {} band raster to {}", bands, path.display());
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset =
        driver.create_with_band_type::<f32, _>(path, cols as isize, rows as isize, bands as isize)?;
    georeference(&mut dataset, geo, epsg)?;
    for b in 0..bands {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(cube[[i, j, b]]);
            }
        }
        let buffer = Buffer::new((cols, rows), data);
        let mut band = dataset.rasterband(b as isize + 1)?;
        band.write((0, 0), (cols, rows), &buffer)?;
    }
    Ok(())
}

/// Write the 8-bit class map; integer codes round-trip losslessly.
pub fn write_class_map<P: AsRef<Path>>(
    path: P,
    map: &ClassMap,
    geo: &GeoReference,
    epsg: u32,
) -> BenthosResult<()> {
    let path = path.as_ref();
    let (rows, cols) = map.dim();
    log::info!("writing class map to {}", path.display());
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut dataset =
        driver.create_with_band_type::<u8, _>(path, cols as isize, rows as isize, 1)?;
    georeference(&mut dataset, geo, epsg)?;
    let buffer = Buffer::new((cols, rows), map.iter().copied().collect());
    let mut band = dataset.rasterband(1)?;
    band.write((0, 0), (cols, rows), &buffer)?;
    Ok(())
}

/// Read back a class map written by `write_class_map`.
pub fn read_class_map<P: AsRef<Path>>(path: P) -> BenthosResult<ClassMap> {
    let dataset = Dataset::open(path.as_ref())?;
    let (cols, rows) = dataset.raster_size();
    let rasterband = dataset.rasterband(1)?;
    let data = rasterband.read_as::<u8>((0, 0), (cols, rows), (cols, rows), None)?;
    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| {
        data.data[i * cols + j]
    }))
}

fn georeference(dataset: &mut Dataset, geo: &GeoReference, epsg: u32) -> BenthosResult<()> {
    dataset.set_geo_transform(&geo.geo_transform)?;
    if !geo.projection.is_empty() {
        dataset.set_projection(&geo.projection)?;
    } else {
        let srs = SpatialRef::from_epsg(epsg)?;
        dataset.set_spatial_ref(&srs)?;
    }
    Ok(())
}
