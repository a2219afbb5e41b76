use benthos::io::geotiff;
use benthos::types::{GeoReference, NUM_BANDS};
use ndarray::{Array2, Array3};

fn georef() -> GeoReference {
    GeoReference {
        geo_transform: [-80.5, 0.00002, 0.0, 25.3, 0.0, -0.00002],
        projection: String::new(),
    }
}

#[test]
fn test_class_map_round_trip_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.tif");

    let map = Array2::<u8>::from_shape_fn((5, 7), |(i, j)| {
        [0u8, 11, 21, 22, 31, 51, 54][(i + j) % 7]
    });
    geotiff::write_class_map(&path, &map, &georef(), 4326).unwrap();
    let read = geotiff::read_class_map(&path).unwrap();
    assert_eq!(read, map);
}

#[test]
fn test_multiband_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rrs.tif");

    let cube = Array3::<f32>::from_shape_fn((3, 4, NUM_BANDS), |(i, j, d)| {
        0.01 * (i * 32 + j * 8 + d) as f32 - 0.05
    });
    geotiff::write_multiband(&path, &cube, &georef(), 4326).unwrap();
    let (read, geo) = geotiff::read_multiband(&path).unwrap();
    assert_eq!(read.dim(), (3, 4, NUM_BANDS));
    assert_eq!(read, cube);
    assert_eq!(geo.geo_transform, georef().geo_transform);
    assert!(!geo.projection.is_empty());
}

#[test]
fn test_missing_file_is_an_error() {
    let err = geotiff::read_multiband("/nonexistent/scene.tif");
    assert!(err.is_err());
}
