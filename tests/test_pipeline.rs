use approx::assert_relative_eq;
use benthos::core::{
    majority_filter, DecisionTreeClassifier, RayleighModel, ReflectanceConverter, SceneGeometry,
};
use benthos::pipeline::{build_scene_context, convert_to_reflectance, reconcile_dimensions};
use benthos::types::{SceneMetadata, NUM_BANDS};
use chrono::{TimeZone, Utc};
use ndarray::{Array2, Array3};

fn scene_metadata(rows: usize, cols: usize) -> SceneMetadata {
    SceneMetadata {
        rows,
        cols,
        abs_cal_factor: [
            0.009295654,
            0.017819375,
            0.013823006,
            0.006810718,
            0.01103623,
            0.005188136,
            0.012217124,
            0.009042234,
        ],
        acquisition: Utc.with_ymd_and_hms(2017, 12, 22, 16, 48, 10).unwrap(),
        sun_elevation: 38.6,
        sun_azimuth: 157.7,
        sat_elevation: 77.1,
        sat_azimuth: 246.9,
        off_nadir: 11.5,
        cloud_cover: 0.012,
    }
}

const MUD: [f32; 8] = [0.10, 0.10, 0.10, 0.12, 0.15, 0.20, 0.30, 0.30];
const FOREST: [f32; 8] = [0.05, 0.05, 0.05, 0.06, 0.05, 0.10, 0.30, 0.25];
const DEEP_WATER: [f32; 8] = [0.02, 0.01, 0.05, 0.04, 0.03, 0.02, 0.01, 0.005];

/// Build a raw digital-count cube whose converted reflectance lands on the
/// given per-row target spectra.
fn raw_cube_from_targets(meta: &SceneMetadata, rows: &[[f32; 8]]) -> Array3<f32> {
    let geom = SceneGeometry::from_metadata(meta).unwrap();
    let rayleigh = RayleighModel::compute(&geom);
    let conv = ReflectanceConverter::new(&geom, &rayleigh, &meta.abs_cal_factor);
    Array3::from_shape_fn((rows.len(), meta.cols, NUM_BANDS), |(i, _, d)| {
        (rows[i][d] + conv.c2[d]) / conv.c1[d]
    })
}

#[test]
fn test_end_to_end_classification() {
    let meta = scene_metadata(4, 4);
    let raw = raw_cube_from_targets(&meta, &[MUD, FOREST, DEEP_WATER, DEEP_WATER]);

    let mut rrs = convert_to_reflectance(&raw, &meta, false).unwrap();
    for d in 0..NUM_BANDS {
        assert_relative_eq!(rrs[[0, 0, d]], MUD[d], epsilon = 1e-4);
        assert_relative_eq!(rrs[[2, 0, d]], DEEP_WATER[d], epsilon = 1e-4);
    }

    let (ctx, stats) = build_scene_context(&rrs, &meta).unwrap();
    assert_eq!(stats.valid_pixels, 16);
    assert_eq!(stats.water_rows, 8);
    assert_eq!(stats.glinted_rows, 0);
    assert!(ctx.glint.is_none());

    let builtup = Array2::<u8>::zeros((4, 4));
    let classifier = DecisionTreeClassifier::new(&ctx, &stats);
    let (map, bathy) = classifier.classify(&mut rrs, &builtup);
    for j in 0..4 {
        assert_eq!(map[[0, j]], 22, "mud row");
        assert_eq!(map[[1, j]], 32, "forest row");
        assert_eq!(map[[2, j]], 51, "water row");
        assert_eq!(map[[3, j]], 51, "water row");
        assert!(bathy[[2, j]] > 0.0 && bathy[[2, j]] < 2.0);
        assert_eq!(bathy[[0, j]], 0.0);
    }

    // Homogeneous rows survive the majority filter unchanged; window ties
    // on the row boundaries keep the center pixel
    let filtered = majority_filter(&map, 1);
    assert_eq!(filtered, map);
}

#[test]
fn test_water_pixels_converted_to_subsurface_in_place() {
    let meta = scene_metadata(2, 2);
    let raw = raw_cube_from_targets(&meta, &[DEEP_WATER, DEEP_WATER]);
    let mut rrs = convert_to_reflectance(&raw, &meta, false).unwrap();
    let (ctx, stats) = build_scene_context(&rrs, &meta).unwrap();
    let classifier = DecisionTreeClassifier::new(&ctx, &stats);
    let builtup = Array2::<u8>::zeros((2, 2));
    classifier.classify(&mut rrs, &builtup);

    let zeta = ctx.optics.zeta;
    let g = ctx.optics.g;
    for d in 0..5 {
        let above = DEEP_WATER[d];
        assert_relative_eq!(
            rrs[[0, 0, d]],
            above / (zeta + g * above),
            epsilon = 1e-3
        );
    }
    // Bands 6-8 keep their above-surface values
    assert_relative_eq!(rrs[[0, 0, 6]], DEEP_WATER[6], epsilon = 1e-4);
}

#[test]
fn test_reconcile_dimensions_clamps_to_smaller() {
    let meta = scene_metadata(3, 3);
    let raw = Array3::<f32>::from_elem((4, 4, NUM_BANDS), 100.0);
    let clamped = reconcile_dimensions(raw, &meta);
    assert_eq!(clamped.dim(), (3, 3, NUM_BANDS));

    let meta = scene_metadata(8, 8);
    let raw = Array3::<f32>::from_elem((4, 4, NUM_BANDS), 100.0);
    let clamped = reconcile_dimensions(raw, &meta);
    assert_eq!(clamped.dim(), (4, 4, NUM_BANDS));
}

#[test]
fn test_sentinel_masked_pixels_skip_classification() {
    let meta = scene_metadata(2, 2);
    let mut raw = raw_cube_from_targets(&meta, &[DEEP_WATER, DEEP_WATER]);
    for d in 0..NUM_BANDS {
        raw[[0, 0, d]] = 0.0;
    }
    let mut rrs = convert_to_reflectance(&raw, &meta, true).unwrap();
    assert!(rrs[[0, 0, 0]].is_nan());

    let (ctx, stats) = build_scene_context(&rrs, &meta).unwrap();
    assert_eq!(stats.valid_pixels, 3);
    let classifier = DecisionTreeClassifier::new(&ctx, &stats);
    let builtup = Array2::<u8>::zeros((2, 2));
    let (map, bathy) = classifier.classify(&mut rrs, &builtup);
    assert_eq!(map[[0, 0]], 0);
    assert_eq!(bathy[[0, 0]], 0.0);
    assert_eq!(map[[1, 1]], 51);
}
