use crate::types::{BandPlane, ClassMap};
use ndarray::Array2;

/// Structuring element edge for the top-hat pass
const STREL_SIZE: usize = 10;

/// Build the binary built-up/edge mask from the red-edge reflectance plane.
///
/// Otsu-binarize the band, then white top-hat with a square structuring
/// element: the opening removes structures smaller than the element, and the
/// top-hat keeps exactly those, flagging buildings and other sharp bright
/// features. NaN pixels never contribute.
pub fn builtup_mask(band: &BandPlane) -> ClassMap {
    let threshold = otsu_threshold(band);
    log::debug!("built-up mask: otsu threshold {:.5}", threshold);

    let (rows, cols) = band.dim();
    let binary = Array2::from_shape_fn((rows, cols), |(i, j)| {
        let v = band[[i, j]];
        u8::from(v.is_finite() && v > threshold)
    });

    white_tophat(&binary, STREL_SIZE)
}

/// Otsu's method over a 256-bin histogram of the finite values
fn otsu_threshold(band: &BandPlane) -> f32 {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in band.iter() {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if !min.is_finite() || min >= max {
        return min;
    }

    const BINS: usize = 256;
    let scale = (BINS - 1) as f32 / (max - min);
    let mut hist = [0usize; BINS];
    let mut total = 0usize;
    for &v in band.iter() {
        if v.is_finite() {
            hist[((v - min) * scale) as usize] += 1;
            total += 1;
        }
    }

    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();
    let mut sum_bg = 0.0f64;
    let mut weight_bg = 0usize;
    let mut best_var = -1.0f64;
    let mut best_bin = 0usize;
    for (i, &count) in hist.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }
        sum_bg += i as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);
        if between > best_var {
            best_var = between;
            best_bin = i;
        }
    }

    min + best_bin as f32 / scale
}

/// White top-hat of a binary image: input minus its morphological opening
fn white_tophat(binary: &ClassMap, size: usize) -> ClassMap {
    let eroded = morph(binary, size, true);
    let opened = morph(&eroded, size, false);
    let (rows, cols) = binary.dim();
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        binary[[i, j]] & !opened[[i, j]] & 1
    })
}

/// Square-window erosion (`erode` = true) or dilation over a binary image,
/// clipped at the borders. The erosion element spans -size/2 .. size/2 - 1;
/// the dilation uses the reflected element so the opening stays in place
/// for even sizes.
fn morph(binary: &ClassMap, size: usize, erode: bool) -> ClassMap {
    let (rows, cols) = binary.dim();
    let (lo, hi) = if erode {
        (-(size as i64 / 2), (size as i64 - 1) / 2)
    } else {
        (-((size as i64 - 1) / 2), size as i64 / 2)
    };
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        let mut acc = if erode { 1u8 } else { 0u8 };
        for wi in lo..=hi {
            for wj in lo..=hi {
                let ii = i as i64 + wi;
                let jj = j as i64 + wj;
                if ii < 0 || ii >= rows as i64 || jj < 0 || jj >= cols as i64 {
                    continue;
                }
                let v = binary[[ii as usize, jj as usize]];
                if erode {
                    acc &= v;
                } else {
                    acc |= v;
                }
            }
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_otsu_separates_bimodal_values() {
        let mut band = Array2::<f32>::from_elem((10, 10), 0.1);
        for i in 0..10 {
            for j in 5..10 {
                band[[i, j]] = 0.9;
            }
        }
        let t = otsu_threshold(&band);
        assert!(t > 0.1 && t < 0.9);
    }

    #[test]
    fn test_otsu_uniform_image() {
        let band = Array2::<f32>::from_elem((5, 5), 0.3);
        assert_eq!(otsu_threshold(&band), 0.3);
    }

    #[test]
    fn test_mask_keeps_small_bright_features() {
        // A 3x3 bright block in a dark field survives the top-hat; a block
        // larger than the structuring element would be opened away.
        let mut band = Array2::<f32>::from_elem((24, 24), 0.1);
        for i in 10..13 {
            for j in 10..13 {
                band[[i, j]] = 0.9;
            }
        }
        let mask = builtup_mask(&band);
        assert_eq!(mask[[11, 11]], 1);
        assert_eq!(mask[[0, 0]], 0);
    }

    #[test]
    fn test_mask_suppresses_large_regions() {
        // Bright half-plane: larger than the element, fully opened, no mask
        let mut band = Array2::<f32>::from_elem((30, 30), 0.1);
        for i in 0..30 {
            for j in 0..15 {
                band[[i, j]] = 0.9;
            }
        }
        let mask = builtup_mask(&band);
        assert_eq!(mask[[15, 7]], 0);
    }

    #[test]
    fn test_element_sized_block_fully_opened() {
        // A bright block exactly the element size is reconstructed by the
        // opening with no shift, so the top-hat is empty everywhere
        let mut band = Array2::<f32>::from_elem((30, 30), 0.1);
        for i in 8..18 {
            for j in 8..18 {
                band[[i, j]] = 0.9;
            }
        }
        let mask = builtup_mask(&band);
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_nan_pixels_stay_unmasked() {
        let mut band = Array2::<f32>::from_elem((12, 12), 0.1);
        band[[3, 3]] = f32::NAN;
        for i in 6..8 {
            for j in 6..8 {
                band[[i, j]] = 0.9;
            }
        }
        let mask = builtup_mask(&band);
        assert_eq!(mask[[3, 3]], 0);
    }
}
