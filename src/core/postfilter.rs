use crate::types::ClassMap;
use ndarray::Array2;

/// Post-classification moving-window majority filter.
///
/// The window edge is `2 * radius + 1` (1 = 3x3, 3 = 7x7, 5 = 11x11), so
/// `radius` counts pixels on each side of the center. Ties keep the center
/// class; the window is clipped at image borders. `radius` 0 is the
/// identity.
pub fn majority_filter(map: &ClassMap, radius: usize) -> ClassMap {
    if radius == 0 {
        return map.clone();
    }
    let (rows, cols) = map.dim();
    log::info!(
        "majority filter: {}x{} window over {} x {} map",
        2 * radius + 1,
        2 * radius + 1,
        rows,
        cols
    );
    let r = radius as i64;
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        let center = map[[i, j]];
        let mut counts = [0u32; 256];
        for wi in -r..=r {
            for wj in -r..=r {
                let ii = i as i64 + wi;
                let jj = j as i64 + wj;
                if ii < 0 || ii >= rows as i64 || jj < 0 || jj >= cols as i64 {
                    continue;
                }
                counts[map[[ii as usize, jj as usize]] as usize] += 1;
            }
        }
        let mut best = center;
        let mut best_count = counts[center as usize];
        for (class, &count) in counts.iter().enumerate() {
            if count > best_count {
                best = class as u8;
                best_count = count;
            }
        }
        best
    })
}
