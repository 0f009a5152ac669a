use rayon::prelude::*;

use super::grid::{moore_neighbors, Heightfield};
use super::progress::{Progress, RunStatus};

/// Box-averages every cell with its Moore neighbors `iterations` times.
///
/// Each iteration reads one snapshot and writes a second buffer, so the
/// result does not depend on visiting order. Edge cells average over fewer
/// samples.
pub fn smooth(field: &mut Heightfield, iterations: u32, progress: &Progress) -> RunStatus {
    let resolution = field.resolution();
    log::debug!("Smoothing {resolution}x{resolution} grid, {iterations} iteration(s)");

    let mut scratch = vec![0.0f32; resolution * resolution];
    for i in 0..iterations {
        if let Some(status) = progress.check("smooth") {
            return status;
        }

        let current = field.heights();
        scratch
            .par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let neighbors = moore_neighbors(x, y, resolution, resolution);
                    let sum: f32 = neighbors
                        .iter()
                        .map(|&(nx, ny)| current[ny * resolution + nx])
                        .sum();
                    *out = (sum + current[y * resolution + x]) / (neighbors.len() + 1) as f32;
                }
            });
        field.heights_mut().swap_with_slice(&mut scratch);

        progress.report("smooth", i as usize + 1, iterations as usize);
    }

    RunStatus::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::grid::TerrainSize;
    use approx::assert_relative_eq;

    fn field(resolution: usize) -> Heightfield {
        Heightfield::new(resolution, TerrainSize::default()).unwrap()
    }

    #[test]
    fn test_constant_field_is_fixed_point() {
        let mut f = field(9);
        f.fill(0.37);
        assert!(smooth(&mut f, 1, &Progress::new()).is_completed());
        for &h in f.heights() {
            assert_relative_eq!(h, 0.37, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_spike_spreads_evenly() {
        let mut f = field(5);
        f.set_height(2, 2, 9.0);
        smooth(&mut f, 1, &Progress::new());

        // 中心和八个邻居都读取同一份快照
        assert_relative_eq!(f.get_height(2, 2), 1.0);
        for (x, y) in [(1, 1), (2, 1), (3, 1), (1, 2), (3, 2), (1, 3), (2, 3), (3, 3)] {
            assert_relative_eq!(f.get_height(x, y), 1.0);
        }
        assert_eq!(f.get_height(0, 0), 0.0);
    }

    #[test]
    fn test_corner_divisor() {
        let mut f = field(4);
        f.set_height(0, 0, 4.0);
        smooth(&mut f, 1, &Progress::new());
        // 角点：三个邻居 + 自身夹取样本 + 自身 = 5 个样本，其中两个是 4.0
        assert_relative_eq!(f.get_height(0, 0), 8.0 / 5.0);
    }

    #[test]
    fn test_reduces_variance() {
        let mut f = field(17);
        for (i, h) in f.heights_mut().iter_mut().enumerate() {
            *h = if i % 2 == 0 { 1.0 } else { 0.0 };
        }
        let spread = |f: &Heightfield| {
            let (min, max) = f.min_max();
            max - min
        };
        let before = spread(&f);
        smooth(&mut f, 3, &Progress::new());
        assert!(spread(&f) < before);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut f = field(5);
        f.set_height(2, 2, 1.0);
        let before = f.clone();
        let progress = Progress::new();
        progress.cancel();
        assert_eq!(smooth(&mut f, 4, &progress), RunStatus::Cancelled);
        assert_eq!(f, before);
    }
}
