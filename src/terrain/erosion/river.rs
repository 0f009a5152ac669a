// 河流侵蚀
//
// 每个水滴在侵蚀图上留下 strength 的量，随后沿下坡路径搬运；
// 搬运只移动侵蚀量不复制，所以侵蚀图总量恒为 droplet_count * strength

use super::ErosionParameters;
use crate::terrain::grid::Heightfield;
use crate::terrain::random::TerrainRng;

/// Runs every droplet and its springs, then subtracts the erosion map.
/// Returns the total height removed.
pub(super) fn run(field: &mut Heightfield, params: &ErosionParameters, rng: &mut TerrainRng) -> f32 {
    let resolution = field.resolution();
    let mut erosion = vec![0.0f32; resolution * resolution];

    for _ in 0..params.droplet_count {
        let x = rng.range_int(0, resolution as i32) as usize;
        let y = rng.range_int(0, resolution as i32) as usize;
        erosion[field.index(x, y)] += params.strength;

        for _ in 0..params.springs_per_river {
            trace_spring(field, &mut erosion, (x, y), params, rng);
        }
    }

    let mut removed = 0.0;
    for (h, &e) in field.heights_mut().iter_mut().zip(&erosion) {
        if e > 0.0 {
            *h -= e;
            removed += e;
        }
    }
    log::trace!("River: removed {removed} across {} droplet(s)", params.droplet_count);
    removed
}

/// One downhill walk from `start`.
///
/// Each step moves to the first strictly lower neighbor in shuffled order,
/// carrying the erosion value along and leaving `solubility / amount` of it
/// behind. When no lower neighbor exists the sediment picked up on the way
/// is dropped onto the final cell.
fn trace_spring(
    field: &mut Heightfield,
    erosion: &mut [f32],
    start: (usize, usize),
    params: &ErosionParameters,
    rng: &mut TerrainRng,
) {
    let keep = if params.amount > 0.0 {
        (params.solubility / params.amount).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let mut lifetime = params.amount;
    let mut held_sediment = 0.0;
    let (mut x, mut y) = start;

    // 严格下坡，路径不会回头，循环必然结束
    while lifetime > 0.0 {
        let mut order = field.neighbors(x, y).to_vec();
        rng.shuffle(&mut order);

        let here = field.index(x, y);
        let current = field.heights()[here];
        let lower = order
            .into_iter()
            .find(|&(nx, ny)| field.heights()[field.index(nx, ny)] < current);

        match lower {
            Some((nx, ny)) => {
                let there = field.index(nx, ny);
                let moved = erosion[here] * (1.0 - keep);
                erosion[here] -= moved;
                erosion[there] += moved;
                x = nx;
                y = ny;
                lifetime -= params.solubility;
                held_sediment += params.solubility;
            }
            None => {
                field.heights_mut()[here] += held_sediment;
                return;
            }
        }
    }
}
