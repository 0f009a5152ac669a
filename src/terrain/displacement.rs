//! Diamond-square midpoint displacement.

use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::Heightfield;
use super::random::TerrainRng;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementParameters {
    /// Lower bound of the random offset at the first pass
    pub height_min: f32,
    /// Upper bound of the random offset at the first pass
    pub height_max: f32,
    /// Base of the per-pass decay `dampener_power^-roughness`
    pub dampener_power: f32,
    pub roughness: f32,
}

impl Default for DisplacementParameters {
    fn default() -> Self {
        Self {
            height_min: -2.0,
            height_max: 2.0,
            dampener_power: 2.0,
            roughness: 2.0,
        }
    }
}

impl DisplacementParameters {
    /// Factor applied to both offset bounds after every pass
    pub fn dampener(&self) -> f32 {
        self.dampener_power.powf(-self.roughness)
    }

    pub fn validate(&self) -> Result<()> {
        let dampener = self.dampener();
        if !dampener.is_finite() {
            return Err(TerrainError::invalid(
                "dampener_power",
                format!("{}^-{} is not finite", self.dampener_power, self.roughness),
            ));
        }
        Ok(())
    }
}

pub struct DisplacementGenerator;

impl DisplacementGenerator {
    /// Checks that a grid of `resolution` cells per side can be displaced with
    /// `params` without touching it.
    pub fn validate(resolution: usize, params: &DisplacementParameters) -> Result<()> {
        let width = resolution.saturating_sub(1);
        if width == 0 || !width.is_power_of_two() {
            return Err(TerrainError::invalid(
                "resolution",
                format!("diamond-square needs 2^n + 1 cells per side, got {resolution}"),
            ));
        }
        params.validate()
    }

    /// Runs diamond-square over the whole grid, adding to the existing values.
    ///
    /// The resolution must be `2^n + 1`. Edge midpoints whose outer sample
    /// would fall on or beyond the border are left alone, so the outermost
    /// ring is only touched at coarse levels.
    ///
    /// The last pass (`square_size == 1`) puts every "midpoint" on a cell of
    /// its own square, so it re-averages each cell with its right, lower and
    /// diagonal neighbors. That pass runs over the whole grid except the four
    /// corners, which are never written; their random draw is still consumed.
    pub fn apply(
        field: &mut Heightfield,
        params: &DisplacementParameters,
        rng: &mut TerrainRng,
    ) -> Result<()> {
        let resolution = field.resolution();
        Self::validate(resolution, params)?;
        let width = resolution - 1;
        let dampener = params.dampener();

        log::debug!(
            "Diamond-square on {resolution}x{resolution}, offsets {}..{}, dampener {dampener}",
            params.height_min,
            params.height_max
        );

        let mut height_min = params.height_min;
        let mut height_max = params.height_max;
        let mut square_size = width;
        let heights = field.heights_mut();
        let at = |x: usize, y: usize| y * resolution + x;
        let is_corner = |x: usize, y: usize| (x == 0 || x == width) && (y == 0 || y == width);

        while square_size > 0 {
            let half = square_size / 2;

            // 菱形步：方块中心 = 四角平均 + 随机偏移
            for x in (0..width).step_by(square_size) {
                for y in (0..width).step_by(square_size) {
                    let (cx, cy) = (x + square_size, y + square_size);
                    let (mx, my) = (x + half, y + half);
                    let value = (heights[at(x, y)]
                        + heights[at(cx, y)]
                        + heights[at(x, cy)]
                        + heights[at(cx, cy)])
                        / 4.0
                        + rng.uniform(height_min, height_max);
                    // 边长为 1 时中点落在左上角上
                    if !is_corner(mx, my) {
                        heights[at(mx, my)] = value;
                    }
                }
            }

            // 方形步：四条边的中点，中心值每次重新读取
            for x in (0..width).step_by(square_size) {
                for y in (0..width).step_by(square_size) {
                    let (cx, cy) = (x + square_size, y + square_size);
                    let (mx, my) = (x + half, y + half);

                    let left = mx as isize - square_size as isize;
                    let down = my as isize - square_size as isize;
                    let right = mx + square_size;
                    let up = my + square_size;
                    if left <= 0 || down <= 0 || right >= width - 1 || up >= width - 1 {
                        continue;
                    }
                    let (left, down) = (left as usize, down as usize);

                    heights[at(mx, y)] = (heights[at(mx, down)]
                        + heights[at(mx, my)]
                        + heights[at(x, y)]
                        + heights[at(cx, y)])
                        / 4.0
                        + rng.uniform(height_min, height_max);
                    heights[at(mx, cy)] = (heights[at(mx, up)]
                        + heights[at(mx, my)]
                        + heights[at(x, cy)]
                        + heights[at(cx, cy)])
                        / 4.0
                        + rng.uniform(height_min, height_max);
                    heights[at(x, my)] = (heights[at(left, my)]
                        + heights[at(mx, my)]
                        + heights[at(x, cy)]
                        + heights[at(x, y)])
                        / 4.0
                        + rng.uniform(height_min, height_max);
                    heights[at(cx, my)] = (heights[at(right, my)]
                        + heights[at(mx, my)]
                        + heights[at(cx, cy)]
                        + heights[at(cx, y)])
                        / 4.0
                        + rng.uniform(height_min, height_max);
                }
            }

            square_size /= 2;
            height_min *= dampener;
            height_max *= dampener;
        }

        Ok(())
    }
}
