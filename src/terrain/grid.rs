//! Square heightfield and the derived grids built from it.
//!
//! Storage is row-major (`heights[y * resolution + x]`). Every accessor used by
//! the algorithms clamps its coordinates into the grid, so out-of-range reads
//! and writes never reach the caller as errors.

use serde::{Deserialize, Serialize};
use std::ops::Deref;

use super::error::{Result, TerrainError};

/// World-space extent of the terrain: `width` along x, `height` vertically,
/// `length` along z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSize {
    pub width: f32,
    pub height: f32,
    pub length: f32,
}

impl Default for TerrainSize {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 600.0,
            length: 1000.0,
        }
    }
}

impl TerrainSize {
    pub fn new(width: f32, height: f32, length: f32) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("size.width", self.width),
            ("size.height", self.height),
            ("size.length", self.length),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TerrainError::invalid(
                    name,
                    format!("must be positive and finite, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Moore neighbors of a cell, clamped to the grid with duplicates removed.
///
/// Offsets are visited row by row (`dy` outer, `dx` inner). Clamping at an
/// edge can map an offset back onto the centre cell; that sample is kept,
/// it only ever appears once.
#[derive(Debug, Clone, Copy)]
pub struct Neighbors {
    cells: [(usize, usize); 8],
    len: usize,
}

impl Deref for Neighbors {
    type Target = [(usize, usize)];

    fn deref(&self) -> &Self::Target {
        &self.cells[..self.len]
    }
}

pub fn moore_neighbors(x: usize, y: usize, width: usize, height: usize) -> Neighbors {
    let mut out = Neighbors {
        cells: [(0, 0); 8],
        len: 0,
    };
    if width == 0 || height == 0 {
        return out;
    }

    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = (x as isize + dx).clamp(0, width as isize - 1) as usize;
            let ny = (y as isize + dy).clamp(0, height as isize - 1) as usize;
            if !out.cells[..out.len].contains(&(nx, ny)) {
                out.cells[out.len] = (nx, ny);
                out.len += 1;
            }
        }
    }
    out
}

/// Rectangular copy of part of a heightfield.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightPatch {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl HeightPatch {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.values[y * self.width + x])
    }
}

/// R×R elevation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    resolution: usize,
    size: TerrainSize,
    heights: Vec<f32>,
}

impl Heightfield {
    /// Flat grid of zeros.
    pub fn new(resolution: usize, size: TerrainSize) -> Result<Self> {
        if resolution == 0 {
            return Err(TerrainError::invalid("resolution", "grid must not be empty"));
        }
        size.validate()?;
        Ok(Self {
            resolution,
            size,
            heights: vec![0.0; resolution * resolution],
        })
    }

    /// Wraps existing values (row-major, `resolution²` long).
    pub fn from_values(resolution: usize, size: TerrainSize, heights: Vec<f32>) -> Result<Self> {
        let mut field = Self::new(resolution, size)?;
        if heights.len() != resolution * resolution {
            return Err(TerrainError::invalid(
                "heights",
                format!(
                    "expected {} values for resolution {resolution}, got {}",
                    resolution * resolution,
                    heights.len()
                ),
            ));
        }
        field.heights = heights;
        Ok(field)
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn size(&self) -> TerrainSize {
        self.size
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.resolution + x
    }

    #[inline]
    fn clamp_coord(&self, v: i64) -> usize {
        v.clamp(0, self.resolution as i64 - 1) as usize
    }

    /// Height at a cell; coordinates are clamped into the grid.
    pub fn get_height(&self, x: i64, y: i64) -> f32 {
        let (x, y) = (self.clamp_coord(x), self.clamp_coord(y));
        self.heights[self.index(x, y)]
    }

    pub fn set_height(&mut self, x: i64, y: i64, value: f32) {
        let (x, y) = (self.clamp_coord(x), self.clamp_coord(y));
        let idx = self.index(x, y);
        self.heights[idx] = value;
    }

    /// Adds `delta` to a cell; coordinates are clamped into the grid.
    pub fn add_height(&mut self, x: i64, y: i64, delta: f32) {
        let (x, y) = (self.clamp_coord(x), self.clamp_coord(y));
        let idx = self.index(x, y);
        self.heights[idx] += delta;
    }

    /// Copies a rectangle out of the grid. The rectangle is clipped to the
    /// grid, so the patch may be smaller than requested.
    pub fn get_heights(&self, x0: usize, y0: usize, width: usize, height: usize) -> HeightPatch {
        let x_end = x0.saturating_add(width).min(self.resolution);
        let y_end = y0.saturating_add(height).min(self.resolution);
        let w = x_end.saturating_sub(x0);
        let h = y_end.saturating_sub(y0);

        if w == 0 || h == 0 {
            return HeightPatch::new(0, 0);
        }
        let mut patch = HeightPatch::new(w, h);
        for y in 0..h {
            let src = self.index(x0, y0 + y);
            patch.values[y * w..(y + 1) * w].copy_from_slice(&self.heights[src..src + w]);
        }
        patch
    }

    /// Writes a patch with its top-left corner at (x0, y0). Cells falling
    /// outside the grid are dropped.
    pub fn set_heights(&mut self, x0: usize, y0: usize, patch: &HeightPatch) {
        for py in 0..patch.height {
            let y = y0 + py;
            if y >= self.resolution {
                break;
            }
            for px in 0..patch.width {
                let x = x0 + px;
                if x >= self.resolution {
                    break;
                }
                let idx = self.index(x, y);
                self.heights[idx] = patch.values[py * patch.width + px];
            }
        }
    }

    pub fn neighbors(&self, x: usize, y: usize) -> Neighbors {
        moore_neighbors(x, y, self.resolution, self.resolution)
    }

    pub fn reset(&mut self) {
        self.heights.fill(0.0);
    }

    pub fn fill(&mut self, value: f32) {
        self.heights.fill(value);
    }

    pub fn min_max(&self) -> (f32, f32) {
        let min = self.heights.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.heights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        (min, max)
    }

    /// Rescales heights into [0, 1]. A flat grid is left untouched.
    pub fn normalize(&mut self) {
        let (min, max) = self.min_max();
        let range = max - min;
        if range <= f32::EPSILON {
            return;
        }
        for h in &mut self.heights {
            *h = (*h - min) / range;
        }
    }

    /// Bilinear sample at normalized coordinates, in grid units.
    pub fn sample_normalized(&self, u: f32, v: f32) -> f32 {
        let last = (self.resolution - 1) as f32;
        let x = u.clamp(0.0, 1.0) * last;
        let y = v.clamp(0.0, 1.0) * last;

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.resolution - 1);
        let y1 = (y0 + 1).min(self.resolution - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let h00 = self.heights[self.index(x0, y0)];
        let h10 = self.heights[self.index(x1, y0)];
        let h01 = self.heights[self.index(x0, y1)];
        let h11 = self.heights[self.index(x1, y1)];

        let h0 = h00 + (h10 - h00) * fx;
        let h1 = h01 + (h11 - h01) * fx;
        h0 + (h1 - h0) * fy
    }

    /// Bilinear height at normalized coordinates, in world units.
    pub fn get_interpolated_height(&self, u: f32, v: f32) -> f32 {
        self.sample_normalized(u, v) * self.size.height
    }

    /// Steepest local slope in degrees at normalized coordinates.
    pub fn get_steepness(&self, u: f32, v: f32) -> f32 {
        if self.resolution < 2 {
            return 0.0;
        }
        let step = 1.0 / (self.resolution - 1) as f32;
        let u = u.clamp(0.0, 1.0);
        let v = v.clamp(0.0, 1.0);

        let gradient = |lo: f32, hi: f32, extent: f32, sample: &dyn Fn(f32) -> f32| {
            let run = (hi - lo) * extent;
            if run <= 0.0 {
                0.0
            } else {
                (sample(hi) - sample(lo)) * self.size.height / run
            }
        };

        let (u0, u1) = ((u - step).max(0.0), (u + step).min(1.0));
        let (v0, v1) = ((v - step).max(0.0), (v + step).min(1.0));
        let dx = gradient(u0, u1, self.size.width, &|s| self.sample_normalized(s, v));
        let dz = gradient(v0, v1, self.size.length, &|s| self.sample_normalized(u, s));

        dx.hypot(dz).atan().to_degrees()
    }
}

/// Per-cell texture blend weights, `layers` floats per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaMap {
    pub width: usize,
    pub height: usize,
    pub layers: usize,
    weights: Vec<f32>,
}

impl AlphaMap {
    pub fn new(width: usize, height: usize, layers: usize) -> Self {
        Self {
            width,
            height,
            layers,
            weights: vec![0.0; width * height * layers],
        }
    }

    pub fn weights(&self, x: usize, y: usize) -> Result<&[f32]> {
        if x >= self.width || y >= self.height {
            return Err(TerrainError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                width: self.width,
                height: self.height,
            });
        }
        let start = (y * self.width + x) * self.layers;
        Ok(&self.weights[start..start + self.layers])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.weights
    }
}

/// Occupancy mask for one ground-cover species.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLayer {
    pub width: usize,
    pub height: usize,
    cells: Vec<bool>,
}

impl DetailLayer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Result<bool> {
        if x >= self.width || y >= self.height {
            return Err(TerrainError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                width: self.width,
                height: self.height,
            });
        }
        Ok(self.cells[y * self.width + x])
    }

    pub(crate) fn mark(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = true;
        }
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}
