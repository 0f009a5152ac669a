//! Texture splat classification.
//!
//! Each layer claims the cells whose height falls inside its (noise-widened)
//! band and whose slope falls inside its slope band. Claims are normalized per
//! cell so the weights of a cell add up to 1, or are all 0 when no layer
//! claimed it.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::{AlphaMap, Heightfield};
use super::noise::NoiseSynthesizer;
use super::progress::{Progress, RunStatus};

/// One texture layer. Its position in the layer list is its output channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatLayer {
    pub min_height: f32,
    pub max_height: f32,
    /// Degrees
    pub min_slope: f32,
    /// Degrees
    pub max_slope: f32,
    pub blend_noise_input_scale: f32,
    pub blend_noise_multiplier: f32,
    pub blend_offset: f32,
}

impl Default for SplatLayer {
    fn default() -> Self {
        Self {
            min_height: 0.1,
            max_height: 0.2,
            min_slope: 0.0,
            max_slope: 1.5,
            blend_noise_input_scale: 0.01,
            blend_noise_multiplier: 0.1,
            blend_offset: 0.1,
        }
    }
}

impl SplatLayer {
    /// Whether the layer claims a cell with the given height and slope.
    /// `noise` is the base noise sampled at the cell for this layer.
    pub fn matches(&self, height: f32, slope: f32, noise: f32) -> bool {
        let offset = self.blend_offset + noise * self.blend_noise_multiplier;
        let height_ok = height >= self.min_height - offset && height <= self.max_height + offset;
        let slope_ok = slope >= self.min_slope && slope <= self.max_slope;
        height_ok && slope_ok
    }
}

/// Scales `v` so it sums to 1. A zero vector stays zero.
pub fn normalize_weights(v: &mut [f32]) {
    let total: f32 = v.iter().sum();
    if total > 0.0 {
        for w in v.iter_mut() {
            *w /= total;
        }
    } else {
        v.fill(0.0);
    }
}

/// Proportional index remap from a grid of `from` cells onto one of `to` cells.
pub(crate) fn remap_index(i: usize, from: usize, to: usize) -> usize {
    if from <= 1 || to <= 1 {
        return 0;
    }
    (i * (to - 1) / (from - 1)).min(to - 1)
}

#[derive(Clone, Default)]
pub struct SplatClassifier {
    noise: NoiseSynthesizer,
}

impl SplatClassifier {
    pub fn new(noise: NoiseSynthesizer) -> Self {
        Self { noise }
    }

    /// Classifies at the heightfield's own resolution.
    pub fn classify(
        &self,
        field: &Heightfield,
        layers: &[SplatLayer],
        progress: &Progress,
    ) -> Result<(AlphaMap, RunStatus)> {
        let r = field.resolution();
        self.classify_at(field, layers, r, r, progress)
    }

    /// Classifies onto an alpha map of `width × height` cells, resampling the
    /// heightfield by proportional remapping. Rows skipped after a
    /// cancellation stay zero.
    pub fn classify_at(
        &self,
        field: &Heightfield,
        layers: &[SplatLayer],
        width: usize,
        height: usize,
        progress: &Progress,
    ) -> Result<(AlphaMap, RunStatus)> {
        if layers.is_empty() {
            return Err(TerrainError::EmptyLayerSet("splat layer"));
        }
        if width == 0 || height == 0 {
            return Err(TerrainError::invalid(
                "alpha map size",
                format!("{width}x{height} has no cells"),
            ));
        }
        log::debug!("Splat: {} layer(s) onto {width}x{height} alpha map", layers.len());

        let resolution = field.resolution();
        let last = (resolution - 1).max(1) as f32;
        let stride = width * layers.len();
        let mut alpha = AlphaMap::new(width, height, layers.len());

        alpha
            .as_mut_slice()
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(y, row)| {
                if progress.is_cancelled() {
                    return;
                }
                let hy = remap_index(y, height, resolution);
                for (x, weights) in row.chunks_mut(layers.len()).enumerate() {
                    let hx = remap_index(x, width, resolution);
                    let cell_height = field.heights()[field.index(hx, hy)];
                    let slope = field.get_steepness(hx as f32 / last, hy as f32 / last);

                    for (layer, w) in layers.iter().zip(weights.iter_mut()) {
                        let noise = self.noise.base_noise(
                            x as f32 * layer.blend_noise_input_scale,
                            y as f32 * layer.blend_noise_input_scale,
                        );
                        *w = if layer.matches(cell_height, slope, noise) { 1.0 } else { 0.0 };
                    }
                    normalize_weights(weights);
                }
            });

        if let Some(status) = progress.check("splat") {
            return Ok((alpha, status));
        }
        progress.report("splat", height, height);
        Ok((alpha, RunStatus::Completed))
    }
}
