//! Voronoi peak generator.
//!
//! Raises a handful of random peaks and lets each one fall off with distance,
//! keeping the higher of the existing height and the falloff surface.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::Heightfield;
use super::random::TerrainRng;

/// Falloff curve of a peak as a function of normalized distance `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// `peak - d * falloff`
    #[default]
    Linear,
    /// `peak - d^dropoff * falloff`
    Power,
    /// `peak - d * falloff - d^dropoff`
    Combined,
    /// `peak - (3d)^falloff - sin(2πd) / dropoff`
    PowerSin,
}

impl BlendMode {
    pub fn surface(self, peak: f32, d: f32, falloff: f32, dropoff: f32) -> f32 {
        match self {
            BlendMode::Linear => peak - d * falloff,
            BlendMode::Power => peak - d.powf(dropoff) * falloff,
            BlendMode::Combined => peak - d * falloff - d.powf(dropoff),
            BlendMode::PowerSin => {
                peak - (d * 3.0).powf(falloff) - (d * std::f32::consts::TAU).sin() / dropoff
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiParameters {
    pub peak_count: u32,
    pub min_height: f32,
    pub max_height: f32,
    pub falloff: f32,
    pub dropoff: f32,
    pub blend_mode: BlendMode,
}

impl Default for VoronoiParameters {
    fn default() -> Self {
        Self {
            peak_count: 4,
            min_height: 0.1,
            max_height: 0.9,
            falloff: 0.2,
            dropoff: 0.6,
            blend_mode: BlendMode::Linear,
        }
    }
}

impl VoronoiParameters {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_height.is_finite() && self.max_height.is_finite()) {
            return Err(TerrainError::invalid("voronoi height range", "must be finite"));
        }
        if self.blend_mode == BlendMode::PowerSin && self.dropoff == 0.0 {
            return Err(TerrainError::invalid("dropoff", "PowerSin divides by dropoff, must not be 0"));
        }
        Ok(())
    }
}

/// An accepted peak: grid cell and the height it was raised to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub x: usize,
    pub z: usize,
    pub height: f32,
}

/// A proposed peak is dropped entirely, falloff included, when the cell under
/// it is already at least as high as the peak. This also discards peaks that
/// would still have raised distant cells.
pub const SKIP_PEAK_ON_HIGHER_GROUND: bool = true;

pub struct VoronoiGenerator;

impl VoronoiGenerator {
    /// Places `peak_count` peaks and returns the accepted ones in order.
    pub fn apply(
        field: &mut Heightfield,
        params: &VoronoiParameters,
        rng: &mut TerrainRng,
    ) -> Result<Vec<Peak>> {
        params.validate()?;
        let resolution = field.resolution();
        log::debug!(
            "Voronoi: {} peaks, height {}..{}, {:?}",
            params.peak_count,
            params.min_height,
            params.max_height,
            params.blend_mode
        );

        // 网格对角线长度，用于把距离归一化
        let max_distance = (resolution as f32) * std::f32::consts::SQRT_2;
        let mut accepted = Vec::new();

        for _ in 0..params.peak_count {
            let px = rng.range_int(0, resolution as i32);
            let peak_height = rng.uniform(params.min_height, params.max_height);
            let pz = rng.range_int(0, resolution as i32);

            let (px, pz) = (px as i64, pz as i64);
            if field.get_height(px, pz) < peak_height {
                field.set_height(px, pz, peak_height);
            } else if SKIP_PEAK_ON_HIGHER_GROUND {
                log::trace!("Voronoi: peak at ({px}, {pz}) below existing ground, skipped");
                continue;
            }
            accepted.push(Peak {
                x: px as usize,
                z: pz as usize,
                height: peak_height,
            });

            let (peak_x, peak_z) = (px as f32, pz as f32);
            field
                .heights_mut()
                .par_chunks_mut(resolution)
                .enumerate()
                .for_each(|(y, row)| {
                    for (x, h) in row.iter_mut().enumerate() {
                        let d = (x as f32 - peak_x).hypot(y as f32 - peak_z) / max_distance;
                        let surface =
                            params
                                .blend_mode
                                .surface(peak_height, d, params.falloff, params.dropoff);
                        if *h < surface {
                            *h = surface;
                        }
                    }
                });
        }

        log::info!("Voronoi: accepted {}/{} peaks", accepted.len(), params.peak_count);
        Ok(accepted)
    }
}
