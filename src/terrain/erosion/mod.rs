//! Erosion passes over a heightfield.
//!
//! [`ErosionSimulator::erode`] runs one variant `iterations` times and then
//! smooths the result. Every variant edits the grid in place as it goes, so
//! an error or a cancellation part way through leaves the grid partially
//! eroded; nothing is rolled back.

mod canyon;
mod river;
mod wind;

pub use canyon::CANYON_STACK_LIMIT;

use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::Heightfield;
use super::noise::NoiseSynthesizer;
use super::progress::{Progress, RunStatus};
use super::random::TerrainRng;
use super::smooth::smooth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErosionKind {
    /// Random droplets each remove `strength`
    #[default]
    Rain,
    /// Material slides from a cell to neighbors lower by more than `strength`
    Thermal,
    /// Wet cells next to dry ones are flattened to the water line
    Tidal,
    /// Downhill walks carve an erosion map that is subtracted at the end
    River,
    /// Directional dig-and-pile sweep across the grid
    Wind,
    /// A crawler carves a branching trench from the left edge
    Canyon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParameters {
    pub kind: ErosionKind,
    pub strength: f32,
    pub amount: f32,
    pub droplet_count: u32,
    pub solubility: f32,
    pub springs_per_river: u32,
    pub wind_direction_degrees: f32,
    pub iterations: u32,
    pub post_smooth_iterations: u32,
    /// Water line used by [`ErosionKind::Tidal`]
    pub water_height: f32,
    /// Cap on pending crawler frames for [`ErosionKind::Canyon`]
    pub canyon_stack_limit: usize,
}

impl Default for ErosionParameters {
    fn default() -> Self {
        Self {
            kind: ErosionKind::Rain,
            strength: 0.1,
            amount: 0.01,
            droplet_count: 10,
            solubility: 0.01,
            springs_per_river: 5,
            wind_direction_degrees: 15.0,
            iterations: 5,
            post_smooth_iterations: 5,
            water_height: 0.1,
            canyon_stack_limit: CANYON_STACK_LIMIT,
        }
    }
}

impl ErosionParameters {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("strength", self.strength),
            ("amount", self.amount),
            ("solubility", self.solubility),
            ("wind_direction_degrees", self.wind_direction_degrees),
            ("water_height", self.water_height),
        ] {
            if !value.is_finite() {
                return Err(TerrainError::invalid(name, "must be finite"));
            }
        }
        if self.canyon_stack_limit == 0 {
            return Err(TerrainError::invalid("canyon_stack_limit", "must be at least 1"));
        }
        Ok(())
    }
}

/// Runs erosion variants. The noise source drives the wind perturbation.
#[derive(Clone, Default)]
pub struct ErosionSimulator {
    noise: NoiseSynthesizer,
}

impl ErosionSimulator {
    pub fn new(noise: NoiseSynthesizer) -> Self {
        Self { noise }
    }

    /// Runs `params.kind` `params.iterations` times, then smooths
    /// `params.post_smooth_iterations` times.
    ///
    /// Cancellation is checked before each iteration. A canyon that outgrows
    /// its stack limit fails with the grid already partly carved.
    pub fn erode(
        &self,
        field: &mut Heightfield,
        params: &ErosionParameters,
        rng: &mut TerrainRng,
        progress: &Progress,
    ) -> Result<RunStatus> {
        params.validate()?;
        log::debug!(
            "Erosion {:?}: {} iteration(s), strength {}, amount {}",
            params.kind,
            params.iterations,
            params.strength,
            params.amount
        );

        for i in 0..params.iterations {
            if let Some(status) = progress.check("erosion") {
                return Ok(status);
            }
            match params.kind {
                ErosionKind::Rain => rain(field, params, rng),
                ErosionKind::Thermal => thermal(field, params),
                ErosionKind::Tidal => tidal(field, params),
                ErosionKind::River => {
                    river::run(field, params, rng);
                }
                ErosionKind::Wind => wind::run(field, params, &self.noise),
                ErosionKind::Canyon => canyon::run(field, params, rng)?,
            }
            progress.report("erosion", i as usize + 1, params.iterations as usize);
        }

        Ok(smooth(field, params.post_smooth_iterations, progress))
    }
}

fn rain(field: &mut Heightfield, params: &ErosionParameters, rng: &mut TerrainRng) {
    let resolution = field.resolution() as i32;
    for _ in 0..params.droplet_count {
        let x = rng.range_int(0, resolution);
        let y = rng.range_int(0, resolution);
        field.add_height(x as i64, y as i64, -params.strength);
    }
}

// 热力侵蚀：逐格读写同一缓冲区，后面的格子会看到前面的结果
fn thermal(field: &mut Heightfield, params: &ErosionParameters) {
    let resolution = field.resolution();
    for y in 0..resolution {
        for x in 0..resolution {
            let here = field.index(x, y);
            for &(nx, ny) in field.neighbors(x, y).iter() {
                let there = field.index(nx, ny);
                let heights = field.heights_mut();
                if heights[here] > heights[there] + params.strength {
                    let moved = heights[here] * params.amount;
                    heights[here] -= moved;
                    heights[there] += moved;
                }
            }
        }
    }
}

// 潮汐：水下格子与相邻的陆地格子一起被压到水位线
fn tidal(field: &mut Heightfield, params: &ErosionParameters) {
    let resolution = field.resolution();
    let water = params.water_height;
    for y in 0..resolution {
        for x in 0..resolution {
            let here = field.index(x, y);
            for &(nx, ny) in field.neighbors(x, y).iter() {
                let there = field.index(nx, ny);
                let heights = field.heights_mut();
                if heights[here] < water && heights[there] > water {
                    heights[here] = water;
                    heights[there] = water;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::grid::TerrainSize;
    use approx::assert_relative_eq;

    fn field(resolution: usize) -> Heightfield {
        Heightfield::new(resolution, TerrainSize::default()).unwrap()
    }

    fn params(kind: ErosionKind) -> ErosionParameters {
        ErosionParameters {
            kind,
            iterations: 1,
            post_smooth_iterations: 0,
            ..Default::default()
        }
    }

    fn total(f: &Heightfield) -> f32 {
        f.heights().iter().sum()
    }

    #[test]
    fn test_rain_removes_strength_per_droplet() {
        let mut f = field(9);
        f.fill(1.0);
        let p = ErosionParameters {
            droplet_count: 20,
            strength: 0.05,
            ..params(ErosionKind::Rain)
        };
        let status = ErosionSimulator::default()
            .erode(&mut f, &p, &mut TerrainRng::seeded(1), &Progress::new())
            .unwrap();
        assert!(status.is_completed());
        assert_relative_eq!(total(&f), 81.0 - 20.0 * 0.05, epsilon = 1e-4);
    }

    #[test]
    fn test_thermal_conserves_material() {
        let mut f = field(7);
        f.set_height(3, 3, 1.0);
        f.set_height(1, 5, 0.6);
        let before = total(&f);
        let p = ErosionParameters {
            strength: 0.05,
            amount: 0.1,
            ..params(ErosionKind::Thermal)
        };
        ErosionSimulator::default()
            .erode(&mut f, &p, &mut TerrainRng::seeded(0), &Progress::new())
            .unwrap();

        assert_relative_eq!(total(&f), before, epsilon = 1e-5);
        assert!(f.get_height(3, 3) < 1.0);
        assert!(f.get_height(4, 3) > 0.0);
    }

    #[test]
    fn test_tidal_snaps_shoreline_to_water() {
        let mut f = field(5);
        f.fill(0.5);
        f.set_height(0, 0, 0.0);
        let p = ErosionParameters {
            water_height: 0.2,
            ..params(ErosionKind::Tidal)
        };
        ErosionSimulator::default()
            .erode(&mut f, &p, &mut TerrainRng::seeded(0), &Progress::new())
            .unwrap();

        assert_eq!(f.get_height(0, 0), 0.2);
        // 第一个高于水位的邻居随之被压平
        assert_eq!(f.get_height(1, 0), 0.2);
        assert_eq!(f.get_height(4, 4), 0.5);
    }

    #[test]
    fn test_post_smoothing_runs() {
        let mut f = field(5);
        f.set_height(2, 2, 9.0);
        let p = ErosionParameters {
            iterations: 0,
            post_smooth_iterations: 1,
            ..Default::default()
        };
        ErosionSimulator::default()
            .erode(&mut f, &p, &mut TerrainRng::seeded(0), &Progress::new())
            .unwrap();
        assert_relative_eq!(f.get_height(2, 2), 1.0);
    }

    #[test]
    fn test_cancel_stops_before_work() {
        let mut f = field(5);
        f.fill(1.0);
        let progress = Progress::new();
        progress.cancel();
        let status = ErosionSimulator::default()
            .erode(&mut f, &ErosionParameters::default(), &mut TerrainRng::seeded(0), &progress)
            .unwrap();
        assert_eq!(status, RunStatus::Cancelled);
        assert!(f.heights().iter().all(|&h| h == 1.0));
    }

    #[test]
    fn test_non_finite_parameter_rejected() {
        let mut f = field(5);
        let p = ErosionParameters {
            strength: f32::NAN,
            ..Default::default()
        };
        let result = ErosionSimulator::default().erode(&mut f, &p, &mut TerrainRng::seeded(0), &Progress::new());
        assert!(matches!(result, Err(TerrainError::InvalidParameter { name: "strength", .. })));
    }
}
