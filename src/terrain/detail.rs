use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::{DetailLayer, Heightfield};
use super::noise::{map_range, NoiseSynthesizer};
use super::progress::{Progress, RunStatus};
use super::random::TerrainRng;

/// One ground-cover species (grass, rocks, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSpec {
    pub density: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub min_slope: f32,
    pub max_slope: f32,
    /// Widens the height band on both sides
    pub overlap: f32,
    /// Input scale of the noise that breaks up band edges
    pub feather: f32,
}

impl Default for DetailSpec {
    fn default() -> Self {
        Self {
            density: 0.5,
            min_height: 0.1,
            max_height: 0.2,
            min_slope: 0.0,
            max_slope: 15.0,
            overlap: 0.1,
            feather: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailSettings {
    /// Output mask size, independent of the heightfield resolution
    pub width: usize,
    pub height: usize,
    pub spacing: u32,
}

impl Default for DetailSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            spacing: 5,
        }
    }
}

#[derive(Clone, Default)]
pub struct DetailPlacer {
    noise: NoiseSynthesizer,
}

impl DetailPlacer {
    pub fn new(noise: NoiseSynthesizer) -> Self {
        Self { noise }
    }

    /// Builds one occupancy mask per spec, in spec order.
    ///
    /// On cancellation the masks built so far are returned, the last one
    /// possibly incomplete.
    pub fn apply(
        &self,
        field: &Heightfield,
        specs: &[DetailSpec],
        settings: &DetailSettings,
        rng: &mut TerrainRng,
        progress: &Progress,
    ) -> Result<(Vec<DetailLayer>, RunStatus)> {
        if specs.is_empty() {
            return Err(TerrainError::EmptyLayerSet("detail spec"));
        }
        if settings.spacing == 0 {
            return Err(TerrainError::invalid("detail spacing", "must be at least 1"));
        }
        if settings.width == 0 || settings.height == 0 {
            return Err(TerrainError::invalid(
                "detail size",
                format!("{}x{} has no cells", settings.width, settings.height),
            ));
        }

        let (width, height) = (settings.width, settings.height);
        let spacing = settings.spacing as usize;
        let resolution = field.resolution() as f32;
        let size = field.size();
        log::debug!("Detail: {} spec(s) onto {width}x{height} masks", specs.len());

        let mut layers = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            let mut mask = DetailLayer::new(width, height);

            for y in (0..height).step_by(spacing) {
                if let Some(status) = progress.check("detail") {
                    layers.push(mask);
                    return Ok((layers, status));
                }
                for x in (0..width).step_by(spacing) {
                    if rng.uniform(0.0, 1.0) > spec.density {
                        continue;
                    }
                    let fx = x as f32 / width as f32;
                    let fy = y as f32 / height as f32;

                    let n = map_range(
                        self.noise.base_noise(x as f32 * spec.feather, y as f32 * spec.feather),
                        0.0,
                        1.0,
                        0.5,
                        1.0,
                    );
                    let low = spec.min_height * n - spec.overlap * n;
                    let high = spec.max_height * n + spec.overlap * n;

                    let cell_height = field.get_height((fx * resolution) as i64, (fy * resolution) as i64);
                    let world_x = (fx * size.width).trunc();
                    let world_z = (fy * size.length).trunc();
                    let steepness =
                        field.get_steepness((world_x + n) / size.width, (world_z + n) / size.length);

                    if (low..=high).contains(&cell_height)
                        && (spec.min_slope..=spec.max_slope).contains(&steepness)
                    {
                        mask.mark(x, y);
                    }
                }
            }

            log::trace!("Detail spec {i}: {} cell(s) occupied", mask.occupied());
            layers.push(mask);
            progress.report("detail", i + 1, specs.len());
        }

        Ok((layers, RunStatus::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::grid::TerrainSize;

    fn flat(height: f32) -> Heightfield {
        let mut f = Heightfield::new(33, TerrainSize::default()).unwrap();
        f.fill(height);
        f
    }

    fn settings(spacing: u32) -> DetailSettings {
        DetailSettings {
            width: 64,
            height: 48,
            spacing,
        }
    }

    #[test]
    fn test_mask_size_follows_settings() {
        let spec = DetailSpec {
            density: 1.0,
            ..Default::default()
        };
        let (layers, status) = DetailPlacer::default()
            .apply(&flat(0.12), &[spec.clone(), spec], &settings(1), &mut TerrainRng::seeded(0), &Progress::new())
            .unwrap();
        assert!(status.is_completed());
        assert_eq!(layers.len(), 2);
        assert_eq!((layers[0].width, layers[0].height), (64, 48));
        // 0.12 在任何噪声下都落在 [0.1n - 0.1n, 0.2n + 0.1n] 内
        assert_eq!(layers[0].occupied(), 64 * 48);
    }

    #[test]
    fn test_spacing_skips_cells() {
        let spec = DetailSpec {
            density: 1.0,
            ..Default::default()
        };
        let (layers, _) = DetailPlacer::default()
            .apply(&flat(0.12), &[spec], &settings(4), &mut TerrainRng::seeded(0), &Progress::new())
            .unwrap();
        assert_eq!(layers[0].occupied(), 16 * 12);
        assert!(layers[0].get(4, 8).unwrap());
        assert!(!layers[0].get(1, 0).unwrap());
    }

    #[test]
    fn test_height_band_excludes() {
        let spec = DetailSpec {
            density: 1.0,
            min_height: 0.6,
            max_height: 0.9,
            overlap: 0.0,
            ..Default::default()
        };
        let (layers, _) = DetailPlacer::default()
            .apply(&flat(0.1), &[spec], &settings(1), &mut TerrainRng::seeded(0), &Progress::new())
            .unwrap();
        assert_eq!(layers[0].occupied(), 0);
    }

    #[test]
    fn test_empty_specs_and_zero_spacing_rejected() {
        let placer = DetailPlacer::default();
        let f = flat(0.1);
        let mut rng = TerrainRng::seeded(0);
        assert!(matches!(
            placer.apply(&f, &[], &settings(1), &mut rng, &Progress::new()),
            Err(TerrainError::EmptyLayerSet(_))
        ));
        assert!(matches!(
            placer.apply(&f, &[DetailSpec::default()], &settings(0), &mut rng, &Progress::new()),
            Err(TerrainError::InvalidParameter { .. })
        ));
    }
}
