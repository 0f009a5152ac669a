use noise::{NoiseFn, Perlin};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::Heightfield;

/// One layer of fractal noise applied to the heightfield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    /// Input scale along x (smaller = broader features)
    /// Typical range: 0.001 - 0.1
    pub x_scale: f32,

    /// Input scale along y
    pub y_scale: f32,

    /// Translation of the sample window, used as a cheap seed
    pub offset_x: f32,
    pub offset_y: f32,

    /// Number of noise layers to combine, must be at least 1
    pub octaves: u32,

    /// Amplitude multiplier between octaves
    pub persistence: f32,

    /// Frequency multiplier between octaves
    /// Typical range: 1.5 - 3.0
    pub frequency_multiplier: f32,

    /// Scale of the contribution added to each cell
    pub height_scale: f32,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            x_scale: 0.01,
            y_scale: 0.01,
            offset_x: 0.0,
            offset_y: 0.0,
            octaves: 3,
            persistence: 8.0,
            frequency_multiplier: 2.0,
            height_scale: 0.09,
        }
    }
}

impl NoiseParameters {
    /// Defaults used for entries of a multi-noise preset list
    pub fn layer() -> Self {
        Self {
            persistence: 0.3,
            height_scale: 0.3,
            ..Default::default()
        }
    }

    /// Broad rolling hills
    pub fn smooth() -> Self {
        Self {
            x_scale: 0.005,
            y_scale: 0.005,
            octaves: 3,
            persistence: 0.6,
            height_scale: 0.4,
            ..Default::default()
        }
    }

    /// Fine surface roughness
    pub fn rough() -> Self {
        Self {
            x_scale: 0.05,
            y_scale: 0.05,
            octaves: 8,
            persistence: 0.4,
            frequency_multiplier: 2.5,
            height_scale: 0.05,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(TerrainError::invalid("octaves", "must be at least 1"));
        }
        Ok(())
    }
}

/// Gradient noise with fractal Brownian motion on top
#[derive(Clone)]
pub struct NoiseSynthesizer {
    perlin: Perlin,
}

impl Default for NoiseSynthesizer {
    fn default() -> Self {
        Self::new(0)
    }
}

impl NoiseSynthesizer {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
        }
    }

    /// Single octave of Perlin noise mapped to [0, 1]
    pub fn base_noise(&self, x: f32, y: f32) -> f32 {
        let raw = self.perlin.get([x as f64, y as f64]) as f32;
        ((raw + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Weighted average of `octaves` noise samples.
    ///
    /// Amplitude starts at 1 and is scaled by `persistence` per octave,
    /// frequency starts at 1 and is scaled by `frequency_multiplier`.
    pub fn fbm(
        &self,
        x: f32,
        y: f32,
        octaves: u32,
        persistence: f32,
        frequency_multiplier: f32,
    ) -> Result<f32> {
        if octaves == 0 {
            return Err(TerrainError::invalid("octaves", "must be at least 1"));
        }
        Ok(self.fbm_unchecked(x, y, octaves, persistence, frequency_multiplier))
    }

    fn fbm_unchecked(
        &self,
        x: f32,
        y: f32,
        octaves: u32,
        persistence: f32,
        frequency_multiplier: f32,
    ) -> f32 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut max_value = 0.0;

        for _ in 0..octaves {
            total += self.base_noise(x * frequency, y * frequency) * amplitude;
            max_value += amplitude;
            amplitude *= persistence;
            frequency *= frequency_multiplier;
        }

        total / max_value
    }

    /// Contribution of one preset at a grid cell
    pub fn sample(&self, params: &NoiseParameters, x: usize, y: usize) -> f32 {
        self.fbm_unchecked(
            (x as f32 + params.offset_x) * params.x_scale,
            (y as f32 + params.offset_y) * params.y_scale,
            params.octaves,
            params.persistence,
            params.frequency_multiplier,
        ) * params.height_scale
    }

    /// Adds one noise preset to every cell
    pub fn apply(&self, field: &mut Heightfield, params: &NoiseParameters) -> Result<()> {
        self.apply_many(field, std::slice::from_ref(params))
    }

    /// Adds every preset in order to every cell. Presets only ever add.
    pub fn apply_many(&self, field: &mut Heightfield, presets: &[NoiseParameters]) -> Result<()> {
        for params in presets {
            params.validate()?;
        }
        if presets.is_empty() {
            log::warn!("No noise presets given, heightfield unchanged");
            return Ok(());
        }

        log::debug!(
            "Applying {} noise preset(s) to {}x{} grid",
            presets.len(),
            field.resolution(),
            field.resolution()
        );

        let resolution = field.resolution();
        field
            .heights_mut()
            .par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, h) in row.iter_mut().enumerate() {
                    for params in presets {
                        *h += self.sample(params, x, y);
                    }
                }
            });

        Ok(())
    }
}

/// Linear remap of `value` from one range into another
pub fn map_range(value: f32, from_min: f32, from_max: f32, to_min: f32, to_max: f32) -> f32 {
    (value - from_min) * (to_max - to_min) / (from_max - from_min) + to_min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::grid::TerrainSize;

    fn flat(resolution: usize) -> Heightfield {
        Heightfield::new(resolution, TerrainSize::default()).unwrap()
    }

    #[test]
    fn test_base_noise_output_range() {
        let synth = NoiseSynthesizer::new(42);
        for x in 0..100 {
            for y in 0..100 {
                let v = synth.base_noise(x as f32 * 0.37, y as f32 * 0.21);
                assert!(
                    (0.0..=1.0).contains(&v),
                    "Noise value {} out of range [0, 1] at ({}, {})",
                    v,
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_base_noise_is_continuous() {
        let synth = NoiseSynthesizer::new(3);
        for i in 0..200 {
            let x = i as f32 * 0.5;
            let a = synth.base_noise(x - 1e-3, 0.3);
            let b = synth.base_noise(x + 1e-3, 0.3);
            assert!((a - b).abs() < 0.05, "jump of {} across x = {}", (a - b).abs(), x);
        }
    }

    #[test]
    fn test_single_octave_is_base_noise() {
        let synth = NoiseSynthesizer::new(9);
        for i in 0..50 {
            let x = i as f32 * 0.173;
            let y = i as f32 * 0.311;
            assert_eq!(synth.fbm(x, y, 1, 0.5, 2.0).unwrap(), synth.base_noise(x, y));
        }
    }

    #[test]
    fn test_fbm_is_weighted_average() {
        let synth = NoiseSynthesizer::new(1);
        for i in 0..50 {
            let v = synth.fbm(i as f32 * 0.9, i as f32 * 0.4, 6, 8.0, 2.0).unwrap();
            assert!((0.0..=1.0).contains(&v), "fbm {} left [0, 1]", v);
        }
    }

    #[test]
    fn test_zero_octaves_rejected() {
        let synth = NoiseSynthesizer::default();
        assert!(matches!(
            synth.fbm(0.0, 0.0, 0, 0.5, 2.0),
            Err(TerrainError::InvalidParameter { name: "octaves", .. })
        ));

        let mut field = flat(5);
        let params = NoiseParameters {
            octaves: 0,
            ..Default::default()
        };
        assert!(synth.apply(&mut field, &params).is_err());
        assert!(field.heights().iter().all(|&h| h == 0.0), "grid touched before validation");
    }

    #[test]
    fn test_apply_adds_to_existing_heights() {
        let synth = NoiseSynthesizer::new(5);
        let params = NoiseParameters::default();

        let mut base = flat(9);
        synth.apply(&mut base, &params).unwrap();

        let mut raised = flat(9);
        raised.fill(1.0);
        synth.apply(&mut raised, &params).unwrap();

        for (a, b) in base.heights().iter().zip(raised.heights()) {
            assert!((b - a - 1.0).abs() < 1e-6);
        }
        assert_eq!(base.get_height(3, 4), synth.sample(&params, 3, 4));
    }

    #[test]
    fn test_seed_determinism() {
        let a = NoiseSynthesizer::new(12345);
        let b = NoiseSynthesizer::new(12345);
        for x in 0..50 {
            let (x, y) = (x as f32 * 0.31, x as f32 * 0.17);
            assert_eq!(a.base_noise(x, y), b.base_noise(x, y));
        }
    }

    #[test]
    fn test_map_range() {
        assert_eq!(map_range(0.5, 0.0, 1.0, 0.5, 1.0), 0.75);
        assert_eq!(map_range(10.0, 0.0, 20.0, -1.0, 1.0), 0.0);
    }
}
