//! Procedural grayscale noise textures.
//!
//! Produces RGBA pixels in memory; encoding and saving are left to the caller.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::noise::{map_range, NoiseParameters, NoiseSynthesizer};
use super::vegetation::Color;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    /// Width and height in pixels
    pub size: usize,
    pub noise: NoiseParameters,
    pub brightness: f32,
    pub contrast: f32,
    /// Write the gray value into alpha as well
    pub alpha: bool,
    /// Blend four offset samples so opposite edges line up
    pub seamless: bool,
    /// Stretch the value range to [0, 1] after generation
    pub normalize: bool,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            size: 513,
            noise: NoiseParameters {
                persistence: 8.0,
                height_scale: 1.0,
                ..Default::default()
            },
            brightness: 0.5,
            contrast: 0.5,
            alpha: false,
            seamless: false,
            normalize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTexture {
    pub size: usize,
    pub pixels: Vec<Color>,
}

impl NoiseTexture {
    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        (x < self.size && y < self.size).then(|| self.pixels[y * self.size + x])
    }
}

pub fn generate_texture(noise: &NoiseSynthesizer, settings: &TextureSettings) -> Result<NoiseTexture> {
    settings.noise.validate()?;
    let size = settings.size;
    log::debug!("Generating {size}x{size} noise texture, seamless: {}", settings.seamless);

    let shifted = |dx: usize, dy: usize| NoiseParameters {
        offset_x: settings.noise.offset_x + dx as f32,
        offset_y: settings.noise.offset_y + dy as f32,
        ..settings.noise.clone()
    };
    let corners = [shifted(0, 0), shifted(0, size), shifted(size, 0), shifted(size, size)];

    let mut values = vec![0.0f32; size * size];
    values
        .par_chunks_mut(size.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let value = if settings.seamless {
                    let u = x as f32 / size as f32;
                    let v = y as f32 / size as f32;
                    let [n00, n01, n10, n11] = corners.each_ref().map(|p| noise.sample(p, x, y));
                    u * v * n00 + u * (1.0 - v) * n01 + (1.0 - u) * v * n10 + (1.0 - u) * (1.0 - v) * n11
                } else {
                    noise.sample(&settings.noise, x, y)
                };
                *out = settings.contrast * (value - 0.5) + 0.5 * settings.brightness;
            }
        });

    if settings.normalize {
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if max > min {
            for v in &mut values {
                *v = map_range(*v, min, max, 0.0, 1.0);
            }
        }
    }

    let pixels = values
        .into_iter()
        .map(|v| Color([v, v, v, if settings.alpha { v } else { 1.0 }]))
        .collect();
    Ok(NoiseTexture { size, pixels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(size: usize) -> TextureSettings {
        TextureSettings {
            size,
            ..Default::default()
        }
    }

    #[test]
    fn test_texture_is_gray() {
        let tex = generate_texture(&NoiseSynthesizer::new(1), &settings(32)).unwrap();
        assert_eq!(tex.pixels.len(), 32 * 32);
        for p in &tex.pixels {
            assert_eq!(p.0[0], p.0[1]);
            assert_eq!(p.0[1], p.0[2]);
            assert_eq!(p.0[3], 1.0);
        }
        assert!(tex.pixel(32, 0).is_none());
    }

    #[test]
    fn test_normalize_spans_unit_range() {
        let s = TextureSettings {
            normalize: true,
            alpha: true,
            seamless: true,
            ..settings(48)
        };
        let tex = generate_texture(&NoiseSynthesizer::new(4), &s).unwrap();
        let values: Vec<f32> = tex.pixels.iter().map(|p| p.0[0]).collect();
        let min = values.iter().copied().fold(f32::INFINITY, f32::min);
        let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(min.abs() < 1e-6 && (max - 1.0).abs() < 1e-6, "range {}..{}", min, max);
        assert!(tex.pixels.iter().all(|p| p.0[3] == p.0[0]));
    }

    #[test]
    fn test_brightness_and_contrast() {
        // 对比度为 0 时整张图只剩亮度的一半
        let s = TextureSettings {
            contrast: 0.0,
            brightness: 1.2,
            ..settings(8)
        };
        let tex = generate_texture(&NoiseSynthesizer::default(), &s).unwrap();
        assert!(tex.pixels.iter().all(|p| (p.0[0] - 0.6).abs() < 1e-6));
    }
}
