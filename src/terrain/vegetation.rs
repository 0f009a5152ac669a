//! Tree placement.
//!
//! The world footprint is scanned on a regular spacing; at each stop every
//! species gets a density roll and a jittered sample point, and is planted
//! when the point's slope and height fall inside its bands. Planting stops
//! once the global instance cap is reached.

use serde::{Deserialize, Serialize};

use super::error::{Result, TerrainError};
use super::grid::Heightfield;
use super::progress::{Progress, RunStatus};
use super::random::TerrainRng;

/// RGBA color, each component in [0.0, 1.0]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Color = Color([1.0, 1.0, 1.0, 1.0]);

    /// Component-wise interpolation, `t` clamped to [0, 1]
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mut out = [0.0; 4];
        for (i, c) in out.iter_mut().enumerate() {
            *c = self.0[i] + (other.0[i] - self.0[i]) * t;
        }
        Color(out)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// One tree species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationSpec {
    /// Chance of trying this species at a scan stop, [0, 1]
    pub density: f32,
    /// Normalized height band
    pub min_height: f32,
    pub max_height: f32,
    /// Slope band in degrees
    pub min_slope: f32,
    pub max_slope: f32,
    pub min_height_scale: f32,
    pub max_height_scale: f32,
    pub min_width_scale: f32,
    pub max_width_scale: f32,
    pub tint1: Color,
    pub tint2: Color,
    pub light_color: Color,
}

impl Default for VegetationSpec {
    fn default() -> Self {
        Self {
            density: 1.0,
            min_height: 0.1,
            max_height: 0.2,
            min_slope: 0.0,
            max_slope: 90.0,
            min_height_scale: 0.8,
            max_height_scale: 1.1,
            min_width_scale: 0.8,
            max_width_scale: 1.1,
            tint1: Color::WHITE,
            tint2: Color::WHITE,
            light_color: Color::WHITE,
        }
    }
}

/// Order in which species are tried at each scan stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlacementPolicy {
    /// Always in list order. Under the cap, earlier species crowd out later ones.
    #[default]
    SpeciesOrder,
    /// The first species tried rotates by one at every scan stop.
    RoundRobin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationSettings {
    pub max_trees: usize,
    /// Scan step and jitter radius in world units
    pub tree_spacing: u32,
    pub policy: PlacementPolicy,
}

impl Default for VegetationSettings {
    fn default() -> Self {
        Self {
            max_trees: 5000,
            tree_spacing: 5,
            policy: PlacementPolicy::SpeciesOrder,
        }
    }
}

/// A planted tree. `position` is normalized: (x / width, height, z / length).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationInstance {
    pub position: [f32; 3],
    pub species: usize,
    pub color: Color,
    pub light_color: Color,
    pub height_scale: f32,
    pub width_scale: f32,
}

pub struct VegetationPlacer;

impl VegetationPlacer {
    pub fn plant(
        field: &Heightfield,
        specs: &[VegetationSpec],
        settings: &VegetationSettings,
        rng: &mut TerrainRng,
        progress: &Progress,
    ) -> Result<(Vec<VegetationInstance>, RunStatus)> {
        if specs.is_empty() {
            return Err(TerrainError::EmptyLayerSet("vegetation spec"));
        }
        if settings.tree_spacing == 0 {
            return Err(TerrainError::invalid("tree_spacing", "must be at least 1"));
        }
        let spacing = i32::try_from(settings.tree_spacing).map_err(|_| {
            TerrainError::invalid("tree_spacing", format!("must be at most {}", i32::MAX))
        })?;

        let size = field.size();
        let rows = (size.length / spacing as f32).ceil() as usize;
        log::debug!(
            "Vegetation: {} species, spacing {spacing}, cap {}, {:?}",
            specs.len(),
            settings.max_trees,
            settings.policy
        );

        let mut instances = Vec::new();
        let mut stop = 0usize;

        'scan: for (row, z) in (0..)
            .map_while(|i: i32| i.checked_mul(spacing))
            .take_while(|&z| (z as f32) < size.length)
            .enumerate()
        {
            if let Some(status) = progress.check("vegetation") {
                return Ok((instances, status));
            }

            for x in (0..)
                .map_while(|i: i32| i.checked_mul(spacing))
                .take_while(|&x| (x as f32) < size.width)
            {
                let first = match settings.policy {
                    PlacementPolicy::SpeciesOrder => 0,
                    PlacementPolicy::RoundRobin => stop % specs.len(),
                };
                stop += 1;

                for k in 0..specs.len() {
                    if instances.len() >= settings.max_trees {
                        break 'scan;
                    }
                    let species = (first + k) % specs.len();
                    let spec = &specs[species];

                    if rng.uniform(0.0, 1.0) > spec.density {
                        continue;
                    }
                    let jx = x.saturating_add(rng.range_int(-spacing, spacing)) as f32;
                    let jz = z.saturating_add(rng.range_int(-spacing, spacing)) as f32;
                    let u = jx.clamp(0.0, size.width) / size.width;
                    let v = jz.clamp(0.0, size.length) / size.length;

                    let steepness = field.get_steepness(u, v);
                    if steepness < spec.min_slope || steepness > spec.max_slope {
                        continue;
                    }
                    let height = field.get_interpolated_height(u, v) / size.height;
                    if height < spec.min_height || height > spec.max_height {
                        continue;
                    }

                    instances.push(VegetationInstance {
                        position: [u, height, v],
                        species,
                        color: spec.tint1.lerp(spec.tint2, rng.uniform(0.0, 1.0)),
                        light_color: spec.light_color,
                        height_scale: rng.uniform(spec.min_height_scale, spec.max_height_scale),
                        width_scale: rng.uniform(spec.min_width_scale, spec.max_width_scale),
                    });
                }
            }
            progress.report("vegetation", row + 1, rows);
        }

        log::info!("Vegetation: planted {} instance(s)", instances.len());
        Ok((instances, RunStatus::Completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::grid::TerrainSize;

    fn meadow(height: f32) -> Heightfield {
        let mut f = Heightfield::new(17, TerrainSize::new(100.0, 50.0, 100.0)).unwrap();
        f.fill(height);
        f
    }

    fn settings(max_trees: usize, policy: PlacementPolicy) -> VegetationSettings {
        VegetationSettings {
            max_trees,
            tree_spacing: 10,
            policy,
        }
    }

    #[test]
    fn test_color_lerp() {
        let black = Color([0.0, 0.0, 0.0, 1.0]);
        assert_eq!(black.lerp(Color::WHITE, 0.5), Color([0.5, 0.5, 0.5, 1.0]));
        assert_eq!(black.lerp(Color::WHITE, 2.0), Color::WHITE);
    }

    #[test]
    fn test_empty_species_list_rejected() {
        let result = VegetationPlacer::plant(
            &meadow(0.15),
            &[],
            &VegetationSettings::default(),
            &mut TerrainRng::seeded(0),
            &Progress::new(),
        );
        assert!(matches!(result, Err(TerrainError::EmptyLayerSet(_))));
    }

    #[test]
    fn test_spacing_beyond_i32_rejected() {
        let plant = |tree_spacing: u32| {
            VegetationPlacer::plant(
                &meadow(0.15),
                &[VegetationSpec::default()],
                &VegetationSettings {
                    tree_spacing,
                    ..settings(100, PlacementPolicy::SpeciesOrder)
                },
                &mut TerrainRng::seeded(0),
                &Progress::new(),
            )
        };
        assert!(matches!(
            plant(u32::MAX),
            Err(TerrainError::InvalidParameter { name: "tree_spacing", .. })
        ));
        // 最大间距只扫描原点一个位置
        let (trees, status) = plant(i32::MAX as u32).unwrap();
        assert!(status.is_completed());
        assert!(trees.len() <= 1);
    }

    #[test]
    fn test_instances_respect_bands() {
        let mut f = meadow(0.0);
        for y in 0..17 {
            for x in 0..17 {
                f.set_height(x, y, x as f32 / 16.0 * 0.4);
            }
        }
        let spec = VegetationSpec {
            min_height: 0.1,
            max_height: 0.2,
            ..Default::default()
        };
        let (trees, status) = VegetationPlacer::plant(
            &f,
            &[spec.clone()],
            &settings(5000, PlacementPolicy::SpeciesOrder),
            &mut TerrainRng::seeded(5),
            &Progress::new(),
        )
        .unwrap();

        assert!(status.is_completed());
        assert!(!trees.is_empty());
        for t in &trees {
            let h = t.position[1];
            assert!(h >= spec.min_height && h <= spec.max_height, "tree at height {}", h);
            assert!((0.0..=1.0).contains(&t.position[0]) && (0.0..=1.0).contains(&t.position[2]));
            assert!(t.height_scale >= 0.8 && t.height_scale <= 1.1);
        }
    }

    #[test]
    fn test_cap_is_global_and_species_order_starves_later_species() {
        let specs = [VegetationSpec::default(), VegetationSpec::default()];
        let (trees, _) = VegetationPlacer::plant(
            &meadow(0.15),
            &specs,
            &settings(7, PlacementPolicy::SpeciesOrder),
            &mut TerrainRng::seeded(1),
            &Progress::new(),
        )
        .unwrap();
        assert_eq!(trees.len(), 7);
        // 两个物种在每个扫描点都会成功，顺序固定为 0, 1, 0, 1, ...
        assert_eq!(trees[0].species, 0);
        assert_eq!(trees[1].species, 1);
    }

    #[test]
    fn test_round_robin_rotates_first_species() {
        let specs = [
            VegetationSpec::default(),
            VegetationSpec::default(),
            VegetationSpec::default(),
        ];
        let (trees, _) = VegetationPlacer::plant(
            &meadow(0.15),
            &specs,
            &settings(9, PlacementPolicy::RoundRobin),
            &mut TerrainRng::seeded(1),
            &Progress::new(),
        )
        .unwrap();
        // 平地上每次尝试都成功，每个扫描点的起始物种依次后移
        let order: Vec<usize> = trees.iter().map(|t| t.species).collect();
        assert_eq!(order, vec![0, 1, 2, 1, 2, 0, 2, 0, 1]);
    }

    #[test]
    fn test_zero_density_plants_nothing() {
        let spec = VegetationSpec {
            density: 0.0,
            ..Default::default()
        };
        let (trees, _) = VegetationPlacer::plant(
            &meadow(0.15),
            &[spec],
            &settings(5000, PlacementPolicy::SpeciesOrder),
            &mut TerrainRng::seeded(3),
            &Progress::new(),
        )
        .unwrap();
        assert!(trees.is_empty());
    }
}
