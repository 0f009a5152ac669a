// 地形生成模块

pub mod detail;
pub mod displacement;
pub mod erosion;
pub mod error;
pub mod grid;
pub mod heightmap;
pub mod noise;
pub mod preset;
pub mod progress;
pub mod random;
pub mod smooth;
pub mod splat;
pub mod texture;
pub mod vegetation;
pub mod voronoi;
pub mod water;

pub use detail::{DetailPlacer, DetailSettings, DetailSpec};
pub use displacement::{DisplacementGenerator, DisplacementParameters};
pub use erosion::{ErosionKind, ErosionParameters, ErosionSimulator, CANYON_STACK_LIMIT};
pub use error::{Result, TerrainError};
pub use grid::*;
pub use heightmap::*;
pub use noise::{map_range, NoiseParameters, NoiseSynthesizer};
pub use preset::PresetList;
pub use progress::{Progress, RunStatus};
pub use random::TerrainRng;
pub use smooth::smooth;
pub use splat::{normalize_weights, SplatClassifier, SplatLayer};
pub use texture::{generate_texture, NoiseTexture, TextureSettings};
pub use vegetation::*;
pub use voronoi::{BlendMode, Peak, VoronoiGenerator, VoronoiParameters};
pub use water::*;
