// 地形生成入口
//
// TerrainConfig 汇总所有参数，TerrainGenerator 持有高度场、随机数源和进度句柄，
// 每个编辑操作对应一个方法

use serde::{Deserialize, Serialize};

use super::detail::{DetailPlacer, DetailSettings, DetailSpec};
use super::displacement::{DisplacementGenerator, DisplacementParameters};
use super::erosion::{ErosionParameters, ErosionSimulator};
use super::error::{Result, TerrainError};
use super::grid::{AlphaMap, DetailLayer, Heightfield, TerrainSize};
use super::noise::{NoiseParameters, NoiseSynthesizer};
use super::preset::PresetList;
use super::progress::{Progress, RunStatus};
use super::random::TerrainRng;
use super::smooth::smooth;
use super::splat::{SplatClassifier, SplatLayer};
use super::vegetation::{VegetationInstance, VegetationPlacer, VegetationSettings, VegetationSpec};
use super::voronoi::{Peak, VoronoiGenerator, VoronoiParameters};
use super::water::{find_shoreline, water_plane, ShoreSegment, WaterPlane};

/// 地形生成配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// 每边格点数（中点位移要求 2^n + 1）
    pub resolution: usize,
    /// 世界尺寸
    pub size: TerrainSize,
    /// 随机种子，None 时使用系统熵
    pub seed: Option<u64>,
    /// 生成前是否清零（false 时在现有高度上叠加）
    pub reset_terrain: bool,

    /// 随机高度范围
    pub random_height_range: [f32; 2],
    /// 灰度图导入缩放 (x, 高度, z)
    pub heightmap_scale: [f32; 3],

    pub noise: NoiseParameters,
    pub noise_presets: PresetList<NoiseParameters>,
    pub voronoi: VoronoiParameters,
    pub displacement: DisplacementParameters,
    pub smooth_iterations: u32,
    pub erosion: ErosionParameters,

    pub splat_layers: PresetList<SplatLayer>,
    /// Alpha 图尺寸，None 时与高度场一致
    pub alpha_map_size: Option<[usize; 2]>,

    pub vegetation: PresetList<VegetationSpec>,
    pub vegetation_settings: VegetationSettings,

    pub details: PresetList<DetailSpec>,
    pub detail_settings: DetailSettings,

    /// 水位（归一化高度）
    pub water_height: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            resolution: 513,
            size: TerrainSize::default(),
            seed: None,
            reset_terrain: true,
            random_height_range: [0.0, 0.1],
            heightmap_scale: [1.0, 1.0, 1.0],
            noise: NoiseParameters::default(),
            noise_presets: PresetList::new(NoiseParameters::layer()),
            voronoi: VoronoiParameters::default(),
            displacement: DisplacementParameters::default(),
            smooth_iterations: 1,
            erosion: ErosionParameters::default(),
            splat_layers: PresetList::default(),
            alpha_map_size: None,
            vegetation: PresetList::default(),
            vegetation_settings: VegetationSettings::default(),
            details: PresetList::default(),
            detail_settings: DetailSettings::default(),
            water_height: 0.1,
        }
    }
}

impl TerrainConfig {
    /// 从 JSON 读取，缺省字段使用默认值
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(TerrainError::invalid("resolution", "grid must not be empty"));
        }
        // 反序列化可能得到空列表
        if self.noise_presets.is_empty() {
            return Err(TerrainError::EmptyLayerSet("noise preset"));
        }
        if self.splat_layers.is_empty() {
            return Err(TerrainError::EmptyLayerSet("splat layer"));
        }
        if self.vegetation.is_empty() {
            return Err(TerrainError::EmptyLayerSet("vegetation spec"));
        }
        if self.details.is_empty() {
            return Err(TerrainError::EmptyLayerSet("detail spec"));
        }
        Ok(())
    }
}

/// 灰度图采样接口，图片解码由调用方完成
pub trait GrayscaleSampler {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// 灰度值 [0, 1]，坐标超出范围时夹取到边缘
    fn sample(&self, x: usize, y: usize) -> f32;
}

/// 内存中的灰度图
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleImage {
    width: usize,
    height: usize,
    pixels: Vec<f32>,
}

impl GrayscaleImage {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(TerrainError::invalid(
                "image",
                format!("{} pixels do not form a {width}x{height} image", pixels.len()),
            ));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 8 位灰度数据
    pub fn from_luma8(width: usize, height: usize, bytes: &[u8]) -> Result<Self> {
        Self::new(width, height, bytes.iter().map(|&b| b as f32 / 255.0).collect())
    }
}

impl GrayscaleSampler for GrayscaleImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn sample(&self, x: usize, y: usize) -> f32 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[y * self.width + x]
    }
}

/// 地形生成器
pub struct TerrainGenerator {
    config: TerrainConfig,
    field: Heightfield,
    rng: TerrainRng,
    noise: NoiseSynthesizer,
    progress: Progress,
}

impl TerrainGenerator {
    pub fn new(config: TerrainConfig) -> Result<Self> {
        config.validate()?;
        let field = Heightfield::new(config.resolution, config.size)?;
        let (rng, noise) = match config.seed {
            Some(seed) => (TerrainRng::seeded(seed), NoiseSynthesizer::new(seed as u32)),
            None => (TerrainRng::random(), NoiseSynthesizer::default()),
        };
        log::debug!(
            "Terrain generator: {}x{} grid, seed {:?}",
            config.resolution,
            config.resolution,
            config.seed
        );
        Ok(Self {
            config,
            field,
            rng,
            noise,
            progress: Progress::new(),
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TerrainConfig {
        &mut self.config
    }

    pub fn field(&self) -> &Heightfield {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut Heightfield {
        &mut self.field
    }

    pub fn into_field(self) -> Heightfield {
        self.field
    }

    /// 进度句柄，可交给其他线程轮询或取消。
    ///
    /// 取消后所有可取消的操作都立即返回 `Cancelled`，直到调用
    /// [`Progress::clear_cancel`]。
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    // 进度归零；已取消时不做任何修改
    fn start(&self, stage: &str) -> Option<RunStatus> {
        self.progress.reset();
        self.progress.check(stage)
    }

    // reset_terrain 为 true 时从平地开始
    fn begin(&mut self) {
        self.progress.reset();
        if self.config.reset_terrain {
            self.field.reset();
        }
    }

    pub fn reset(&mut self) {
        self.field.reset();
    }

    /// 每格叠加 random_height_range 内的随机高度
    pub fn random_terrain(&mut self) {
        self.begin();
        let [min, max] = self.config.random_height_range;
        let r = self.field.resolution() as i64;
        for x in 0..r {
            for y in 0..r {
                let delta = self.rng.uniform(min, max);
                self.field.add_height(x, y, delta);
            }
        }
    }

    /// 叠加灰度图，按 heightmap_scale 缩放采样坐标和高度
    pub fn load_heightmap(&mut self, image: &dyn GrayscaleSampler) {
        self.begin();
        let [sx, sy, sz] = self.config.heightmap_scale;
        let r = self.field.resolution();
        log::debug!(
            "Importing {}x{} heightmap into {r}x{r} grid",
            image.width(),
            image.height()
        );
        for y in 0..r {
            for x in 0..r {
                let px = (x as f32 * sx).max(0.0) as usize;
                let py = (y as f32 * sz).max(0.0) as usize;
                let value = image.sample(px, py) * sy;
                self.field.add_height(x as i64, y as i64, value);
            }
        }
    }

    pub fn perlin(&mut self) -> Result<()> {
        self.config.noise.validate()?;
        self.begin();
        self.noise.apply(&mut self.field, &self.config.noise)
    }

    pub fn multiple_perlin(&mut self) -> Result<()> {
        for params in self.config.noise_presets.iter() {
            params.validate()?;
        }
        self.begin();
        self.noise.apply_many(&mut self.field, &self.config.noise_presets)
    }

    /// 返回实际放置的山峰
    pub fn voronoi(&mut self) -> Result<Vec<Peak>> {
        self.config.voronoi.validate()?;
        self.begin();
        VoronoiGenerator::apply(&mut self.field, &self.config.voronoi, &mut self.rng)
    }

    pub fn midpoint_displacement(&mut self) -> Result<()> {
        DisplacementGenerator::validate(self.field.resolution(), &self.config.displacement)?;
        self.begin();
        DisplacementGenerator::apply(&mut self.field, &self.config.displacement, &mut self.rng)
    }

    pub fn smooth(&mut self) -> RunStatus {
        if let Some(status) = self.start("smooth") {
            return status;
        }
        smooth(&mut self.field, self.config.smooth_iterations, &self.progress)
    }

    /// 侵蚀直接修改当前高度场，失败时不回滚。
    /// 潮汐侵蚀使用配置中统一的 water_height。
    pub fn erode(&mut self) -> Result<RunStatus> {
        if let Some(status) = self.start("erosion") {
            return Ok(status);
        }
        let params = ErosionParameters {
            water_height: self.config.water_height,
            ..self.config.erosion.clone()
        };
        ErosionSimulator::new(self.noise.clone()).erode(
            &mut self.field,
            &params,
            &mut self.rng,
            &self.progress,
        )
    }

    pub fn splat_maps(&self) -> Result<(AlphaMap, RunStatus)> {
        let r = self.field.resolution();
        let [w, h] = self.config.alpha_map_size.unwrap_or([r, r]);
        if let Some(status) = self.start("splat") {
            return Ok((AlphaMap::new(w, h, self.config.splat_layers.len()), status));
        }
        SplatClassifier::new(self.noise.clone()).classify_at(
            &self.field,
            &self.config.splat_layers,
            w,
            h,
            &self.progress,
        )
    }

    pub fn plant_vegetation(&mut self) -> Result<(Vec<VegetationInstance>, RunStatus)> {
        if let Some(status) = self.start("vegetation") {
            return Ok((Vec::new(), status));
        }
        VegetationPlacer::plant(
            &self.field,
            &self.config.vegetation,
            &self.config.vegetation_settings,
            &mut self.rng,
            &self.progress,
        )
    }

    pub fn apply_details(&mut self) -> Result<(Vec<DetailLayer>, RunStatus)> {
        if let Some(status) = self.start("detail") {
            return Ok((Vec::new(), status));
        }
        DetailPlacer::new(self.noise.clone()).apply(
            &self.field,
            &self.config.details,
            &self.config.detail_settings,
            &mut self.rng,
            &self.progress,
        )
    }

    pub fn water_plane(&self) -> WaterPlane {
        water_plane(self.field.size(), self.config.water_height)
    }

    pub fn shoreline(&self) -> Vec<ShoreSegment> {
        find_shoreline(&self.field, self.config.water_height)
    }
}
