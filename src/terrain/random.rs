// 可复现的随机数源
//
// 所有随机算法共用同一个 ChaCha8 流，相同种子得到相同地形

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 地形随机数源
#[derive(Debug, Clone)]
pub struct TerrainRng {
    rng: ChaCha8Rng,
}

impl TerrainRng {
    /// 使用固定种子创建（可复现）
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// 使用系统熵创建（不可复现）
    pub fn random() -> Self {
        Self::seeded(rand::random())
    }

    /// 闭区间浮点数 [min, max]，两端顺序可颠倒
    pub fn uniform(&mut self, min: f32, max: f32) -> f32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        if lo == hi || !(hi - lo).is_finite() {
            return lo;
        }
        self.rng.random_range(lo..=hi)
    }

    /// 半开区间整数 [min, max)，空区间返回 min
    pub fn range_int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..max)
    }

    /// 以概率 p 返回 true
    pub fn chance(&mut self, p: f32) -> bool {
        self.uniform(0.0, 1.0) <= p
    }

    /// 原地打乱
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }
}
