// 生成器配置
//
// 可从 JSON 文件加载，缺省字段使用默认值。agent 自身的参数不在这里，
// 它们随脚本一起保存。

use crate::error::GeneratorError;
use crate::terrain::{NoiseConfig, DEFAULT_SMOOTH_WEIGHT};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// 网格边长
    pub size: usize,
    /// 调度器随机种子
    pub seed: u64,
    /// 平坦初始网格的高度
    pub initial_height: f32,
    /// 设置时用噪声生成初始网格
    pub noise: Option<NoiseConfig>,
    /// 噪声初始网格的振幅
    pub noise_amplitude: f32,
    /// 全局平滑时邻居平均值的权重
    pub smooth_weight: f32,
    /// 计算法线时高度的缩放
    pub height_scale: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            size: 128,
            seed: 42,
            initial_height: 0.0,
            noise: None,
            noise_amplitude: 10.0,
            smooth_weight: DEFAULT_SMOOTH_WEIGHT,
            height_scale: 1.0,
        }
    }
}

impl GeneratorConfig {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// 用大尺度平滑噪声作为初始起伏
    pub fn with_relief(mut self, seed: u32) -> Self {
        self.noise = Some(NoiseConfig::smooth(seed));
        self
    }

    /// 从 JSON 文件读取配置
    pub fn load(path: &Path) -> Result<Self, GeneratorError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GeneratorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, GeneratorError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| GeneratorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.size == 0 {
            return Err(GeneratorError::Config("size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.smooth_weight) {
            return Err(GeneratorError::Config(format!(
                "smooth_weight must be within [0, 1], got {}",
                self.smooth_weight
            )));
        }
        Ok(())
    }
}
