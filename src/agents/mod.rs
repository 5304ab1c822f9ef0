//! 地形 agent
//!
//! 每个 agent 是一个自治的地形修改单元：模板从脚本加载，生成器克隆模板得到
//! 运行实例，实例每个 tick 执行一步，直到 `is_dead()` 为真。

mod beach;
mod coastline;
mod mountain;
mod properties;
mod river;
mod smooth;

pub use beach::BeachAgent;
pub use coastline::CoastLineAgent;
pub use mountain::MountainAgent;
pub use properties::Properties;
pub use river::RiverAgent;
pub use smooth::SmoothAgent;

use crate::error::ScriptError;
use crate::script;
use crate::terrain::HeightMap;
use rand::{Rng, SeedableRng};
use std::fmt;

/// 每个模板在一个阶段中最多实例化的数量
pub const MAX_COUNT: usize = 1024;

/// agent 使用的确定性随机数生成器
pub type AgentRng = rand_chacha::ChaCha8Rng;

/// 从父 rng 派生一个独立的 rng
pub fn derive_rng(rng: &mut impl Rng) -> AgentRng {
    AgentRng::seed_from_u64(rng.random())
}

/// Agent 契约
///
/// - `spawn` 在克隆后、第一次 `run` 前调用一次
/// - `run` 推进一步，可以修改网格；在正常参数下最终必须让 `is_dead()` 为真
/// - `is_dead` 无副作用，一旦为真就保持为真
/// - `copy` 返回只带参数、不带运行状态的新实例
pub trait Agent: fmt::Debug {
    /// 序列化时使用的类型标签
    fn type_name(&self) -> &'static str;

    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;

    /// 根据模板参数和网格初始化运行状态
    fn spawn(&mut self, grid: &HeightMap, rng: &mut AgentRng);

    /// 执行一步
    fn run(&mut self, grid: &mut HeightMap);

    fn is_dead(&self) -> bool;

    /// 原型克隆：复制参数，运行状态为空
    fn copy(&self) -> Box<dyn Agent>;

    /// 该类型识别的参数名称
    fn property_names(&self) -> Vec<&'static str> {
        self.properties().names()
    }

    fn value(&self, name: &str) -> Option<f32> {
        self.properties().get(name)
    }

    fn set_value(&mut self, name: &str, value: f32) -> bool {
        self.properties_mut().set(name, value)
    }

    /// 每个阶段从该模板实例化的数量，不超过 `MAX_COUNT`
    fn count(&self) -> usize {
        self.properties().count_or("count", 1).min(MAX_COUNT)
    }

    /// 序列化为一行脚本
    fn to_line(&self) -> String {
        script::encode_agent(self)
    }

    /// 从一行脚本读取参数，类型标签必须与本类型一致
    fn load_line(&mut self, line: &str) -> Result<(), ScriptError> {
        script::apply_line(self, line, 0)
    }
}

/// agent 构造函数
pub type AgentFactory = fn() -> Box<dyn Agent>;

/// 类型标签 -> 构造函数
///
/// 默认注册五种内置 agent；新的 agent 类型只需注册到这里，生成器和脚本编解码无需修改。
#[derive(Clone)]
pub struct AgentRegistry {
    factories: Vec<(&'static str, AgentFactory)>,
}

impl AgentRegistry {
    /// 创建空注册表
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// 注册类型；同名类型会被替换
    pub fn register(&mut self, type_name: &'static str, factory: AgentFactory) {
        match self.factories.iter_mut().find(|(name, _)| *name == type_name) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((type_name, factory)),
        }
    }

    /// 按标签（区分大小写）创建默认参数的 agent
    pub fn create(&self, type_name: &str) -> Option<Box<dyn Agent>> {
        self.factories
            .iter()
            .find(|(name, _)| *name == type_name)
            .map(|(_, factory)| factory())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.iter().any(|(name, _)| *name == type_name)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|(name, _)| *name).collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(coastline::TYPE_NAME, coastline::create);
        registry.register(mountain::TYPE_NAME, mountain::create);
        registry.register(smooth::TYPE_NAME, smooth::create);
        registry.register(river::TYPE_NAME, river::create);
        registry.register(beach::TYPE_NAME, beach::create);
        registry
    }
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.type_names()).finish()
    }
}

// ============================================================================
// 随机定位
// ============================================================================

/// 四个罗盘方向
pub const COMPASS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// 均匀随机的边界单元格
pub fn random_position(size: usize, rng: &mut impl Rng) -> (i32, i32) {
    if size < 2 {
        return (0, 0);
    }
    let edge = size as i32 - 1;
    let k = rng.random_range(0..4 * edge);
    let offset = k % edge;
    match k / edge {
        0 => (offset, 0),
        1 => (edge, offset),
        2 => (edge - offset, edge),
        _ => (0, edge - offset),
    }
}

/// 均匀随机的内部单元格（不在边界上）；网格太小时退化为任意单元格
pub fn random_inland_position(size: usize, rng: &mut impl Rng) -> (i32, i32) {
    if size < 3 {
        let max = size.max(1) as i32;
        return (rng.random_range(0..max), rng.random_range(0..max));
    }
    let max = size as i32 - 1;
    (rng.random_range(1..max), rng.random_range(1..max))
}

/// 随机罗盘方向（单位向量）
pub fn random_direction(rng: &mut impl Rng) -> (i32, i32) {
    COMPASS[rng.random_range(0..COMPASS.len())]
}

/// 在满足条件的单元格中均匀选取一个
pub fn random_cell_where(
    grid: &HeightMap,
    rng: &mut impl Rng,
    predicate: impl Fn(usize, usize) -> bool,
) -> Option<(i32, i32)> {
    let size = grid.size();
    let candidates: Vec<(i32, i32)> = (0..size * size)
        .map(|i| (i % size, i / size))
        .filter(|&(x, z)| predicate(x, z))
        .map(|(x, z)| (x as i32, z as i32))
        .collect();

    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.random_range(0..candidates.len())])
    }
}

/// 沿角度方向前进一个单元格（四舍五入到网格）
pub(crate) fn step_along(x: i32, z: i32, angle: f32) -> (i32, i32) {
    (x + angle.cos().round() as i32, z + angle.sin().round() as i32)
}

/// 以 (cx, cz) 为中心、半径 radius 的圆盘内的网格单元格，附带到中心的距离
pub(crate) fn disc_cells(
    grid: &HeightMap,
    cx: i32,
    cz: i32,
    radius: i32,
) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
    let radius = radius.max(0);
    (-radius..=radius).flat_map(move |dz| {
        (-radius..=radius).filter_map(move |dx| {
            let (x, z) = (cx + dx, cz + dz);
            let dist = ((dx * dx + dz * dz) as f32).sqrt();
            if dist <= radius as f32 && grid.contains(x, z) {
                Some((x as usize, z as usize, dist))
            } else {
                None
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_position_is_on_boundary() {
        let mut rng = AgentRng::seed_from_u64(1);
        for _ in 0..200 {
            let (x, z) = random_position(10, &mut rng);
            assert!((0..10).contains(&x) && (0..10).contains(&z));
            assert!(x == 0 || z == 0 || x == 9 || z == 9, "({}, {}) not on boundary", x, z);
        }
    }

    #[test]
    fn test_random_position_covers_every_side() {
        let mut rng = AgentRng::seed_from_u64(2);
        let mut sides = [false; 4];
        for _ in 0..400 {
            let (x, z) = random_position(6, &mut rng);
            sides[0] |= z == 0;
            sides[1] |= x == 5;
            sides[2] |= z == 5;
            sides[3] |= x == 0;
        }
        assert!(sides.iter().all(|&s| s));
    }

    #[test]
    fn test_random_inland_position_is_interior() {
        let mut rng = AgentRng::seed_from_u64(3);
        for _ in 0..200 {
            let (x, z) = random_inland_position(10, &mut rng);
            assert!((1..9).contains(&x) && (1..9).contains(&z));
        }
        let (x, z) = random_inland_position(1, &mut rng);
        assert_eq!((x, z), (0, 0));
    }

    #[test]
    fn test_random_direction_is_unit_compass() {
        let mut rng = AgentRng::seed_from_u64(4);
        for _ in 0..50 {
            let (dx, dz) = random_direction(&mut rng);
            assert_eq!(dx.abs() + dz.abs(), 1);
        }
    }

    #[test]
    fn test_random_cell_where_respects_predicate() {
        let mut grid = HeightMap::new(5);
        grid.set(2, 3, 50.0);
        let mut rng = AgentRng::seed_from_u64(5);
        let cell = random_cell_where(&grid, &mut rng, |x, z| grid.get(x, z) > 10.0);
        assert_eq!(cell, Some((2, 3)));
        assert_eq!(random_cell_where(&grid, &mut rng, |_, _| false), None);
    }

    #[test]
    fn test_disc_cells_clip_to_grid() {
        let grid = HeightMap::new(4);
        let cells: Vec<_> = disc_cells(&grid, 0, 0, 1).collect();
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|&(_, _, d)| d <= 1.0));
    }

    #[test]
    fn test_count_is_capped() {
        let registry = AgentRegistry::default();
        let mut agent = registry.create("Smooth").unwrap();
        agent.set_value("count", 1e12);
        assert_eq!(agent.count(), MAX_COUNT);
        agent.set_value("count", 3.7);
        assert_eq!(agent.count(), 3);
    }

    #[test]
    fn test_default_registry_knows_builtin_kinds() {
        let registry = AgentRegistry::default();
        assert_eq!(
            registry.type_names(),
            vec!["CoastLine", "Mountain", "Smooth", "River", "Beach"]
        );
        for name in registry.type_names() {
            let agent = registry.create(name).unwrap();
            assert_eq!(agent.type_name(), name);
            assert!(agent.property_names().contains(&"count"));
        }
        assert!(registry.create("coastline").is_none(), "tags are case-sensitive");
        assert!(registry.create("Volcano").is_none());
    }
}
