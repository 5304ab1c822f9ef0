//! 阶段调度器
//!
//! 生成器持有按阶段分组的 agent 模板。每个 tick：
//! 1. 没有存活 agent 时，实例化下一个阶段（每个模板克隆 `count` 份并 spawn）；
//!    所有阶段都用完时结束生成，调用完成回调，然后平滑网格并计算法线
//! 2. 按 spawn 顺序让每个存活 agent 执行一步，移除已死亡的 agent
//! 3. tick 计数加一

use crate::agents::{Agent, AgentRegistry, AgentRng};
use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::script::{self, Phases};
use crate::terrain::{HeightMap, NoiseGenerator};
use log::{debug, info};
use rand::SeedableRng;
use std::fmt;
use std::path::Path;

/// 默认调度器种子
pub const DEFAULT_SEED: u64 = 42;

/// 生成器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// 尚未 tick
    Idle,
    /// 正在执行阶段
    Running,
    /// 所有阶段已结束，网格已完成最终处理
    Finished,
}

/// 阶段调度器
pub struct Generator {
    height_map: HeightMap,
    /// 模板，永远不会被直接运行
    phases: Phases,
    /// 存活的 agent，按 spawn 顺序排列
    live: Vec<Box<dyn Agent>>,
    registry: AgentRegistry,
    seed: u64,
    rng: AgentRng,
    state: GeneratorState,
    /// 下一个要实例化的阶段
    next_phase: usize,
    tick_count: u64,
    spawned: usize,
    on_finish: Option<Box<dyn FnMut()>>,
}

impl Generator {
    /// 在给定网格上创建空的生成器
    pub fn new(height_map: HeightMap) -> Self {
        Self {
            height_map,
            phases: Vec::new(),
            live: Vec::new(),
            registry: AgentRegistry::default(),
            seed: DEFAULT_SEED,
            rng: AgentRng::seed_from_u64(DEFAULT_SEED),
            state: GeneratorState::Idle,
            next_phase: 0,
            tick_count: 0,
            spawned: 0,
            on_finish: None,
        }
    }

    /// 按配置创建网格和生成器，配置无效时返回错误
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        let height_map = match &config.noise {
            Some(noise) => HeightMap::from_noise(
                config.size,
                &NoiseGenerator::new(noise),
                config.initial_height,
                config.noise_amplitude,
            ),
            None => HeightMap::flat(config.size, config.initial_height),
        }
        .with_smooth_weight(config.smooth_weight)
        .with_height_scale(config.height_scale);

        Ok(Self::new(height_map).with_seed(config.seed))
    }

    /// 设置随机种子
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = AgentRng::seed_from_u64(seed);
        self
    }

    /// 使用自定义的 agent 注册表
    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// 设置完成回调，每次从 reset 开始的运行中最多调用一次
    pub fn set_on_finish(&mut self, callback: impl FnMut() + 'static) {
        self.on_finish = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------
    // 脚本
    // ------------------------------------------------------------------

    /// 从文件加载脚本，替换所有模板并重置
    pub fn load(&mut self, path: &Path) -> Result<(), GeneratorError> {
        self.phases = script::load_script_file(path, &self.registry)?;
        self.reset();
        Ok(())
    }

    /// 将模板保存为脚本文件
    pub fn save(&self, path: &Path) -> Result<(), GeneratorError> {
        script::save_script_file(path, &self.phases)
    }

    /// 从字符串加载脚本，替换所有模板并重置
    pub fn load_str(&mut self, text: &str) {
        self.phases = script::parse_script(text, &self.registry);
        self.reset();
    }

    /// 将模板编码为脚本文本
    pub fn to_script(&self) -> String {
        script::script_to_text(&self.phases)
    }

    /// 向指定阶段追加模板，阶段不存在时自动创建
    pub fn add_agent(&mut self, phase: usize, agent: Box<dyn Agent>) {
        if self.phases.len() <= phase {
            self.phases.resize_with(phase + 1, Vec::new);
        }
        self.phases[phase].push(agent);
    }

    // ------------------------------------------------------------------
    // 调度
    // ------------------------------------------------------------------

    /// 清除存活 agent，重置阶段游标、tick 计数、随机数和网格
    pub fn reset(&mut self) {
        self.live.clear();
        self.next_phase = 0;
        self.tick_count = 0;
        self.spawned = 0;
        self.state = GeneratorState::Idle;
        self.rng = AgentRng::seed_from_u64(self.seed);
        self.height_map.reset();
    }

    /// 执行一个调度步骤
    pub fn tick(&mut self) {
        match self.state {
            GeneratorState::Finished => {
                self.tick_count += 1;
                return;
            }
            GeneratorState::Idle => self.state = GeneratorState::Running,
            GeneratorState::Running => {}
        }

        if self.live.is_empty() {
            if self.next_phase < self.phases.len() {
                self.populate_next_phase();
            } else {
                self.finish();
            }
        }

        let grid = &mut self.height_map;
        self.live.retain_mut(|agent| {
            agent.run(grid);
            !agent.is_dead()
        });

        self.tick_count += 1;
    }

    /// 一直 tick 到结束
    ///
    /// 运行期间暂停法线计算，结束后只计算一次。
    pub fn run_all(&mut self) {
        self.height_map.set_compute_normals(false);
        while !self.is_over() {
            self.tick();
        }
        self.height_map.set_compute_normals(true);
        if self.height_map.normals_stale() {
            self.height_map.compute_normals();
        }
    }

    /// 最多 tick `n` 次，返回是否已结束
    pub fn run_ticks(&mut self, n: u64) -> bool {
        for _ in 0..n {
            if self.is_over() {
                break;
            }
            self.tick();
        }
        self.is_over()
    }

    fn populate_next_phase(&mut self) {
        let phase = self.next_phase;
        self.next_phase += 1;

        for template in &self.phases[phase] {
            for _ in 0..template.count() {
                let mut agent = template.copy();
                agent.spawn(&self.height_map, &mut self.rng);
                self.live.push(agent);
            }
        }
        self.spawned += self.live.len();

        debug!(
            "phase {}/{}: spawned {} agents at tick {}",
            phase + 1,
            self.phases.len(),
            self.live.len(),
            self.tick_count
        );
    }

    fn finish(&mut self) {
        self.state = GeneratorState::Finished;
        info!(
            "generation finished after {} ticks, {} agents spawned",
            self.tick_count, self.spawned
        );

        if let Some(callback) = self.on_finish.as_mut() {
            callback();
        }
        self.height_map.smooth_all();
        self.height_map.compute_normals();
    }

    // ------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state != GeneratorState::Idle
    }

    pub fn is_over(&self) -> bool {
        self.state == GeneratorState::Finished
    }

    /// 指定阶段的模板；阶段不存在时为空
    pub fn agents(&self, phase: usize) -> &[Box<dyn Agent>] {
        self.phases.get(phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn phases_count(&self) -> usize {
        self.phases.len()
    }

    /// 正在运行的阶段
    pub fn current_phase(&self) -> Option<usize> {
        self.next_phase.checked_sub(1)
    }

    /// 阶段游标：已经实例化的阶段数量
    pub fn next_phase(&self) -> usize {
        self.next_phase
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn live_agent_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_agents(&self) -> &[Box<dyn Agent>] {
        &self.live
    }

    /// 自上次重置以来 spawn 的 agent 总数
    pub fn spawned_count(&self) -> usize {
        self.spawned
    }

    pub fn height_map(&self) -> &HeightMap {
        &self.height_map
    }

    pub fn height_map_mut(&mut self) -> &mut HeightMap {
        &mut self.height_map
    }

    /// 替换网格并重置
    pub fn set_height_map(&mut self, height_map: HeightMap) {
        self.height_map = height_map;
        self.reset();
    }

    pub fn height_map_size(&self) -> usize {
        self.height_map.size()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// 注册新的 agent 类型后，之后加载的脚本即可识别它
    pub fn registry_mut(&mut self) -> &mut AgentRegistry {
        &mut self.registry
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("size", &self.height_map.size())
            .field("phases", &self.phases.len())
            .field("live", &self.live.len())
            .field("seed", &self.seed)
            .field("state", &self.state)
            .field("next_phase", &self.next_phase)
            .field("tick_count", &self.tick_count)
            .finish()
    }
}
