// 海岸线 agent
//
// 从边界（或内陆）的一个点出发，沿默认方向逐格生长，每一步在默认方向及其
// 左右偏转的候选格中选择得分最高的一个并修改地形。每隔 branch_interval 步，
// 节点分裂成两个方向相反偏转的子节点，剩余生命与顶点预算在子节点间平分，
// 父节点停止生长。
//
// 整棵树存放在一个节点数组中，节点用下标互相引用；只有根节点及全部后代
// 都停止生长时，agent 才算死亡。

use super::{
    derive_rng, random_direction, random_inland_position, random_position, step_along, Agent,
    AgentRng, Properties,
};
use crate::terrain::{HeightMap, NoiseConfig, NoiseGenerator};
use log::trace;

pub(crate) const TYPE_NAME: &str = "CoastLine";

pub(crate) fn create() -> Box<dyn Agent> {
    Box::new(CoastLineAgent::new())
}

/// 参数及默认值
const DEFAULTS: &[(&str, f32)] = &[
    ("count", 1.0),
    // 整棵树的生命预算（步数）
    ("life", 400.0),
    // 整棵树的顶点预算
    ("vertices", 400.0),
    // 每个节点生长多少步后分裂
    ("branch_interval", 40.0),
    // 子节点相对父方向的偏转（度）
    ("branch_angle", 45.0),
    // 候选方向之间的夹角（度）
    ("turn_angle", 30.0),
    // 默认方向两侧各几个候选方向
    ("turn_steps", 2.0),
    // 非零时从内陆出发并降低地形（湖泊、海湾）
    ("inland", 0.0),
    // 抬升后的陆地高度
    ("land_height", 30.0),
    // 内陆模式下挖成的水面高度
    ("water_height", 10.0),
    // 每步修改的圆盘半径
    ("brush", 1.0),
    ("height_weight", 1.0),
    ("attractor_weight", 1.0),
    ("repulsor_weight", 0.5),
    ("noise_weight", 0.5),
    // 最佳候选得分低于此值时节点停止生长
    ("threshold", -2.5),
];

/// 树中的一个节点
#[derive(Debug, Clone)]
struct CoastNode {
    x: i32,
    z: i32,
    /// 当前生长方向（弧度）
    heading: f32,
    life: i32,
    vertices: i32,
    vertex_limit: i32,
    steps_since_branch: i32,
    children: Option<[usize; 2]>,
    terminal: bool,
}

impl CoastNode {
    fn new(x: i32, z: i32, heading: f32, life: i32, vertex_limit: i32) -> Self {
        Self {
            x,
            z,
            heading,
            life,
            vertices: 0,
            vertex_limit,
            steps_since_branch: 0,
            children: None,
            terminal: false,
        }
    }
}

/// 一次生长使用的参数快照
#[derive(Debug, Clone)]
struct GrowthParams {
    branch_interval: i32,
    branch_angle: f32,
    turn_angle: f32,
    turn_steps: i32,
    inland: bool,
    land_height: f32,
    water_height: f32,
    brush: i32,
    height_weight: f32,
    attractor_weight: f32,
    repulsor_weight: f32,
    noise_weight: f32,
    threshold: f32,
}

impl GrowthParams {
    fn from_properties(props: &Properties) -> Self {
        Self {
            branch_interval: props.budget_or("branch_interval", 40).max(1),
            branch_angle: props.value_or("branch_angle", 45.0).to_radians(),
            turn_angle: props.value_or("turn_angle", 30.0).to_radians(),
            turn_steps: props.budget_or("turn_steps", 2).clamp(0, 8),
            inland: props.flag("inland"),
            land_height: props.value_or("land_height", 30.0),
            water_height: props.value_or("water_height", 10.0),
            brush: props.budget_or("brush", 1).max(0),
            height_weight: props.value_or("height_weight", 1.0),
            attractor_weight: props.value_or("attractor_weight", 1.0),
            repulsor_weight: props.value_or("repulsor_weight", 0.5),
            noise_weight: props.value_or("noise_weight", 0.5),
            threshold: props.value_or("threshold", -2.5),
        }
    }
}

/// spawn 之后的运行状态
#[derive(Debug, Clone)]
struct CoastTree {
    nodes: Vec<CoastNode>,
    params: GrowthParams,
    attractor: (f32, f32),
    repulsor: (f32, f32),
    noise: NoiseGenerator,
}

impl CoastTree {
    /// 下标为 idx 的节点及其所有后代是否都已停止生长
    fn subtree_terminal(&self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        node.terminal
            && node
                .children
                .map_or(true, |[a, b]| self.subtree_terminal(a) && self.subtree_terminal(b))
    }

    fn square_distance(x: f32, z: f32, to: (f32, f32)) -> f32 {
        (x - to.0).powi(2) + (z - to.1).powi(2)
    }

    /// 候选格得分：地形项 + 吸引点 - 排斥点 + 噪声
    fn score(&self, grid: &HeightMap, x: i32, z: i32) -> f32 {
        let p = &self.params;
        let h = grid.get(x as usize, z as usize);
        let span = (p.land_height - p.water_height).abs().max(1.0);
        // 抬升模式偏好尚未成为陆地的格子，内陆模式偏好尚未被挖低的格子
        let height_term = if p.inland {
            (h - p.water_height) / span
        } else {
            (p.land_height - h) / span
        }
        .clamp(-1.0, 1.0);

        let area = (grid.size() * grid.size()).max(1) as f32;
        let (fx, fz) = (x as f32, z as f32);
        let attract = Self::square_distance(fx, fz, self.attractor) / area;
        let repulse = Self::square_distance(fx, fz, self.repulsor) / area;
        let noise = self.noise.signed(fx, fz);

        p.height_weight * height_term - p.attractor_weight * attract
            + p.repulsor_weight * repulse
            + p.noise_weight * noise
    }

    /// 在候选方向中选择最佳格子；得分相同时偏好偏转更小的方向
    fn best_candidate(&self, grid: &HeightMap, node: &CoastNode) -> Option<(i32, i32, f32, f32)> {
        let p = &self.params;
        let mut best: Option<(i32, i32, f32, f32)> = None;

        // 候选顺序 0, -1, +1, -2, +2 ...
        let offsets = std::iter::once(0).chain((1..=p.turn_steps).flat_map(|k| [-k, k]));
        for k in offsets {
            let angle = node.heading + k as f32 * p.turn_angle;
            let (cx, cz) = step_along(node.x, node.z, angle);
            if !grid.contains(cx, cz) || (cx, cz) == (node.x, node.z) {
                continue;
            }
            let score = self.score(grid, cx, cz);
            if best.map_or(true, |(_, _, _, s)| score > s) {
                best = Some((cx, cz, angle, score));
            }
        }

        best
    }

    /// 修改以 (x, z) 为中心的圆盘
    fn paint(&self, grid: &mut HeightMap, x: i32, z: i32) {
        let p = &self.params;
        let cells: Vec<_> = super::disc_cells(grid, x, z, p.brush).collect();
        for (cx, cz, _) in cells {
            let h = grid.get(cx, cz);
            let target = if p.inland {
                h.min(p.water_height)
            } else {
                h.max(p.land_height)
            };
            grid.set(cx, cz, target);
        }
    }

    /// 分裂：两个子节点平分剩余预算，父节点停止生长
    fn branch(&mut self, idx: usize) -> bool {
        let node = &self.nodes[idx];
        let life = node.life / 2;
        let vertex_limit = (node.vertex_limit - node.vertices) / 2;
        if life < 1 || vertex_limit < 1 {
            return false;
        }

        let angle = self.params.branch_angle;
        let left = CoastNode::new(node.x, node.z, node.heading - angle, life, vertex_limit);
        let right = CoastNode::new(node.x, node.z, node.heading + angle, life, vertex_limit);

        let a = self.nodes.len();
        self.nodes.push(left);
        self.nodes.push(right);

        let node = &mut self.nodes[idx];
        node.children = Some([a, a + 1]);
        node.terminal = true;
        trace!("coastline node {} branched into {} and {}", idx, a, a + 1);
        true
    }

    /// 推进一个节点一步
    fn step_node(&mut self, idx: usize, grid: &mut HeightMap) {
        let node = self.nodes[idx].clone();
        if node.life <= 0 || node.vertices >= node.vertex_limit {
            self.nodes[idx].terminal = true;
            return;
        }

        if node.steps_since_branch >= self.params.branch_interval && self.branch(idx) {
            return;
        }

        match self.best_candidate(grid, &node) {
            Some((x, z, angle, score)) if score >= self.params.threshold => {
                self.paint(grid, x, z);
                let node = &mut self.nodes[idx];
                node.x = x;
                node.z = z;
                node.heading = angle;
                node.life -= 1;
                node.vertices += 1;
                node.steps_since_branch += 1;
            }
            _ => {
                trace!("coastline node {} reached a dead end", idx);
                self.nodes[idx].terminal = true;
            }
        }
    }
}

/// 海岸线 agent
#[derive(Debug, Clone)]
pub struct CoastLineAgent {
    properties: Properties,
    tree: Option<CoastTree>,
    dead: bool,
}

impl CoastLineAgent {
    pub fn new() -> Self {
        Self {
            properties: Properties::from_defaults(DEFAULTS),
            tree: None,
            dead: false,
        }
    }

    /// 树中的节点数（spawn 前为 0）
    pub fn node_count(&self) -> usize {
        self.tree.as_ref().map_or(0, |t| t.nodes.len())
    }

    /// 仍在生长的节点数
    pub fn active_count(&self) -> usize {
        self.tree
            .as_ref()
            .map_or(0, |t| t.nodes.iter().filter(|n| !n.terminal).count())
    }

    /// 根节点当前位置
    pub fn root_position(&self) -> Option<(i32, i32)> {
        self.tree
            .as_ref()
            .and_then(|t| t.nodes.first())
            .map(|n| (n.x, n.z))
    }

    pub fn attractor(&self) -> Option<(f32, f32)> {
        self.tree.as_ref().map(|t| t.attractor)
    }

    pub fn repulsor(&self) -> Option<(f32, f32)> {
        self.tree.as_ref().map(|t| t.repulsor)
    }
}

impl Default for CoastLineAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for CoastLineAgent {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn spawn(&mut self, grid: &HeightMap, rng: &mut AgentRng) {
        let mut rng = derive_rng(rng);
        let params = GrowthParams::from_properties(&self.properties);
        let size = grid.size();

        let (x, z) = if params.inland {
            random_inland_position(size, &mut rng)
        } else {
            random_position(size, &mut rng)
        };
        let (mut dx, mut dz) = random_direction(&mut rng);
        // 从边界出发时方向朝向网格内部
        if !grid.contains(x + dx, z + dz) {
            dx = -dx;
            dz = -dz;
        }

        let (ax, az) = random_inland_position(size, &mut rng);
        let (rx, rz) = random_inland_position(size, &mut rng);
        let noise = NoiseGenerator::new(&NoiseConfig::steering(&mut rng));

        let life = self.properties.budget_or("life", 400);
        let vertex_limit = self.properties.budget_or("vertices", 400);
        let root = CoastNode::new(x, z, (dz as f32).atan2(dx as f32), life, vertex_limit);

        trace!(
            "coastline spawned at ({}, {}) heading ({}, {}), life {}",
            x,
            z,
            dx,
            dz,
            life
        );

        self.tree = Some(CoastTree {
            nodes: vec![root],
            params,
            attractor: (ax as f32, az as f32),
            repulsor: (rx as f32, rz as f32),
            noise,
        });
        self.dead = false;
    }

    fn run(&mut self, grid: &mut HeightMap) {
        if self.dead {
            return;
        }
        let Some(tree) = self.tree.as_mut() else {
            return;
        };

        // 本 tick 新生成的子节点从下一 tick 开始生长
        let existing = tree.nodes.len();
        for idx in 0..existing {
            if !tree.nodes[idx].terminal {
                tree.step_node(idx, grid);
            }
        }

        self.dead = tree.subtree_terminal(0);
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn copy(&self) -> Box<dyn Agent> {
        Box::new(Self {
            properties: self.properties.clone(),
            tree: None,
            dead: false,
        })
    }
}
