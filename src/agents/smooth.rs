// 平滑 agent：随机游走，对经过的邻域做局部平均

use super::{derive_rng, disc_cells, random_inland_position, Agent, AgentRng, Properties};
use crate::terrain::{HeightMap, NEIGHBORS_8};
use rand::Rng;

pub(crate) const TYPE_NAME: &str = "Smooth";

pub(crate) fn create() -> Box<dyn Agent> {
    Box::new(SmoothAgent::new())
}

const DEFAULTS: &[(&str, f32)] = &[
    ("count", 1.0),
    ("life", 200.0),
    ("radius", 2.0),
    // 邻居平均值的权重
    ("strength", 0.5),
];

#[derive(Debug, Clone)]
struct Walker {
    x: i32,
    z: i32,
    life: i32,
    rng: AgentRng,
}

/// 平滑 agent
#[derive(Debug, Clone)]
pub struct SmoothAgent {
    properties: Properties,
    walker: Option<Walker>,
    dead: bool,
}

impl SmoothAgent {
    pub fn new() -> Self {
        Self {
            properties: Properties::from_defaults(DEFAULTS),
            walker: None,
            dead: false,
        }
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.walker.as_ref().map(|w| (w.x, w.z))
    }
}

impl Default for SmoothAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// 对圆盘内每个格子，用处理前快照的八邻域平均值混合
fn smooth_around(grid: &mut HeightMap, cx: i32, cz: i32, radius: i32, strength: f32) {
    let updates: Vec<(usize, usize, f32)> = disc_cells(grid, cx, cz, radius)
        .map(|(x, z, _)| {
            let (sum, count) = NEIGHBORS_8
                .iter()
                .map(|&(dx, dz)| (x as i32 + dx, z as i32 + dz))
                .filter(|&(nx, nz)| grid.contains(nx, nz))
                .fold((0.0, 0), |(sum, count), (nx, nz)| {
                    (sum + grid.get(nx as usize, nz as usize), count + 1)
                });
            let h = grid.get(x, z);
            let smoothed = if count > 0 {
                h * (1.0 - strength) + sum / count as f32 * strength
            } else {
                h
            };
            (x, z, smoothed)
        })
        .collect();

    for (x, z, h) in updates {
        grid.set(x, z, h);
    }
}

impl Agent for SmoothAgent {
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
        let (x, z) = random_inland_position(grid.size(), &mut rng);
        self.walker = Some(Walker {
            x,
            z,
            life: self.properties.budget_or("life", 200),
            rng,
        });
        self.dead = false;
    }

    fn run(&mut self, grid: &mut HeightMap) {
        if self.dead {
            return;
        }
        let radius = self.properties.budget_or("radius", 2).max(0);
        let strength = self.properties.value_or("strength", 0.5).clamp(0.0, 1.0);
        let Some(walker) = self.walker.as_mut() else {
            return;
        };
        if walker.life <= 0 {
            self.dead = true;
            return;
        }

        smooth_around(grid, walker.x, walker.z, radius, strength);

        let moves: Vec<(i32, i32)> = NEIGHBORS_8
            .iter()
            .map(|&(dx, dz)| (walker.x + dx, walker.z + dz))
            .filter(|&(x, z)| grid.contains(x, z))
            .collect();
        if !moves.is_empty() {
            let (x, z) = moves[walker.rng.random_range(0..moves.len())];
            walker.x = x;
            walker.z = z;
        }

        walker.life -= 1;
        self.dead = walker.life <= 0;
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn copy(&self) -> Box<dyn Agent> {
        Box::new(Self {
            properties: self.properties.clone(),
            walker: None,
            dead: false,
        })
    }
}
