// 山脉 agent：从陆地上的随机点出发行走，沿途抬起一条带噪声的山脊

use super::{derive_rng, disc_cells, random_cell_where, random_inland_position, step_along};
use super::{Agent, AgentRng, Properties};
use crate::terrain::{HeightMap, NoiseConfig, NoiseGenerator, SEA_LEVEL};
use rand::Rng;
use std::f32::consts::{PI, TAU};

pub(crate) const TYPE_NAME: &str = "Mountain";

pub(crate) fn create() -> Box<dyn Agent> {
    Box::new(MountainAgent::new())
}

const DEFAULTS: &[(&str, f32)] = &[
    ("count", 1.0),
    ("life", 60.0),
    // 山脊相对起点地面的高度
    ("height", 60.0),
    // 山脊半宽（格）
    ("width", 4.0),
    // 每隔多少步改变方向
    ("turn_interval", 10.0),
    // 每次转向的最大角度（度）
    ("turn_angle", 45.0),
    // 噪声对山脊高度的影响
    ("roughness", 0.3),
];

#[derive(Debug, Clone)]
struct Walker {
    x: i32,
    z: i32,
    heading: f32,
    life: i32,
    steps: i32,
    base: f32,
    rng: AgentRng,
    noise: NoiseGenerator,
}

/// 山脉 agent
#[derive(Debug, Clone)]
pub struct MountainAgent {
    properties: Properties,
    walker: Option<Walker>,
    dead: bool,
}

impl MountainAgent {
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

    /// 以当前位置为中心抬起一个锥形截面
    fn raise_ridge(&self, walker: &Walker, grid: &mut HeightMap) {
        let height = self.properties.value_or("height", 60.0);
        let width = self.properties.budget_or("width", 4).max(0);
        let roughness = self.properties.value_or("roughness", 0.3);

        let cells: Vec<_> = disc_cells(grid, walker.x, walker.z, width).collect();
        for (x, z, dist) in cells {
            let falloff = 1.0 - dist / (width as f32 + 1.0);
            let jitter = 1.0 + roughness * walker.noise.signed(x as f32, z as f32);
            let target = walker.base + height * falloff * jitter;
            let h = grid.get(x, z);
            if target > h {
                grid.set(x, z, target);
            }
        }
    }
}

impl Default for MountainAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for MountainAgent {
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
        let (x, z) = random_cell_where(grid, &mut rng, |x, z| grid.is_land(x, z))
            .unwrap_or_else(|| random_inland_position(grid.size(), &mut rng));
        let heading = rng.random_range(0.0..TAU);
        let noise = NoiseGenerator::new(&NoiseConfig::steering(&mut rng));
        let base = grid.get(x as usize, z as usize).max(SEA_LEVEL);

        self.walker = Some(Walker {
            x,
            z,
            heading,
            life: self.properties.budget_or("life", 60),
            steps: 0,
            base,
            rng,
            noise,
        });
        self.dead = false;
    }

    fn run(&mut self, grid: &mut HeightMap) {
        if self.dead {
            return;
        }
        let Some(mut walker) = self.walker.take() else {
            return;
        };
        if walker.life <= 0 {
            self.dead = true;
            self.walker = Some(walker);
            return;
        }

        self.raise_ridge(&walker, grid);

        let turn_interval = self.properties.budget_or("turn_interval", 10).max(1);
        let turn = self.properties.value_or("turn_angle", 45.0).to_radians().abs();
        walker.steps += 1;
        if walker.steps % turn_interval == 0 && turn > 0.0 && turn.is_finite() {
            walker.heading += walker.rng.random_range(-turn..=turn);
        }

        let (nx, nz) = step_along(walker.x, walker.z, walker.heading);
        if grid.contains(nx, nz) {
            walker.x = nx;
            walker.z = nz;
        } else {
            // 碰到边界时掉头
            walker.heading += PI;
        }

        walker.life -= 1;
        self.dead = walker.life <= 0;
        self.walker = Some(walker);
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
