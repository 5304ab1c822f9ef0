// 海滩 agent：沿海岸线游走，把略高于海平面的陆地压平成低矮的沙滩

use super::{derive_rng, disc_cells, random_cell_where, Agent, AgentRng, Properties};
use crate::terrain::{HeightMap, NEIGHBORS_8, SEA_LEVEL};
use log::debug;
use rand::Rng;

pub(crate) const TYPE_NAME: &str = "Beach";

pub(crate) fn create() -> Box<dyn Agent> {
    Box::new(BeachAgent::new())
}

const DEFAULTS: &[(&str, f32)] = &[
    ("count", 1.0),
    ("life", 100.0),
    // 沙滩高出海平面的最大值
    ("height", 3.0),
    ("radius", 2.0),
    // 只处理海平面以上这个范围内的陆地
    ("limit", 15.0),
];

#[derive(Debug, Clone)]
struct Walker {
    x: i32,
    z: i32,
    life: i32,
    rng: AgentRng,
}

/// 海滩 agent
#[derive(Debug, Clone)]
pub struct BeachAgent {
    properties: Properties,
    walker: Option<Walker>,
    dead: bool,
}

impl BeachAgent {
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

impl Default for BeachAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for BeachAgent {
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
        let limit = SEA_LEVEL + self.properties.value_or("limit", 15.0);
        let start = random_cell_where(grid, &mut rng, |x, z| {
            grid.is_coast(x, z) && grid.get(x, z) < limit
        });

        match start {
            Some((x, z)) => {
                self.walker = Some(Walker {
                    x,
                    z,
                    life: self.properties.budget_or("life", 100),
                    rng,
                });
                self.dead = false;
            }
            None => {
                debug!("beach found no low coast, dying");
                self.walker = None;
                self.dead = true;
            }
        }
    }

    fn run(&mut self, grid: &mut HeightMap) {
        if self.dead {
            return;
        }
        let height = self.properties.value_or("height", 3.0);
        let radius = self.properties.budget_or("radius", 2).max(0);
        let limit = SEA_LEVEL + self.properties.value_or("limit", 15.0);
        let Some(walker) = self.walker.as_mut() else {
            self.dead = true;
            return;
        };
        if walker.life <= 0 {
            self.dead = true;
            return;
        }

        let cells: Vec<_> = disc_cells(grid, walker.x, walker.z, radius).collect();
        for (x, z, _) in cells {
            let h = grid.get(x, z);
            if (SEA_LEVEL..=limit).contains(&h) {
                let sand = SEA_LEVEL + height * (0.5 + 0.5 * walker.rng.random::<f32>());
                grid.set(x, z, sand);
            }
        }

        // 优先沿海岸移动，找不到时随机走一步
        let neighbors: Vec<(i32, i32)> = NEIGHBORS_8
            .iter()
            .map(|&(dx, dz)| (walker.x + dx, walker.z + dz))
            .filter(|&(x, z)| grid.contains(x, z))
            .collect();
        let coast: Vec<(i32, i32)> = neighbors
            .iter()
            .copied()
            .filter(|&(x, z)| grid.is_coast(x as usize, z as usize))
            .collect();
        let choices = if coast.is_empty() { &neighbors } else { &coast };
        if !choices.is_empty() {
            let (x, z) = choices[walker.rng.random_range(0..choices.len())];
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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// 中间一块高地，四周是海
    fn plateau(size: usize, height: f32) -> HeightMap {
        let mut grid = HeightMap::new(size);
        for z in 2..size - 2 {
            for x in 2..size - 2 {
                grid.set(x, z, height);
            }
        }
        grid
    }

    #[test]
    fn test_no_coast_dies_on_spawn() {
        let grid = HeightMap::new(8);
        let mut agent = BeachAgent::new();
        agent.spawn(&grid, &mut AgentRng::seed_from_u64(1));
        assert!(agent.is_dead());
        assert!(agent.position().is_none());
    }

    #[test]
    fn test_high_cliffs_are_not_beaches() {
        let grid = plateau(10, SEA_LEVEL + 40.0);
        let mut agent = BeachAgent::new();
        agent.spawn(&grid, &mut AgentRng::seed_from_u64(2));
        assert!(agent.is_dead());
    }

    #[test]
    fn test_flattens_low_coast() {
        let mut grid = plateau(12, SEA_LEVEL + 10.0);
        let mut agent = BeachAgent::new();
        agent.set_value("life", 30.0);
        agent.spawn(&grid, &mut AgentRng::seed_from_u64(3));
        let (x, z) = agent.position().unwrap();
        assert!(grid.is_coast(x as usize, z as usize));

        let mut ticks = 0;
        while !agent.is_dead() {
            agent.run(&mut grid);
            ticks += 1;
        }
        assert_eq!(ticks, 30);

        let lowered = grid
            .heights()
            .iter()
            .filter(|&&h| h > SEA_LEVEL && h <= SEA_LEVEL + 3.0)
            .count();
        assert!(lowered > 0);
        // 水面不受影响
        assert_eq!(grid.get(0, 0), 0.0);
        assert!(grid.heights().iter().all(|&h| h == 0.0 || h >= SEA_LEVEL));
    }
}
