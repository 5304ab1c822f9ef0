// 河流 agent
//
// 从随机海岸点出发，朝地图最高点前进，沿途挖出河道。噪声让路径蜿蜒。
// 没有海岸或没有高于海平面的目标时，spawn 后第一次 run 即死亡。

use super::{derive_rng, disc_cells, random_cell_where, Agent, AgentRng, Properties};
use crate::terrain::{HeightMap, NoiseConfig, NoiseGenerator, NEIGHBORS_8, SEA_LEVEL};
use log::debug;

pub(crate) const TYPE_NAME: &str = "River";

pub(crate) fn create() -> Box<dyn Agent> {
    Box::new(RiverAgent::new())
}

const DEFAULTS: &[(&str, f32)] = &[
    ("count", 1.0),
    ("life", 200.0),
    // 河道下切深度
    ("depth", 6.0),
    // 河道半宽
    ("width", 1.0),
    // 蜿蜒程度，以格为单位的噪声偏移
    ("meander", 1.5),
];

#[derive(Debug, Clone)]
struct Course {
    x: i32,
    z: i32,
    target: (i32, i32),
    life: i32,
    noise: NoiseGenerator,
}

/// 河流 agent
#[derive(Debug, Clone)]
pub struct RiverAgent {
    properties: Properties,
    course: Option<Course>,
    dead: bool,
}

impl RiverAgent {
    pub fn new() -> Self {
        Self {
            properties: Properties::from_defaults(DEFAULTS),
            course: None,
            dead: false,
        }
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.course.as_ref().map(|c| (c.x, c.z))
    }

    pub fn target(&self) -> Option<(i32, i32)> {
        self.course.as_ref().map(|c| c.target)
    }
}

impl Default for RiverAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// 网格最高点，相同高度取索引最小的格子
fn highest_cell(grid: &HeightMap) -> (i32, i32, f32) {
    let size = grid.size();
    let (idx, h) = grid
        .heights()
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, h)| if h > best.1 { (i, h) } else { best });
    ((idx % size) as i32, (idx / size) as i32, h)
}

fn square_distance(a: (i32, i32), b: (i32, i32)) -> f32 {
    let dx = (a.0 - b.0) as f32;
    let dz = (a.1 - b.1) as f32;
    dx * dx + dz * dz
}

impl Agent for RiverAgent {
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
        let start = random_cell_where(grid, &mut rng, |x, z| grid.is_coast(x, z));
        let (tx, tz, th) = highest_cell(grid);
        let noise = NoiseGenerator::new(&NoiseConfig::steering(&mut rng));

        let mut life = self.properties.budget_or("life", 200);
        let (x, z) = match start {
            Some(pos) if th > SEA_LEVEL && pos != (tx, tz) => pos,
            other => {
                debug!("river found no coast to start from, dying");
                life = 0;
                other.unwrap_or((tx, tz))
            }
        };

        self.course = Some(Course {
            x,
            z,
            target: (tx, tz),
            life,
            noise,
        });
        self.dead = false;
    }

    fn run(&mut self, grid: &mut HeightMap) {
        if self.dead {
            return;
        }
        let depth = self.properties.value_or("depth", 6.0);
        let width = self.properties.budget_or("width", 1).max(0);
        let meander = self.properties.value_or("meander", 1.5);
        let Some(course) = self.course.as_mut() else {
            return;
        };
        if course.life <= 0 {
            self.dead = true;
            return;
        }

        // 下切河道，河床不低于海平面以下 depth
        let bed = SEA_LEVEL - depth;
        let cells: Vec<_> = disc_cells(grid, course.x, course.z, width).collect();
        for (x, z, dist) in cells {
            let falloff = 1.0 - dist / (width as f32 + 1.0);
            let h = grid.get(x, z);
            grid.set(x, z, (h - depth * falloff).max(bed.min(h)));
        }

        // 向目标前进一格，噪声让路线偏离直线
        let here = (course.x, course.z);
        let next = NEIGHBORS_8
            .iter()
            .map(|&(dx, dz)| (course.x + dx, course.z + dz))
            .filter(|&(x, z)| grid.contains(x, z))
            .map(|pos| {
                let wobble = meander * course.noise.signed(pos.0 as f32, pos.1 as f32);
                let cost = square_distance(pos, course.target).sqrt() + wobble;
                (pos, cost)
            })
            .fold(None, |best: Option<((i32, i32), f32)>, (pos, cost)| match best {
                Some((_, c)) if c <= cost => best,
                _ => Some((pos, cost)),
            });

        if let Some((pos, _)) = next {
            // 只接受真正靠近目标的移动，保证河流最终到达
            if square_distance(pos, course.target) < square_distance(here, course.target) {
                course.x = pos.0;
                course.z = pos.1;
            } else {
                let direct = (
                    course.x + (course.target.0 - course.x).signum(),
                    course.z + (course.target.1 - course.z).signum(),
                );
                course.x = direct.0;
                course.z = direct.1;
            }
        }

        course.life -= 1;
        let arrived = (course.x, course.z) == course.target;
        self.dead = course.life <= 0 || arrived;
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn copy(&self) -> Box<dyn Agent> {
        Box::new(Self {
            properties: self.properties.clone(),
            course: None,
            dead: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// 左半边是海，右半边是向右升高的陆地
    fn island_grid(size: usize) -> HeightMap {
        let heights = (0..size * size)
            .map(|i| {
                let x = i % size;
                if x < size / 2 {
                    0.0
                } else {
                    SEA_LEVEL + (x - size / 2) as f32 * 5.0
                }
            })
            .collect();
        HeightMap::from_heights(size, heights)
    }

    #[test]
    fn test_highest_cell() {
        let mut grid = HeightMap::new(5);
        grid.set(3, 1, 9.0);
        assert_eq!(highest_cell(&grid), (3, 1, 9.0));
    }

    #[test]
    fn test_no_coast_dies_immediately() {
        let mut grid = HeightMap::new(8);
        let mut agent = RiverAgent::new();
        agent.spawn(&grid, &mut AgentRng::seed_from_u64(1));
        agent.run(&mut grid);
        assert!(agent.is_dead());
        assert!(grid.heights().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_river_starts_on_coast_and_reaches_target() {
        let mut grid = island_grid(16);
        let mut agent = RiverAgent::new();
        agent.set_value("meander", 0.0);
        agent.spawn(&grid, &mut AgentRng::seed_from_u64(2));
        let (x, z) = agent.position().unwrap();
        assert!(grid.is_coast(x as usize, z as usize));
        assert_eq!(agent.target().unwrap().0, 15);

        let mut ticks = 0;
        while !agent.is_dead() {
            agent.run(&mut grid);
            ticks += 1;
        }
        assert!(ticks <= 16, "river should arrive within the grid width, took {}", ticks);
        assert_eq!(agent.position(), agent.target());
    }

    #[test]
    fn test_river_carves_channel() {
        let mut grid = island_grid(16);
        let before: f32 = grid.heights().iter().sum();
        let mut agent = RiverAgent::new();
        agent.spawn(&grid, &mut AgentRng::seed_from_u64(3));
        while !agent.is_dead() {
            agent.run(&mut grid);
        }
        let after: f32 = grid.heights().iter().sum();
        assert!(after < before);
        assert!(grid.heights().iter().all(|&h| h >= SEA_LEVEL - 6.0 || h == 0.0));
    }
}
