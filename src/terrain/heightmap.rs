// 高度网格
//
// 边长固定的方形高度网格，agent 在运行步骤中通过 get/set 修改地形。
// 索引为 z * size + x。

use super::noise::NoiseGenerator;
use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

/// 海平面高度阈值
pub const SEA_LEVEL: f32 = 20.0;

/// 平滑时邻居平均值所占的默认权重
pub const DEFAULT_SMOOTH_WEIGHT: f32 = 0.5;

/// 渲染用顶点：位置 + 法线
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// 自上次重置以来实际执行的全图处理次数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeightMapStats {
    pub smooth_passes: u32,
    pub normal_passes: u32,
}

/// 高度网格
#[derive(Debug, Clone)]
pub struct HeightMap {
    size: usize,
    heights: Vec<f32>,
    /// reset() 恢复到的初始高度
    initial: Vec<f32>,
    normals: Vec<[f32; 3]>,
    normals_enabled: bool,
    normals_stale: bool,
    smooth_weight: f32,
    height_scale: f32,
    stats: HeightMapStats,
}

impl HeightMap {
    /// 创建平坦网格，所有高度为 0（深海）
    pub fn new(size: usize) -> Self {
        Self::flat(size, 0.0)
    }

    /// 创建指定初始高度的平坦网格
    pub fn flat(size: usize, height: f32) -> Self {
        Self::from_heights(size, vec![height; size * size])
    }

    /// 从已有高度数据创建网格
    ///
    /// `heights.len()` 必须等于 `size * size`。
    pub fn from_heights(size: usize, heights: Vec<f32>) -> Self {
        assert!(size > 0, "HeightMap size must be positive");
        assert_eq!(
            heights.len(),
            size * size,
            "HeightMap::from_heights: expected {} heights, got {}",
            size * size,
            heights.len()
        );

        Self {
            size,
            initial: heights.clone(),
            heights,
            normals: vec![[0.0, 1.0, 0.0]; size * size],
            normals_enabled: true,
            normals_stale: true,
            smooth_weight: DEFAULT_SMOOTH_WEIGHT,
            height_scale: 1.0,
            stats: HeightMapStats::default(),
        }
    }

    /// 用噪声生成初始起伏，高度在 base ± amplitude 之间
    pub fn from_noise(size: usize, noise: &NoiseGenerator, base: f32, amplitude: f32) -> Self {
        let heights = (0..size * size)
            .map(|i| {
                let x = (i % size) as f32;
                let z = (i / size) as f32;
                noise.generate_range(x, z, base - amplitude, base + amplitude)
            })
            .collect();
        Self::from_heights(size, heights)
    }

    /// 设置平滑权重（邻居平均值的占比，0.0-1.0）
    pub fn with_smooth_weight(mut self, weight: f32) -> Self {
        self.smooth_weight = weight.clamp(0.0, 1.0);
        self
    }

    /// 设置法线计算时的垂直缩放
    pub fn with_height_scale(mut self, scale: f32) -> Self {
        self.height_scale = scale;
        self
    }

    #[inline]
    fn index(&self, x: usize, z: usize) -> usize {
        assert!(
            x < self.size && z < self.size,
            "HeightMap access out of bounds: ({}, {}) on a {}x{} grid",
            x,
            z,
            self.size,
            self.size
        );
        z * self.size + x
    }

    /// 返回 (x, z) 的高度
    pub fn get(&self, x: usize, z: usize) -> f32 {
        self.heights[self.index(x, z)]
    }

    /// 修改 (x, z) 的高度
    pub fn set(&mut self, x: usize, z: usize, height: f32) {
        let idx = self.index(x, z);
        self.heights[idx] = height;
    }

    /// 网格边长
    pub fn size(&self) -> usize {
        self.size
    }

    /// 有符号坐标是否在网格内
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= 0 && z >= 0 && (x as usize) < self.size && (z as usize) < self.size
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub fn stats(&self) -> HeightMapStats {
        self.stats
    }

    pub fn is_land(&self, x: usize, z: usize) -> bool {
        self.get(x, z) >= SEA_LEVEL
    }

    /// 陆地单元格且至少有一个四邻居是水
    pub fn is_coast(&self, x: usize, z: usize) -> bool {
        if !self.is_land(x, z) {
            return false;
        }
        let (x, z) = (x as i32, z as i32);
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .iter()
            .any(|&(dx, dz)| {
                let (nx, nz) = (x + dx, z + dz);
                self.contains(nx, nz) && !self.is_land(nx as usize, nz as usize)
            })
    }

    /// 在小数坐标处双线性采样，坐标被限制在网格内
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        let max = (self.size - 1) as f32;
        let x = x.clamp(0.0, max);
        let z = z.clamp(0.0, max);

        let x0 = x.floor() as usize;
        let z0 = z.floor() as usize;
        let x1 = (x0 + 1).min(self.size - 1);
        let z1 = (z0 + 1).min(self.size - 1);
        let tx = x - x0 as f32;
        let tz = z - z0 as f32;

        let top = self.get(x0, z0) * (1.0 - tx) + self.get(x1, z0) * tx;
        let bottom = self.get(x0, z1) * (1.0 - tx) + self.get(x1, z1) * tx;
        top * (1.0 - tz) + bottom * tz
    }

    /// 对所有单元格做一次邻域平均
    ///
    /// 每个单元格只读取处理前的快照，结果与并行顺序无关。
    pub fn smooth_all(&mut self) {
        let size = self.size;
        let weight = self.smooth_weight;
        let original = self.heights.clone();

        self.heights
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, h)| {
                let x = i % size;
                let z = i / size;
                let mut sum = 0.0;
                let mut count = 0;
                for (dx, dz) in NEIGHBORS_8 {
                    let nx = x as i32 + dx;
                    let nz = z as i32 + dz;
                    if nx >= 0 && nz >= 0 && (nx as usize) < size && (nz as usize) < size {
                        sum += original[nz as usize * size + nx as usize];
                        count += 1;
                    }
                }
                if count > 0 {
                    let neighbor_avg = sum / count as f32;
                    *h = *h * (1.0 - weight) + neighbor_avg * weight;
                }
            });

        self.normals_stale = true;
        self.stats.smooth_passes += 1;
    }

    /// 启用或暂停法线计算
    ///
    /// 暂停期间 compute_normals() 只标记法线过期；重新启用不会自动重算。
    pub fn set_compute_normals(&mut self, enabled: bool) {
        self.normals_enabled = enabled;
    }

    pub fn compute_normals_enabled(&self) -> bool {
        self.normals_enabled
    }

    pub fn normals_stale(&self) -> bool {
        self.normals_stale
    }

    /// 由相邻高度（中心差分）计算每个顶点的法线
    pub fn compute_normals(&mut self) {
        if !self.normals_enabled {
            self.normals_stale = true;
            return;
        }

        let size = self.size;
        let scale = self.height_scale;
        let heights = &self.heights;
        let sample = |x: i32, z: i32| {
            let x = x.clamp(0, size as i32 - 1) as usize;
            let z = z.clamp(0, size as i32 - 1) as usize;
            heights[z * size + x] * scale
        };

        self.normals
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, n)| {
                let x = (i % size) as i32;
                let z = (i / size) as i32;
                let dx = sample(x - 1, z) - sample(x + 1, z);
                let dz = sample(x, z - 1) - sample(x, z + 1);
                let v = [dx, 2.0, dz];
                let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
                *n = [v[0] / len, v[1] / len, v[2] / len];
            });

        self.normals_stale = false;
        self.stats.normal_passes += 1;
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    /// 生成渲染用顶点数组
    pub fn vertices(&self) -> Vec<TerrainVertex> {
        self.heights
            .iter()
            .zip(&self.normals)
            .enumerate()
            .map(|(i, (&h, &normal))| TerrainVertex {
                position: [
                    (i % self.size) as f32,
                    h * self.height_scale,
                    (i / self.size) as f32,
                ],
                normal,
            })
            .collect()
    }

    /// 顶点数组的原始字节，可直接上传到顶点缓冲区
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices()).to_vec()
    }

    /// 恢复到初始状态
    pub fn reset(&mut self) {
        self.heights.copy_from_slice(&self.initial);
        self.normals.fill([0.0, 1.0, 0.0]);
        self.normals_stale = true;
        self.stats = HeightMapStats::default();
    }
}

/// 八邻域偏移
pub const NEIGHBORS_8: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_roundtrip() {
        let mut map = HeightMap::new(8);
        assert_eq!(map.size(), 8);
        map.set(3, 5, 42.0);
        assert_eq!(map.get(3, 5), 42.0);
        assert_eq!(map.get(5, 3), 0.0);
        assert_eq!(map.heights()[5 * 8 + 3], 42.0);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_out_of_bounds_panics() {
        let map = HeightMap::new(4);
        map.get(4, 0);
    }

    #[test]
    fn test_reset_restores_initial_heights() {
        let mut map = HeightMap::flat(4, 5.0);
        map.set(1, 1, 100.0);
        map.smooth_all();
        map.reset();
        assert!(map.heights().iter().all(|&h| h == 5.0));
        assert_eq!(map.stats(), HeightMapStats::default());
    }

    #[test]
    fn test_smooth_spreads_a_spike() {
        let mut map = HeightMap::new(5);
        map.set(2, 2, 80.0);
        map.smooth_all();

        assert!(map.get(2, 2) < 80.0, "spike should be lowered");
        assert!(map.get(1, 2) > 0.0, "neighbors should be raised");
        assert_eq!(map.get(0, 0), 0.0, "cells outside the neighborhood stay");
        assert_eq!(map.stats().smooth_passes, 1);
    }

    #[test]
    fn test_smooth_keeps_flat_grid_flat() {
        let mut map = HeightMap::flat(6, 12.0);
        map.smooth_all();
        assert!(map.heights().iter().all(|&h| (h - 12.0).abs() < 1e-5));
    }

    #[test]
    fn test_flat_grid_normals_point_up() {
        let mut map = HeightMap::flat(4, 3.0);
        map.compute_normals();
        for n in map.normals() {
            assert!((n[1] - 1.0).abs() < 1e-6);
        }
        assert!(!map.normals_stale());
    }

    #[test]
    fn test_slope_normals_lean_downhill() {
        let heights = (0..16).map(|i| (i % 4) as f32).collect();
        let mut map = HeightMap::from_heights(4, heights);
        map.compute_normals();
        // 高度沿 +x 增加，法线应指向 -x
        let n = map.normals()[5];
        assert!(n[0] < 0.0);
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((len - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_disabled_normals_are_deferred() {
        let mut map = HeightMap::new(4);
        map.set_compute_normals(false);
        map.compute_normals();
        assert_eq!(map.stats().normal_passes, 0);
        assert!(map.normals_stale());

        map.set_compute_normals(true);
        assert!(map.normals_stale(), "re-enabling must not recompute");
        map.compute_normals();
        assert_eq!(map.stats().normal_passes, 1);
    }

    #[test]
    fn test_height_at_interpolates() {
        let mut map = HeightMap::new(2);
        map.set(1, 0, 10.0);
        map.set(1, 1, 10.0);
        assert!((map.height_at(0.5, 0.5) - 5.0).abs() < 1e-5);
        assert_eq!(map.height_at(-3.0, 0.0), 0.0);
        assert_eq!(map.height_at(9.0, 9.0), 10.0);
    }

    #[test]
    fn test_coast_detection() {
        let mut map = HeightMap::new(4);
        map.set(1, 1, SEA_LEVEL + 5.0);
        assert!(map.is_land(1, 1));
        assert!(map.is_coast(1, 1));
        assert!(!map.is_coast(0, 0));
    }

    #[test]
    fn test_vertex_bytes_length() {
        let map = HeightMap::new(3);
        let bytes = map.vertex_bytes();
        assert_eq!(bytes.len(), 9 * std::mem::size_of::<TerrainVertex>());
    }

    #[test]
    fn test_from_noise_stays_within_amplitude() {
        let noise = NoiseGenerator::new(&crate::terrain::NoiseConfig::smooth(3));
        let map = HeightMap::from_noise(32, &noise, 20.0, 8.0);
        assert!(map.heights().iter().all(|&h| (12.0..=28.0).contains(&h)));
        assert!(map.heights().iter().any(|&h| (h - 20.0).abs() > 1e-3));

        let mut reset = map.clone();
        reset.set(0, 0, 99.0);
        reset.reset();
        assert_eq!(reset.heights(), map.heights());
    }
}
