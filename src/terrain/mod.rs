// 地形数据：高度网格与噪声

pub mod heightmap;
pub mod noise;

pub use heightmap::*;
pub use noise::*;
