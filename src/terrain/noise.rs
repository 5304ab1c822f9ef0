use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for procedural noise generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Random seed for reproducible generation
    pub seed: u32,

    /// Base frequency of the noise, in cycles per grid cell
    /// Typical range: 0.02 - 0.2
    pub frequency: f64,

    /// Number of noise layers to combine (more = more detail)
    /// Typical range: 1 - 8
    pub octaves: usize,

    /// How much each octave contributes (amplitude decay)
    /// Typical range: 0.3 - 0.7
    pub persistence: f64,

    /// Frequency multiplier between octaves
    /// Typical range: 1.5 - 3.0
    pub lacunarity: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            frequency: 0.08,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl NoiseConfig {
    /// Create a new noise configuration with custom parameters
    pub fn new(seed: u32, frequency: f64, octaves: usize, persistence: f64, lacunarity: f64) -> Self {
        Self {
            seed,
            frequency,
            octaves,
            persistence,
            lacunarity,
        }
    }

    /// Default parameters with the given seed
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Configuration used by agents for steering: few octaves, cell-scale features.
    /// The seed is drawn from the agent's own rng.
    pub fn steering(rng: &mut impl Rng) -> Self {
        Self {
            seed: rng.random(),
            frequency: 0.12,
            octaves: 3,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }

    /// Configuration for smooth, large-scale features such as the initial relief
    pub fn smooth(seed: u32) -> Self {
        Self {
            seed,
            frequency: 0.02,
            octaves: 3,
            persistence: 0.6,
            lacunarity: 2.0,
        }
    }
}

/// Multi-layered noise generator using Fractional Brownian Motion (FBM)
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    fbm: Fbm<Perlin>,
    frequency: f64,
}

impl NoiseGenerator {
    /// Create a new noise generator from configuration
    pub fn new(config: &NoiseConfig) -> Self {
        let fbm = Fbm::<Perlin>::new(config.seed)
            .set_octaves(config.octaves.max(1))
            .set_persistence(config.persistence)
            .set_lacunarity(config.lacunarity);

        Self {
            fbm,
            frequency: config.frequency,
        }
    }

    /// Raw noise value at grid coordinates, in range [-1.0, 1.0]
    pub fn signed(&self, x: f32, y: f32) -> f32 {
        let nx = (x as f64) * self.frequency;
        let ny = (y as f64) * self.frequency;
        self.fbm.get([nx, ny]).clamp(-1.0, 1.0) as f32
    }

    /// Generate noise value at given coordinates
    /// Returns value in range [0.0, 1.0]
    pub fn generate(&self, x: f32, y: f32) -> f32 {
        (self.signed(x, y) + 1.0) * 0.5
    }

    /// Generate noise value with custom range
    pub fn generate_range(&self, x: f32, y: f32, min: f32, max: f32) -> f32 {
        min + self.generate(x, y) * (max - min)
    }
}
