#![warn(clippy::all, rust_2018_idioms)]

pub mod agents;
pub mod config;
pub mod error;
pub mod generator;
pub mod script;
pub mod terrain;

pub use agents::{Agent, AgentRegistry, AgentRng};
pub use config::GeneratorConfig;
pub use error::{GeneratorError, ScriptError};
pub use generator::{Generator, GeneratorState};
pub use terrain::{HeightMap, NoiseConfig, NoiseGenerator, SEA_LEVEL};
