//! Configuration system for the runner track generator.
//!
//! Holds biome and prefab definitions plus the generation, pooling and
//! simulation knobs. Settings persist to disk as RON, accept CLI overrides via
//! clap, and support hot-reload detection and forward/backward compatible
//! serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AttachConfig, BiomeConfig, CONFIG_FILE_NAME, Cadence, Config, DebugConfig, GenerationConfig,
    ObstacleConfig, PoolConfig, PrefabConfig, SceneryConfig, SimulationConfig, TrackConfig,
    TransitionConfig,
};
pub use error::ConfigError;
