//! Procedural track generation: biomes, parallel lane sets, background
//! scenery, lane obstacles, and the level generator that drives them from the
//! player's forward position.
//!
//! All randomness flows through a seeded [`GenerationContext`], so a session
//! replays identically for the same seed and player trajectory.

mod biome;
mod catalog;
mod context;
mod error;
mod frontier;
mod generator;
mod obstacles;
mod scenery;
mod track;

pub use biome::{Biome, BiomeChange, BiomeEvent, BiomeManager, BiomeTheme, SceneryPlacement};
pub use catalog::PrefabCatalog;
pub use context::GenerationContext;
pub use error::{GenerationError, LevelError};
pub use frontier::{ActiveSet, GenerationFrontier, Stream};
pub use generator::{GeneratorSettings, GeneratorState, LevelGenerator, SectionReport, TickReport};
pub use obstacles::ObstacleSpawner;
pub use scenery::ScenerySpawner;
pub use track::{LaneSet, TrackSpawner};
