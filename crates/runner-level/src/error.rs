//! Level generation error types.

use runner_config::ConfigError;
use runner_pool::{PoolError, PrefabKind};

use crate::frontier::Stream;

/// Errors raised while building a level generator from configuration.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No biome was configured.
    #[error("no biomes configured")]
    NoBiomes,

    /// Two prefabs share a name.
    #[error("duplicate prefab name: {0}")]
    DuplicatePrefab(String),

    /// A biome lists a prefab name that is not defined.
    #[error("biome '{biome}' references unknown prefab '{prefab}'")]
    UnknownPrefab {
        /// Biome holding the reference.
        biome: String,
        /// The unresolved prefab name.
        prefab: String,
    },

    /// A biome would switch before generating anything.
    #[error("biome '{0}' has a transition quota of zero")]
    ZeroQuota(String),
}

/// Errors raised by a single generation call.
///
/// A failed call never moves a frontier.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GenerationError {
    /// There is no track frontier to extend from.
    #[error("no track frontier to extend")]
    MissingFrontier,

    /// The current biome lists no prefab for the stream.
    #[error("biome '{biome}' has no legal {stream} prefabs")]
    NoPrefabs {
        /// Current biome name.
        biome: String,
        /// Stream that needed a prefab.
        stream: Stream,
    },

    /// None of the lanes in a set has an end attach point.
    #[error("no lane in the set has an end attach point (kinds {kinds:?})")]
    MissingAttachPoint {
        /// Kinds that were tried.
        kinds: Vec<PrefabKind>,
    },

    /// The candidate frontier is not ahead of the current one.
    #[error("frontier did not advance: {previous} -> {candidate}")]
    FrontierDesync {
        /// Forward coordinate of the retained frontier.
        previous: f32,
        /// Forward coordinate the set would have produced.
        candidate: f32,
    },

    /// Generation was halted by an earlier configuration error.
    #[error("generation halted: {0}")]
    Halted(String),

    /// The pool refused a request.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl GenerationError {
    /// Whether this error means generation cannot make progress without a
    /// content or configuration fix.
    pub fn halts_generation(&self) -> bool {
        match self {
            Self::MissingFrontier
            | Self::NoPrefabs { .. }
            | Self::MissingAttachPoint { .. }
            | Self::Halted(_) => true,
            Self::Pool(PoolError::UnknownKind(_)) => true,
            Self::FrontierDesync { .. } | Self::Pool(_) => false,
        }
    }
}
