//! Object pooling for spawnable world pieces: a fixed registry of reusable
//! instances keyed by prefab kind, the per-instance spawn/despawn lifecycle,
//! and the transition scheduler that delivers lifecycle completions.
//!
//! Nothing here knows about tracks or biomes. Callers hand the [`Pool`]
//! [`PrefabTemplate`]s and receive [`InstanceId`] handles; the presentation
//! layer consumes [`PoolEvent`]s.

mod error;
mod lifecycle;
mod pool;
mod scheduler;
mod transform;

pub use error::PoolError;
pub use lifecycle::{Completion, InvalidTransition, LifecycleState, SpawnableElement};
pub use pool::{InstanceId, Pool, PoolEvent, PoolStats, PooledInstance, PrefabKind, PrefabTemplate};
pub use scheduler::{TransitionClock, TransitionPhase, TransitionScheduler, TransitionToken};
pub use transform::Transform;
