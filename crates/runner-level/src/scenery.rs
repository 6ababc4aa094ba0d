//! Background scenery placed around the track frontier.

use glam::Vec3;
use runner_config::SceneryConfig;
use runner_pool::{InstanceId, Pool, Transform, TransitionScheduler};
use tracing::trace;

use crate::biome::Biome;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::frontier::{ActiveSet, GenerationFrontier, Stream};

/// Spawns decorative objects beside the track.
#[derive(Clone, Debug)]
pub struct ScenerySpawner {
    jitter: Vec3,
    active: ActiveSet,
}

impl ScenerySpawner {
    /// `jitter` is the per-axis extent of extra random displacement.
    pub fn new(jitter: Vec3) -> Self {
        Self {
            jitter: jitter.abs(),
            active: ActiveSet::new(Stream::Scenery),
        }
    }

    pub fn from_config(config: &SceneryConfig) -> Self {
        Self::new(Vec3::from_array(config.jitter))
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// Place one scenery object relative to the track frontier.
    ///
    /// The offset is drawn from the biome's placement ranges on a random side,
    /// rotated into the frontier's orientation, then jittered. The forward
    /// coordinate never goes below zero, and `frontier.scenery_z` only moves
    /// forward.
    pub fn spawn_next_scenery<S: TransitionScheduler>(
        &mut self,
        frontier: &mut GenerationFrontier,
        biome: &Biome,
        pool: &mut Pool<S>,
        ctx: &mut GenerationContext,
    ) -> Result<InstanceId, GenerationError> {
        let Some(attach) = frontier.track else {
            return Err(GenerationError::MissingFrontier);
        };
        let Some(&kind) = ctx.pick(&biome.scenery_kinds) else {
            return Err(GenerationError::NoPrefabs {
                biome: biome.name.clone(),
                stream: Stream::Scenery,
            });
        };

        let placement = &biome.scenery;
        let side = ctx.sign();
        let lateral = side * ctx.range(placement.lateral.0, placement.lateral.1);
        let vertical = ctx.range(placement.vertical.0, placement.vertical.1);
        let forward = ctx.range(placement.forward.0, placement.forward.1);
        let jitter = Vec3::new(
            ctx.symmetric(self.jitter.x),
            ctx.symmetric(self.jitter.y),
            ctx.symmetric(self.jitter.z),
        );

        let mut position = attach.transform_point(Vec3::new(lateral, vertical, forward)) + jitter;
        position.z = position.z.max(0.0);

        let id = pool.acquire(kind, Transform::new(position, attach.rotation))?;
        self.active.push(id);
        frontier.scenery_z = frontier.scenery_z.max(position.z);
        trace!(slot = id.slot(), z = position.z, "Scenery spawned");
        Ok(id)
    }

    pub fn cleanup<S: TransitionScheduler>(&mut self, pool: &mut Pool<S>, cutoff_z: f32) -> usize {
        self.active.reclaim_behind(pool, cutoff_z)
    }

    pub fn reset(&mut self) {
        self.active.clear();
    }
}
