//! Obstacles scattered along freshly placed lanes.
//!
//! Each lane is walked from its start to its end attach point in random
//! steps; at every stop an obstacle is placed with a fixed probability.

use runner_config::ObstacleConfig;
use runner_pool::{Pool, Transform, TransitionScheduler};
use tracing::trace;

use crate::biome::Biome;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::frontier::{ActiveSet, Stream};
use crate::track::LaneSet;

const MIN_STEP: f32 = 0.1;

/// Populates lane sets with obstacles and owns the obstacle stream.
#[derive(Clone, Debug)]
pub struct ObstacleSpawner {
    spawn_probability: f32,
    min_spacing: f32,
    max_spacing: f32,
    active: ActiveSet,
}

impl ObstacleSpawner {
    pub fn new(spawn_probability: f32, min_spacing: f32, max_spacing: f32) -> Self {
        let min_spacing = min_spacing.max(MIN_STEP);
        Self {
            spawn_probability: spawn_probability.clamp(0.0, 1.0),
            min_spacing,
            max_spacing: max_spacing.max(min_spacing),
            active: ActiveSet::new(Stream::Obstacle),
        }
    }

    pub fn from_config(config: &ObstacleConfig) -> Self {
        Self::new(
            config.spawn_probability,
            config.min_spacing,
            config.max_spacing,
        )
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// Walk every lane of `set` and place obstacles. Returns how many were
    /// placed. A biome without obstacle prefabs places nothing.
    pub fn populate<S: TransitionScheduler>(
        &mut self,
        set: &LaneSet,
        biome: &Biome,
        pool: &mut Pool<S>,
        ctx: &mut GenerationContext,
    ) -> Result<usize, GenerationError> {
        if biome.obstacle_kinds.is_empty() || self.spawn_probability <= 0.0 {
            return Ok(0);
        }

        let mut placed = 0;
        for lane in &set.lanes {
            let (Some(start), Some(end)) = (pool.transform(*lane), pool.end_attach(*lane)) else {
                continue;
            };
            let length = start.position.distance(end.position);
            if length <= f32::EPSILON {
                continue;
            }

            let mut along = 0.0;
            while along < length {
                if ctx.chance(self.spawn_probability)
                    && let Some(&kind) = ctx.pick(&biome.obstacle_kinds)
                {
                    let position = start.position.lerp(end.position, along / length);
                    let id = pool.acquire(kind, Transform::new(position, start.rotation))?;
                    self.active.push(id);
                    placed += 1;
                }
                along += ctx.range(self.min_spacing, self.max_spacing);
            }
        }
        trace!(placed, "Obstacles placed");
        Ok(placed)
    }

    pub fn cleanup<S: TransitionScheduler>(&mut self, pool: &mut Pool<S>, cutoff_z: f32) -> usize {
        self.active.reclaim_behind(pool, cutoff_z)
    }

    pub fn reset(&mut self) {
        self.active.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::GenerationFrontier;
    use crate::track::TrackSpawner;
    use glam::Vec3;
    use runner_pool::{PrefabKind, PrefabTemplate};

    fn lane_set(pool: &mut Pool, biome: &Biome, ctx: &mut GenerationContext) -> LaneSet {
        let mut track = TrackSpawner::new(3, 0.0, 0.0, 0.0);
        let mut frontier = GenerationFrontier::at(Transform::IDENTITY);
        track
            .spawn_next_track_set(&mut frontier, biome, pool, ctx)
            .unwrap();
        track.last_set().cloned().unwrap()
    }

    fn setup() -> (Pool, Biome) {
        let mut pool = Pool::new();
        let lane = pool.register(
            PrefabTemplate::new(PrefabKind(0), "straight")
                .with_end_attach(Transform::from_position(Vec3::new(0.0, 0.0, 40.0))),
            6,
        );
        let spike = pool.register(PrefabTemplate::new(PrefabKind(1), "spike"), 8);
        let mut biome = Biome::new("Meadow", vec![lane]).with_obstacles(vec![spike]);
        biome.set_z_spacing = 10.0;
        (pool, biome)
    }

    #[test]
    fn test_obstacles_lie_on_lanes() {
        let (mut pool, biome) = setup();
        let mut ctx = GenerationContext::seeded(4);
        let set = lane_set(&mut pool, &biome, &mut ctx);
        let mut spawner = ObstacleSpawner::new(1.0, 5.0, 5.0);

        let placed = spawner.populate(&set, &biome, &mut pool, &mut ctx).unwrap();
        // Stops at 0, 5, ..., 35 on each of three lanes.
        assert_eq!(placed, 24);
        let lane_xs: Vec<f32> = set
            .lanes
            .iter()
            .map(|id| pool.transform(*id).unwrap().position.x)
            .collect();
        for id in spawner.active().iter() {
            let p = pool.transform(id).unwrap().position;
            assert!(lane_xs.contains(&p.x), "obstacle off lane at {p:?}");
            assert!((10.0..50.0).contains(&p.z));
        }
    }

    #[test]
    fn test_zero_probability_places_nothing() {
        let (mut pool, biome) = setup();
        let mut ctx = GenerationContext::seeded(4);
        let set = lane_set(&mut pool, &biome, &mut ctx);
        let mut spawner = ObstacleSpawner::new(0.0, 5.0, 15.0);
        assert_eq!(spawner.populate(&set, &biome, &mut pool, &mut ctx).unwrap(), 0);
    }

    #[test]
    fn test_biome_without_obstacles() {
        let (mut pool, mut biome) = setup();
        biome.obstacle_kinds.clear();
        let mut ctx = GenerationContext::seeded(4);
        let set = lane_set(&mut pool, &biome, &mut ctx);
        let mut spawner = ObstacleSpawner::new(1.0, 5.0, 15.0);
        assert_eq!(spawner.populate(&set, &biome, &mut pool, &mut ctx).unwrap(), 0);
        assert!(spawner.active().is_empty());
    }

    #[test]
    fn test_spacing_is_clamped() {
        let spawner = ObstacleSpawner::new(2.0, 0.0, -1.0);
        assert_eq!(spawner.spawn_probability, 1.0);
        assert_eq!(spawner.min_spacing, MIN_STEP);
        assert_eq!(spawner.max_spacing, MIN_STEP);
    }
}
