//! Parallel lane sets chained end to end.
//!
//! Each call places `parallel_track_count` lanes side by side at a shared
//! height, one set spacing ahead of the current frontier with some lateral
//! jitter. The end attach point of the furthest-forward lane becomes the new
//! frontier. A set that cannot produce a valid frontier is rolled back.

use runner_config::TrackConfig;
use runner_pool::{InstanceId, Pool, PrefabKind, Transform, TransitionScheduler};
use tracing::{debug, error, warn};

use crate::biome::Biome;
use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::frontier::{ActiveSet, GenerationFrontier, Stream};

/// One committed lane set.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneSet {
    /// Lanes from left to right.
    pub lanes: Vec<InstanceId>,
    /// Base transform of the set before lateral lane offsets.
    pub base: Transform,
    /// Frontier the set produced.
    pub frontier: Transform,
}

/// Spawns lane sets and owns the track stream's live instances.
#[derive(Clone, Debug)]
pub struct TrackSpawner {
    parallel_track_count: u32,
    jitter: (f32, f32),
    anchor_y: f32,
    descent: f32,
    active: ActiveSet,
    last_set: Option<LaneSet>,
}

impl TrackSpawner {
    /// `anchor_y` is the height descent is measured from.
    pub fn new(parallel_track_count: u32, jitter_min: f32, jitter_max: f32, anchor_y: f32) -> Self {
        Self {
            parallel_track_count: parallel_track_count.max(1),
            jitter: (jitter_min, jitter_max),
            anchor_y,
            descent: 0.0,
            active: ActiveSet::new(Stream::Track),
            last_set: None,
        }
    }

    pub fn from_config(config: &TrackConfig) -> Self {
        Self::new(
            config.parallel_track_count,
            config.lateral_jitter_min,
            config.lateral_jitter_max,
            config.origin[1],
        )
    }

    pub fn parallel_track_count(&self) -> u32 {
        self.parallel_track_count
    }

    /// Index of the lane that sits on the set's base.
    pub fn center_index(&self) -> u32 {
        self.parallel_track_count / 2
    }

    /// Total drop applied so far.
    pub fn descent(&self) -> f32 {
        self.descent
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// The most recently committed set.
    pub fn last_set(&self) -> Option<&LaneSet> {
        self.last_set.as_ref()
    }

    /// Place the next lane set and advance `frontier.track`.
    ///
    /// On error nothing is left on loan and neither the frontier nor the
    /// descent changes.
    pub fn spawn_next_track_set<S: TransitionScheduler>(
        &mut self,
        frontier: &mut GenerationFrontier,
        biome: &Biome,
        pool: &mut Pool<S>,
        ctx: &mut GenerationContext,
    ) -> Result<Transform, GenerationError> {
        let Some(attach) = frontier.track else {
            error!("No track frontier to extend");
            return Err(GenerationError::MissingFrontier);
        };
        if biome.track_kinds.is_empty() {
            error!("Biome '{}' has no track prefabs", biome.name);
            return Err(GenerationError::NoPrefabs {
                biome: biome.name.clone(),
                stream: Stream::Track,
            });
        }

        let forward = attach.forward();
        let right = attach.right();
        let jitter = ctx.range(self.jitter.0, self.jitter.1);
        let descent = self.descent + biome.descent_per_set;

        let mut base_position = attach.position + forward * biome.set_z_spacing + right * jitter;
        base_position.y = self.anchor_y - descent;
        let base = Transform::new(base_position, attach.rotation);

        let center = self.center_index() as i32;
        let mut lanes = Vec::with_capacity(self.parallel_track_count as usize);
        let mut kinds: Vec<PrefabKind> = Vec::with_capacity(lanes.capacity());
        for i in 0..self.parallel_track_count as i32 {
            let Some(&kind) = ctx.pick(&biome.track_kinds) else {
                break;
            };
            let mut position = base.position + right * ((i - center) as f32 * biome.lane_spacing);
            position.y = base.position.y;
            match pool.acquire(kind, Transform::new(position, base.rotation)) {
                Ok(id) => {
                    lanes.push(id);
                    kinds.push(kind);
                }
                Err(e) => {
                    ActiveSet::release_all(pool, lanes);
                    return Err(e.into());
                }
            }
        }

        // Furthest forward wins; the first lane wins ties.
        let best = lanes
            .iter()
            .filter_map(|id| pool.end_attach(*id))
            .reduce(|best, t| if t.position.z > best.position.z { t } else { best });
        let Some(next) = best else {
            ActiveSet::release_all(pool, lanes);
            error!("Lane set in '{}' has no end attach point", biome.name);
            return Err(GenerationError::MissingAttachPoint { kinds });
        };
        if next.position.z <= attach.position.z {
            ActiveSet::release_all(pool, lanes);
            warn!(
                previous = attach.position.z,
                candidate = next.position.z,
                "Track frontier would not advance, set rolled back"
            );
            return Err(GenerationError::FrontierDesync {
                previous: attach.position.z,
                candidate: next.position.z,
            });
        }

        self.descent = descent;
        for id in &lanes {
            self.active.push(*id);
        }
        frontier.track = Some(next);
        debug!(
            lanes = lanes.len(),
            base_z = base.position.z,
            frontier_z = next.position.z,
            "Lane set spawned"
        );
        self.last_set = Some(LaneSet {
            lanes,
            base,
            frontier: next,
        });
        Ok(next)
    }

    /// Release every lane behind `cutoff_z`.
    pub fn cleanup<S: TransitionScheduler>(&mut self, pool: &mut Pool<S>, cutoff_z: f32) -> usize {
        self.active.reclaim_behind(pool, cutoff_z)
    }

    /// Forget all lanes and restart descent from `anchor_y`. Instances are
    /// recalled by the pool's own reset.
    pub fn reset(&mut self, anchor_y: f32) {
        self.anchor_y = anchor_y;
        self.active.clear();
        self.last_set = None;
        self.descent = 0.0;
    }
}
