//! Generation frontiers and the per-stream sets of live instances.

use std::fmt;

use runner_pool::{InstanceId, Pool, Transform, TransitionScheduler};
use tracing::{debug, warn};

/// The three independent spawn streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stream {
    Track,
    Scenery,
    Obstacle,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Track => "track",
            Self::Scenery => "scenery",
            Self::Obstacle => "obstacle",
        };
        f.write_str(name)
    }
}

/// Where the next piece of each stream attaches.
///
/// The track frontier is the end attach point of the furthest-forward lane of
/// the last set. The scenery frontier only tracks the furthest forward
/// coordinate reached by placed scenery.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationFrontier {
    pub track: Option<Transform>,
    pub scenery_z: f32,
}

impl GenerationFrontier {
    /// Both frontiers at `origin`.
    pub fn at(origin: Transform) -> Self {
        Self {
            track: Some(origin),
            scenery_z: origin.position.z,
        }
    }

    /// Forward coordinate of the track frontier.
    pub fn track_z(&self) -> Option<f32> {
        self.track.map(|t| t.position.z)
    }
}

/// Instances one stream currently holds on loan, oldest first.
#[derive(Clone, Debug)]
pub struct ActiveSet {
    stream: Stream,
    entries: Vec<InstanceId>,
}

impl ActiveSet {
    pub fn new(stream: Stream) -> Self {
        Self {
            stream,
            entries: Vec::new(),
        }
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }

    pub fn push(&mut self, id: InstanceId) {
        self.entries.push(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.entries.iter().copied()
    }

    /// Release every instance whose forward coordinate is below `cutoff_z`
    /// and drop it from the set. Returns how many were released.
    ///
    /// Each handle leaves the set in the same step that releases it, so an
    /// instance can never be handed back twice. Handles the pool no longer
    /// recognises are dropped with a warning.
    pub fn reclaim_behind<S: TransitionScheduler>(
        &mut self,
        pool: &mut Pool<S>,
        cutoff_z: f32,
    ) -> usize {
        let stream = self.stream;
        let mut reclaimed = 0;
        self.entries.retain(|id| match pool.transform(*id) {
            Some(t) if t.position.z >= cutoff_z => true,
            Some(_) => {
                match pool.release(*id) {
                    Ok(()) => reclaimed += 1,
                    Err(e) => warn!(%stream, slot = id.slot(), "reclaim failed: {e}"),
                }
                false
            }
            None => {
                warn!(%stream, slot = id.slot(), "dropping stale handle");
                false
            }
        });
        if reclaimed > 0 {
            debug!(%stream, reclaimed, cutoff_z, "reclaimed instances");
        }
        reclaimed
    }

    /// Release a specific set of handles and forget them.
    pub fn release_all<S: TransitionScheduler>(
        pool: &mut Pool<S>,
        ids: impl IntoIterator<Item = InstanceId>,
    ) -> usize {
        let mut released = 0;
        for id in ids {
            match pool.release(id) {
                Ok(()) => released += 1,
                Err(e) => warn!(slot = id.slot(), "rollback release failed: {e}"),
            }
        }
        released
    }

    /// Forget every handle without touching the pool.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use runner_pool::{LifecycleState, PrefabKind, PrefabTemplate};

    fn pool() -> (Pool, PrefabKind) {
        let mut pool = Pool::new();
        let kind = pool.register(PrefabTemplate::new(PrefabKind(0), "rock"), 4);
        (pool, kind)
    }

    fn at_z(z: f32) -> Transform {
        Transform::from_position(Vec3::new(0.0, 0.0, z))
    }

    #[test]
    fn test_frontier_starts_at_origin() {
        let frontier = GenerationFrontier::at(at_z(7.0));
        assert_eq!(frontier.track_z(), Some(7.0));
        assert_eq!(frontier.scenery_z, 7.0);
    }

    #[test]
    fn test_reclaim_only_behind_cutoff() {
        let (mut pool, kind) = pool();
        let mut set = ActiveSet::new(Stream::Scenery);
        let behind = pool.acquire(kind, at_z(10.0)).unwrap();
        let ahead = pool.acquire(kind, at_z(300.0)).unwrap();
        set.push(behind);
        set.push(ahead);

        assert_eq!(set.reclaim_behind(&mut pool, 100.0), 1);
        assert!(!set.contains(behind));
        assert!(set.contains(ahead));
        assert_eq!(pool.state(behind), Some(LifecycleState::Inactive));
        assert_eq!(pool.state(ahead), Some(LifecycleState::Active));
    }

    #[test]
    fn test_reclaim_twice_releases_once() {
        let (mut pool, kind) = pool();
        let mut set = ActiveSet::new(Stream::Track);
        set.push(pool.acquire(kind, at_z(0.0)).unwrap());

        assert_eq!(set.reclaim_behind(&mut pool, 50.0), 1);
        assert_eq!(set.reclaim_behind(&mut pool, 50.0), 0);
        assert_eq!(pool.stats().releases, 1);
        assert_eq!(pool.free_count(kind), 4);
    }

    #[test]
    fn test_stale_handle_is_dropped() {
        let (mut pool, kind) = pool();
        let mut set = ActiveSet::new(Stream::Obstacle);
        let id = pool.acquire(kind, at_z(0.0)).unwrap();
        set.push(id);
        pool.destroy(id).unwrap();

        assert_eq!(set.reclaim_behind(&mut pool, 50.0), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_stream_display() {
        assert_eq!(Stream::Track.to_string(), "track");
        assert_eq!(Stream::Obstacle.to_string(), "obstacle");
    }
}
