//! Prefab-keyed instance pool.
//!
//! Every registered [`PrefabKind`] gets a FIFO free queue pre-warmed with
//! inactive instances. [`Pool::acquire`] loans one out and starts its enter
//! transition; [`Pool::release`] starts the exit transition, and the instance
//! only rejoins its queue when that transition completes. Instances live in a
//! flat slot vector and are addressed through generation-checked
//! [`InstanceId`] handles, so a handle kept past its loan cannot touch the
//! instance's next life.

use std::collections::VecDeque;

use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use crate::error::PoolError;
use crate::lifecycle::{Completion, LifecycleState, SpawnableElement};
use crate::scheduler::{TransitionClock, TransitionScheduler, TransitionToken};
use crate::transform::Transform;

/// Opaque identifier of a class of spawnable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefabKind(pub u32);

/// Everything the pool needs to know to create and animate instances of a kind.
#[derive(Clone, Debug, PartialEq)]
pub struct PrefabTemplate {
    /// Partition key.
    pub kind: PrefabKind,
    /// Human-readable name, for logs and the presentation layer.
    pub name: String,
    /// Local transform of the point where the next chained object begins.
    pub end_attach: Option<Transform>,
    /// Enter transition length in seconds. Zero activates immediately.
    pub spawn_duration: f32,
    /// Exit transition length in seconds. Zero returns immediately.
    pub despawn_duration: f32,
    /// Scale the enter transition starts from.
    pub enter_scale: f32,
}

impl PrefabTemplate {
    /// A template with instant transitions and no attach point.
    pub fn new(kind: PrefabKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            end_attach: None,
            spawn_duration: 0.0,
            despawn_duration: 0.0,
            enter_scale: 1.0,
        }
    }

    pub fn with_end_attach(mut self, end_attach: Transform) -> Self {
        self.end_attach = Some(end_attach);
        self
    }

    pub fn with_durations(mut self, spawn: f32, despawn: f32) -> Self {
        self.spawn_duration = spawn;
        self.despawn_duration = despawn;
        self
    }
}

/// Generation-checked handle to a pooled instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId {
    slot: u32,
    generation: u32,
}

impl InstanceId {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// One concrete object of a prefab kind.
#[derive(Clone, Debug)]
pub struct PooledInstance {
    kind: PrefabKind,
    transform: Transform,
    element: SpawnableElement,
}

impl PooledInstance {
    pub fn kind(&self) -> PrefabKind {
        self.kind
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn state(&self) -> LifecycleState {
        self.element.state()
    }

    pub fn colliders_enabled(&self) -> bool {
        self.element.colliders_enabled()
    }
}

/// Notifications for the presentation layer, drained with [`Pool::drain_events`].
#[derive(Clone, Debug, PartialEq)]
pub enum PoolEvent {
    /// An instance was placed and started its enter transition.
    Spawned {
        id: InstanceId,
        kind: PrefabKind,
        transform: Transform,
        enter_scale: f32,
        duration: f32,
    },
    /// Enter transition finished; colliders are live.
    Activated { id: InstanceId },
    /// Exit transition started; colliders are off.
    Despawning { id: InstanceId, duration: f32 },
    /// The instance is back in its free queue.
    Returned { id: InstanceId, kind: PrefabKind },
    /// The instance was destroyed and its slot retired.
    Destroyed { id: InstanceId },
}

/// Running counters, mostly for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances ever constructed (pre-warm plus on demand).
    pub created: u64,
    /// Instances constructed because a free queue was empty.
    pub created_on_demand: u64,
    /// Successful acquires.
    pub acquires: u64,
    /// Successful releases.
    pub releases: u64,
    /// Instances requeued after their exit transition.
    pub returns: u64,
    /// Completions rejected because their token was no longer pending.
    pub stale_completions: u64,
    /// Instances destroyed outside teardown.
    pub destroyed: u64,
}

struct KindPool {
    template: PrefabTemplate,
    free: VecDeque<u32>,
}

/// Fixed registry of reusable instances keyed by prefab kind.
pub struct Pool<S: TransitionScheduler = TransitionClock> {
    kinds: HashMap<PrefabKind, KindPool>,
    slots: Vec<Option<PooledInstance>>,
    scheduler: S,
    events: Vec<PoolEvent>,
    stats: PoolStats,
}

impl Pool<TransitionClock> {
    /// An empty pool driven by a [`TransitionClock`].
    pub fn new() -> Self {
        Self::with_scheduler(TransitionClock::new())
    }
}

impl Default for Pool<TransitionClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TransitionScheduler> Pool<S> {
    /// An empty pool using a custom scheduler.
    pub fn with_scheduler(scheduler: S) -> Self {
        Self {
            kinds: HashMap::new(),
            slots: Vec::new(),
            scheduler,
            events: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    /// Register a prefab and pre-warm `prewarm` inactive instances.
    ///
    /// Registering a kind twice keeps the first template and creates nothing.
    pub fn register(&mut self, template: PrefabTemplate, prewarm: u32) -> PrefabKind {
        let kind = template.kind;
        if self.kinds.contains_key(&kind) {
            debug!("Prefab '{}' already registered", template.name);
            return kind;
        }

        debug!("Registering prefab '{}' with {} instances", template.name, prewarm);
        self.kinds.insert(
            kind,
            KindPool {
                template,
                free: VecDeque::with_capacity(prewarm as usize),
            },
        );
        for _ in 0..prewarm {
            let slot = self.instantiate(kind);
            if let Some(pool) = self.kinds.get_mut(&kind) {
                pool.free.push_back(slot);
            }
        }
        kind
    }

    pub fn is_registered(&self, kind: PrefabKind) -> bool {
        self.kinds.contains_key(&kind)
    }

    pub fn template(&self, kind: PrefabKind) -> Option<&PrefabTemplate> {
        self.kinds.get(&kind).map(|p| &p.template)
    }

    /// Construct a new inactive instance. Does not enqueue it.
    fn instantiate(&mut self, kind: PrefabKind) -> u32 {
        let slot = self.slots.len() as u32;
        self.slots.push(Some(PooledInstance {
            kind,
            transform: Transform::IDENTITY,
            element: SpawnableElement::new(),
        }));
        self.stats.created += 1;
        slot
    }

    /// Loan out an instance of `kind` placed at `transform`.
    ///
    /// An empty free queue is not an error: a new instance is built on the spot
    /// and a warning logged, since it means the pre-warm size is too small.
    pub fn acquire(
        &mut self,
        kind: PrefabKind,
        transform: Transform,
    ) -> Result<InstanceId, PoolError> {
        let pool = self.kinds.get_mut(&kind).ok_or(PoolError::UnknownKind(kind))?;
        let spawn_duration = pool.template.spawn_duration;
        let enter_scale = pool.template.enter_scale;

        let slot = match pool.free.pop_front() {
            Some(slot) => slot,
            None => {
                warn!(
                    "Pool for '{}' empty, creating a new instance",
                    pool.template.name
                );
                self.stats.created_on_demand += 1;
                self.instantiate(kind)
            }
        };

        let instance = self.slots[slot as usize]
            .as_mut()
            .ok_or(PoolError::UnknownInstance(InstanceId { slot, generation: 0 }))?;
        instance.transform = transform;
        let token = instance.element.begin_spawn(slot)?;
        let id = InstanceId {
            slot,
            generation: token.generation,
        };

        self.stats.acquires += 1;
        self.events.push(PoolEvent::Spawned {
            id,
            kind,
            transform,
            enter_scale,
            duration: spawn_duration,
        });
        trace!(slot, kind = kind.0, "acquired");
        self.start(token, spawn_duration);
        Ok(id)
    }

    /// Give a loaned instance back. It rejoins the free queue when its exit
    /// transition completes.
    ///
    /// Releasing an instance that is not on loan (already returning, already
    /// pooled, or from a stale handle) is refused without touching any state.
    pub fn release(&mut self, id: InstanceId) -> Result<(), PoolError> {
        let instance = self.live_mut(id)?;
        let state = instance.element.state();
        if !state.is_on_loan() {
            warn!(slot = id.slot, ?state, "release of an instance that is not on loan");
            return Err(PoolError::NotOnLoan { id, state });
        }

        let kind = instance.kind;
        let (token, superseded) = instance.element.begin_despawn(id.slot)?;
        if let Some(superseded) = superseded {
            self.scheduler.cancel(superseded);
        }
        let duration = self
            .kinds
            .get(&kind)
            .map(|p| p.template.despawn_duration)
            .unwrap_or(0.0);

        self.stats.releases += 1;
        self.events.push(PoolEvent::Despawning { id, duration });
        trace!(slot = id.slot, kind = kind.0, "released");
        self.start(token, duration);
        Ok(())
    }

    fn start(&mut self, token: TransitionToken, duration: f32) {
        if duration > 0.0 {
            self.scheduler.schedule(duration, token);
        } else {
            self.complete_transition(token);
        }
    }

    /// Advance transition time and apply every completion that came due.
    ///
    /// Returns how many completions were applied.
    pub fn tick(&mut self, dt: f32) -> usize {
        let due = self.scheduler.advance(dt);
        due.into_iter()
            .filter(|token| self.complete_transition(*token))
            .count()
    }

    /// Deliver a transition completion for `token`.
    ///
    /// Hosts with their own tween system call this directly from the tween's
    /// completion callback. Returns `false` for a stale token: the instance was
    /// destroyed, reset, reused, or the transition was superseded.
    pub fn complete_transition(&mut self, token: TransitionToken) -> bool {
        let Some(Some(instance)) = self.slots.get_mut(token.slot as usize) else {
            self.stats.stale_completions += 1;
            return false;
        };

        let id = InstanceId {
            slot: token.slot,
            generation: token.generation,
        };
        match instance.element.complete(token) {
            Completion::Activated => {
                self.events.push(PoolEvent::Activated { id });
                true
            }
            Completion::Returned => {
                let kind = instance.kind;
                if let Some(pool) = self.kinds.get_mut(&kind) {
                    debug_assert!(
                        !pool.free.contains(&token.slot),
                        "slot {} queued twice",
                        token.slot
                    );
                    pool.free.push_back(token.slot);
                }
                self.stats.returns += 1;
                self.events.push(PoolEvent::Returned { id, kind });
                true
            }
            Completion::Stale => {
                self.stats.stale_completions += 1;
                trace!(slot = token.slot, serial = token.serial, "stale completion ignored");
                false
            }
        }
    }

    /// Destroy an instance outright, cancelling any pending transition.
    pub fn destroy(&mut self, id: InstanceId) -> Result<(), PoolError> {
        let instance = self.live_mut(id)?;
        let kind = instance.kind;
        let was_inactive = instance.element.state() == LifecycleState::Inactive;
        if let Some(pending) = instance.element.cancel() {
            self.scheduler.cancel(pending);
        }
        if was_inactive && let Some(pool) = self.kinds.get_mut(&kind) {
            pool.free.retain(|slot| *slot != id.slot);
        }
        self.slots[id.slot as usize] = None;
        self.stats.destroyed += 1;
        self.events.push(PoolEvent::Destroyed { id });
        debug!(slot = id.slot, kind = kind.0, "instance destroyed");
        Ok(())
    }

    /// Cancel every pending transition and return every instance to its free
    /// queue. Returns how many instances were pulled back.
    pub fn reset(&mut self) -> usize {
        self.scheduler.clear();
        let mut recalled = 0;
        for (slot, entry) in self.slots.iter_mut().enumerate() {
            let Some(instance) = entry else { continue };
            if instance.element.state() == LifecycleState::Inactive {
                continue;
            }
            let generation = instance.element.generation();
            instance.element.cancel();
            if let Some(pool) = self.kinds.get_mut(&instance.kind) {
                pool.free.push_back(slot as u32);
            }
            self.events.push(PoolEvent::Returned {
                id: InstanceId {
                    slot: slot as u32,
                    generation,
                },
                kind: instance.kind,
            });
            recalled += 1;
        }
        debug!("Pool reset, {} instances recalled", recalled);
        recalled
    }

    /// Destroy every instance and forget every registration.
    ///
    /// Slots are retired rather than dropped, so handles from before the
    /// teardown can never match an instance created after it.
    pub fn teardown(&mut self) {
        self.scheduler.clear();
        for entry in &mut self.slots {
            *entry = None;
        }
        self.kinds.clear();
        self.events.clear();
        debug!("Pool torn down");
    }

    fn live_mut(&mut self, id: InstanceId) -> Result<&mut PooledInstance, PoolError> {
        let instance = self
            .slots
            .get_mut(id.slot as usize)
            .and_then(Option::as_mut)
            .ok_or(PoolError::UnknownInstance(id))?;
        if instance.element.generation() != id.generation {
            return Err(PoolError::StaleHandle(id));
        }
        Ok(instance)
    }

    /// The instance behind a handle, if the handle is still current.
    pub fn get(&self, id: InstanceId) -> Option<&PooledInstance> {
        self.slots
            .get(id.slot as usize)
            .and_then(Option::as_ref)
            .filter(|i| i.element.generation() == id.generation)
    }

    pub fn transform(&self, id: InstanceId) -> Option<Transform> {
        self.get(id).map(|i| i.transform)
    }

    pub fn state(&self, id: InstanceId) -> Option<LifecycleState> {
        self.get(id).map(|i| i.element.state())
    }

    /// World transform of the instance's end attach point, if its prefab has one.
    pub fn end_attach(&self, id: InstanceId) -> Option<Transform> {
        let instance = self.get(id)?;
        let local = self.kinds.get(&instance.kind)?.template.end_attach?;
        Some(instance.transform.compose(&local))
    }

    /// Instances waiting in the free queue of `kind`.
    pub fn free_count(&self, kind: PrefabKind) -> usize {
        self.kinds.get(&kind).map_or(0, |p| p.free.len())
    }

    /// Instances currently on loan across all kinds.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|i| i.element.state().is_on_loan())
            .count()
    }

    /// Live instances across all kinds, in any state.
    pub fn instance_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn pending_transitions(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }
}
