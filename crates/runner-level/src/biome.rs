//! Biomes and the manager that cycles through them.
//!
//! A biome is a themed segment of the level: which prefabs may appear, how
//! lane sets are spaced, and what the presentation layer should show while it
//! is current. The manager counts track modules and advances to the next
//! biome, wrapping around, once the current biome's quota is reached.

use runner_pool::PrefabKind;
use tracing::{debug, info};

use crate::error::LevelError;

/// Presentation hints for a biome. Opaque to generation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BiomeTheme {
    pub skybox: Option<String>,
    pub particles: Option<String>,
    pub debug_color: [f32; 4],
}

/// Ranges for background scenery offsets, relative to the track frontier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneryPlacement {
    /// Distance to either side of the track.
    pub lateral: (f32, f32),
    pub vertical: (f32, f32),
    pub forward: (f32, f32),
}

impl Default for SceneryPlacement {
    fn default() -> Self {
        Self {
            lateral: (40.0, 80.0),
            vertical: (-10.0, 20.0),
            forward: (0.0, 30.0),
        }
    }
}

/// Resolved biome definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
    pub name: String,
    pub track_kinds: Vec<PrefabKind>,
    pub scenery_kinds: Vec<PrefabKind>,
    pub obstacle_kinds: Vec<PrefabKind>,
    /// Lateral distance between adjacent lanes.
    pub lane_spacing: f32,
    /// Forward gap between a set's base and the previous frontier.
    pub set_z_spacing: f32,
    /// Drop in height applied per lane set.
    pub descent_per_set: f32,
    /// Track modules generated before switching to the next biome.
    pub transition_quota: u32,
    pub speed_multiplier: f32,
    pub scenery: SceneryPlacement,
    pub theme: BiomeTheme,
}

impl Biome {
    /// A biome with the given track kinds and default spacing.
    pub fn new(name: impl Into<String>, track_kinds: Vec<PrefabKind>) -> Self {
        Self {
            name: name.into(),
            track_kinds,
            scenery_kinds: Vec::new(),
            obstacle_kinds: Vec::new(),
            lane_spacing: 20.0,
            set_z_spacing: 50.0,
            descent_per_set: 0.5,
            transition_quota: 4,
            speed_multiplier: 1.0,
            scenery: SceneryPlacement::default(),
            theme: BiomeTheme::default(),
        }
    }

    pub fn with_quota(mut self, quota: u32) -> Self {
        self.transition_quota = quota;
        self
    }

    pub fn with_scenery(mut self, kinds: Vec<PrefabKind>) -> Self {
        self.scenery_kinds = kinds;
        self
    }

    pub fn with_obstacles(mut self, kinds: Vec<PrefabKind>) -> Self {
        self.obstacle_kinds = kinds;
        self
    }
}

/// A biome switch reported by [`BiomeManager::notify_module_spawned`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BiomeChange {
    pub from: usize,
    pub to: usize,
}

/// Notifications for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum BiomeEvent {
    /// The current biome is about to be replaced.
    WillChange { from: usize, to: usize },
    /// A biome became current, at startup, after a switch, or after a reset.
    Entered {
        index: usize,
        name: String,
        theme: BiomeTheme,
        speed_multiplier: f32,
    },
}

/// Cycles through an ordered, non-empty list of biomes.
#[derive(Debug)]
pub struct BiomeManager {
    biomes: Vec<Biome>,
    current: usize,
    modules_in_current: u32,
    events: Vec<BiomeEvent>,
}

impl BiomeManager {
    /// Build a manager starting at the first biome.
    pub fn new(biomes: Vec<Biome>) -> Result<Self, LevelError> {
        if biomes.is_empty() {
            return Err(LevelError::NoBiomes);
        }
        if let Some(b) = biomes.iter().find(|b| b.transition_quota == 0) {
            return Err(LevelError::ZeroQuota(b.name.clone()));
        }
        let mut manager = Self {
            biomes,
            current: 0,
            modules_in_current: 0,
            events: Vec::new(),
        };
        manager.push_entered();
        Ok(manager)
    }

    pub fn current(&self) -> &Biome {
        &self.biomes[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Modules generated since the current biome became current.
    pub fn modules_in_current(&self) -> u32 {
        self.modules_in_current
    }

    pub fn biomes(&self) -> &[Biome] {
        &self.biomes
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    pub fn legal_track_kinds(&self) -> &[PrefabKind] {
        &self.current().track_kinds
    }

    pub fn legal_scenery_kinds(&self) -> &[PrefabKind] {
        &self.current().scenery_kinds
    }

    pub fn legal_obstacle_kinds(&self) -> &[PrefabKind] {
        &self.current().obstacle_kinds
    }

    /// Every distinct kind any biome may spawn, in first-seen order.
    pub fn all_kinds(&self) -> Vec<PrefabKind> {
        let mut kinds = Vec::new();
        for biome in &self.biomes {
            let lists = [&biome.track_kinds, &biome.scenery_kinds, &biome.obstacle_kinds];
            for kind in lists.into_iter().flatten() {
                if !kinds.contains(kind) {
                    kinds.push(*kind);
                }
            }
        }
        kinds
    }

    /// Record one generated track module.
    ///
    /// When the quota is reached the manager emits `WillChange`, switches to
    /// the next biome (wrapping), resets the counter and emits `Entered`. With
    /// a single biome the counter resets and nothing is emitted.
    pub fn notify_module_spawned(&mut self) -> Option<BiomeChange> {
        self.modules_in_current += 1;
        if self.modules_in_current < self.current().transition_quota {
            return None;
        }
        self.modules_in_current = 0;

        let from = self.current;
        let to = (from + 1) % self.biomes.len();
        if to == from {
            debug!("Single biome '{}' quota reached, staying", self.current().name);
            return None;
        }

        self.events.push(BiomeEvent::WillChange { from, to });
        self.current = to;
        info!(
            "Biome change: '{}' -> '{}'",
            self.biomes[from].name,
            self.biomes[to].name
        );
        self.push_entered();
        Some(BiomeChange { from, to })
    }

    /// Back to the first biome with a zero counter.
    pub fn reset(&mut self) {
        self.current = 0;
        self.modules_in_current = 0;
        self.events.clear();
        self.push_entered();
    }

    /// Take every pending notification.
    pub fn drain_events(&mut self) -> Vec<BiomeEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_entered(&mut self) {
        let biome = &self.biomes[self.current];
        self.events.push(BiomeEvent::Entered {
            index: self.current,
            name: biome.name.clone(),
            theme: biome.theme.clone(),
            speed_multiplier: biome.speed_multiplier,
        });
    }
}
