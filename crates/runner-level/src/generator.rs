//! The level generator: decides when to extend the level and when to
//! reclaim what the player has left behind.
//!
//! A section is one lane set followed by its scenery and obstacles, after
//! which the biome manager is told one more module exists. Sections are
//! generated when the track frontier comes within `generation_threshold` of
//! the player (polling cadence) or when the host reports that the player hit
//! a lane-end trigger (trigger cadence).

use glam::Vec3;
use runner_config::{Cadence, Config, GenerationConfig, PoolConfig};
use runner_pool::{Pool, PoolEvent, PrefabKind, Transform};
use tracing::{debug, error, info, warn};

use crate::biome::{BiomeChange, BiomeEvent, BiomeManager};
use crate::catalog::PrefabCatalog;
use crate::context::GenerationContext;
use crate::error::{GenerationError, LevelError};
use crate::frontier::GenerationFrontier;
use crate::obstacles::ObstacleSpawner;
use crate::scenery::ScenerySpawner;
use crate::track::TrackSpawner;

/// Distance and cadence knobs.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorSettings {
    pub generation_threshold: f32,
    pub cleanup_distance: f32,
    pub cleanup_interval_ticks: u32,
    pub initial_sections_max: u32,
    pub sceneries_per_set: u32,
    pub cadence: Cadence,
}

impl From<&GenerationConfig> for GeneratorSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            generation_threshold: config.generation_threshold,
            cleanup_distance: config.cleanup_distance,
            cleanup_interval_ticks: config.cleanup_interval_ticks.max(1),
            initial_sections_max: config.initial_sections_max,
            sceneries_per_set: config.sceneries_per_set,
            cadence: config.cadence,
        }
    }
}

/// Whether the generator still produces content.
#[derive(Clone, Debug, PartialEq)]
pub enum GeneratorState {
    Running,
    /// A content or configuration error stopped generation. Cleanup and
    /// transitions keep running.
    Halted(String),
}

/// What one generated section contained.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SectionReport {
    pub frontier: Transform,
    pub lanes: usize,
    pub scenery: usize,
    pub obstacles: usize,
    pub biome_change: Option<BiomeChange>,
}

/// What one call to [`LevelGenerator::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
    pub section: Option<SectionReport>,
    pub reclaimed: usize,
    pub completions: usize,
}

/// Drives the track, scenery and obstacle streams from the player's position.
pub struct LevelGenerator {
    settings: GeneratorSettings,
    origin: Transform,
    catalog: PrefabCatalog,
    biomes: BiomeManager,
    pool: Pool,
    track: TrackSpawner,
    scenery: ScenerySpawner,
    obstacles: ObstacleSpawner,
    frontier: GenerationFrontier,
    ctx: GenerationContext,
    state: GeneratorState,
    ticks: u64,
    sections: u64,
}

impl LevelGenerator {
    /// Validate `config` and build every part of the generator, pre-warming
    /// the pool for every kind any biome can spawn.
    pub fn new(config: &Config) -> Result<Self, LevelError> {
        config.validate()?;
        let catalog = PrefabCatalog::from_config(&config.prefabs, &config.transitions)?;
        let biomes = BiomeManager::new(catalog.build_biomes(&config.biomes)?)?;

        let mut pool = Pool::new();
        for kind in biomes.all_kinds() {
            let Some(template) = catalog.template(kind) else {
                continue;
            };
            let prewarm = prewarm_size(&biomes, kind, &config.pool);
            pool.register(template.clone(), prewarm);
        }

        let origin = Transform::from_position(Vec3::from_array(config.track.origin));
        let mut ctx = GenerationContext::seeded(config.generation.seed);
        ctx.set_speed_multiplier(biomes.current().speed_multiplier);

        info!(
            "Level generator ready: {} prefabs, {} biomes, {} pooled instances, seed {}",
            catalog.len(),
            biomes.len(),
            pool.instance_count(),
            config.generation.seed
        );

        Ok(Self {
            settings: GeneratorSettings::from(&config.generation),
            origin,
            catalog,
            biomes,
            pool,
            track: TrackSpawner::from_config(&config.track),
            scenery: ScenerySpawner::from_config(&config.scenery),
            obstacles: ObstacleSpawner::from_config(&config.obstacles),
            frontier: GenerationFrontier::at(origin),
            ctx,
            state: GeneratorState::Running,
            ticks: 0,
            sections: 0,
        })
    }

    /// Generate the initial stretch of level ahead of `player_z`.
    ///
    /// Uses the same check as polling, repeated until the horizon is covered
    /// or `initial_sections_max` sections exist. Returns how many were built.
    pub fn start(&mut self, player_z: f32) -> u32 {
        let mut built = 0;
        while built < self.settings.initial_sections_max && self.needs_section(player_z) {
            if self.generate_section().is_err() {
                break;
            }
            built += 1;
        }
        info!(
            "Initial level: {} sections, frontier at z={:.1}",
            built,
            self.frontier_z()
        );
        built
    }

    /// One simulation step.
    pub fn tick(&mut self, player_z: f32, dt: f32) -> TickReport {
        let mut report = TickReport {
            completions: self.pool.tick(dt),
            ..TickReport::default()
        };
        self.ticks += 1;

        if self.settings.cadence == Cadence::Polling && self.needs_section(player_z) {
            report.section = self.generate_section().ok();
        }
        if self.ticks % u64::from(self.settings.cleanup_interval_ticks) == 0 {
            report.reclaimed = self.cleanup(player_z);
        }
        report
    }

    /// The player reached the end of a lane. Only acts under trigger cadence.
    pub fn on_lane_end_trigger(&mut self) -> Option<SectionReport> {
        if self.settings.cadence != Cadence::Trigger {
            warn!("Lane-end trigger ignored: generator uses polling cadence");
            return None;
        }
        self.generate_section().ok()
    }

    /// Generate one section: track, then scenery, then obstacles, then the
    /// biome notification.
    pub fn generate_section(&mut self) -> Result<SectionReport, GenerationError> {
        if let GeneratorState::Halted(reason) = &self.state {
            return Err(GenerationError::Halted(reason.clone()));
        }

        let biome = self.biomes.current();
        let frontier = match self.track.spawn_next_track_set(
            &mut self.frontier,
            biome,
            &mut self.pool,
            &mut self.ctx,
        ) {
            Ok(frontier) => frontier,
            Err(e) => return Err(self.fail(e)),
        };
        let lanes = self.track.last_set().map_or(0, |set| set.lanes.len());

        let mut scenery = 0;
        for _ in 0..self.settings.sceneries_per_set {
            match self.scenery.spawn_next_scenery(
                &mut self.frontier,
                biome,
                &mut self.pool,
                &mut self.ctx,
            ) {
                Ok(_) => scenery += 1,
                Err(e) => {
                    debug!("Scenery skipped: {e}");
                    break;
                }
            }
        }

        let obstacles = match self.track.last_set() {
            Some(set) => self
                .obstacles
                .populate(set, biome, &mut self.pool, &mut self.ctx)
                .unwrap_or_else(|e| {
                    warn!("Obstacle placement failed: {e}");
                    0
                }),
            None => 0,
        };

        let biome_change = self.biomes.notify_module_spawned();
        if biome_change.is_some() {
            self.ctx
                .set_speed_multiplier(self.biomes.current().speed_multiplier);
        }
        self.sections += 1;

        Ok(SectionReport {
            frontier,
            lanes,
            scenery,
            obstacles,
            biome_change,
        })
    }

    /// Release every instance more than `cleanup_distance` behind the player.
    pub fn cleanup(&mut self, player_z: f32) -> usize {
        let cutoff = player_z - self.settings.cleanup_distance;
        self.track.cleanup(&mut self.pool, cutoff)
            + self.scenery.cleanup(&mut self.pool, cutoff)
            + self.obstacles.cleanup(&mut self.pool, cutoff)
    }

    /// Return everything to the pool and start the level over from the
    /// origin, the first biome and the start of the random sequence.
    pub fn reset(&mut self) {
        let recalled = self.pool.reset();
        self.track.reset(self.origin.position.y);
        self.scenery.reset();
        self.obstacles.reset();
        self.frontier = GenerationFrontier::at(self.origin);
        self.biomes.reset();
        self.ctx.reseed();
        self.ctx
            .set_speed_multiplier(self.biomes.current().speed_multiplier);
        self.state = GeneratorState::Running;
        self.ticks = 0;
        self.sections = 0;
        info!("Level reset, {} instances recalled", recalled);
    }

    fn needs_section(&self, player_z: f32) -> bool {
        self.state == GeneratorState::Running
            && self.frontier_z() - player_z < self.settings.generation_threshold
    }

    fn fail(&mut self, err: GenerationError) -> GenerationError {
        if err.halts_generation() {
            error!("Generation halted: {err}");
            self.state = GeneratorState::Halted(err.to_string());
        } else {
            warn!("Section not generated, will retry: {err}");
        }
        err
    }

    /// Forward coordinate of the track frontier.
    pub fn frontier_z(&self) -> f32 {
        self.frontier.track_z().unwrap_or(self.origin.position.z)
    }

    pub fn frontier(&self) -> &GenerationFrontier {
        &self.frontier
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &PrefabCatalog {
        &self.catalog
    }

    pub fn biomes(&self) -> &BiomeManager {
        &self.biomes
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn track(&self) -> &TrackSpawner {
        &self.track
    }

    pub fn scenery(&self) -> &ScenerySpawner {
        &self.scenery
    }

    pub fn obstacles(&self) -> &ObstacleSpawner {
        &self.obstacles
    }

    pub fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    pub fn state(&self) -> &GeneratorState {
        &self.state
    }

    pub fn sections_generated(&self) -> u64 {
        self.sections
    }

    pub fn drain_biome_events(&mut self) -> Vec<BiomeEvent> {
        self.biomes.drain_events()
    }

    pub fn drain_pool_events(&mut self) -> Vec<PoolEvent> {
        self.pool.drain_events()
    }
}

/// Pre-warm size for `kind`, by the first role any biome gives it.
fn prewarm_size(biomes: &BiomeManager, kind: PrefabKind, sizes: &PoolConfig) -> u32 {
    let all = biomes.biomes();
    if all.iter().any(|b| b.track_kinds.contains(&kind)) {
        sizes.track_prewarm
    } else if all.iter().any(|b| b.scenery_kinds.contains(&kind)) {
        sizes.scenery_prewarm
    } else {
        sizes.obstacle_prewarm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_config::{AttachConfig, BiomeConfig, PrefabConfig};
    use runner_pool::LifecycleState;

    fn instant(mut config: Config) -> Config {
        config.transitions.spawn_duration = 0.0;
        config.transitions.despawn_duration = 0.0;
        config
    }

    #[test]
    fn test_new_prewarms_every_kind() {
        let config = Config::default();
        let generator = LevelGenerator::new(&config).unwrap();
        let pool = generator.pool();
        let straight = generator.catalog().lookup("track_straight").unwrap();
        let tree = generator.catalog().lookup("tree_cluster").unwrap();
        let spike = generator.catalog().lookup("spike").unwrap();
        assert_eq!(pool.free_count(straight), config.pool.track_prewarm as usize);
        assert_eq!(pool.free_count(tree), config.pool.scenery_prewarm as usize);
        assert_eq!(pool.free_count(spike), config.pool.obstacle_prewarm as usize);
        assert_eq!(generator.state(), &GeneratorState::Running);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.biomes.clear();
        assert!(matches!(LevelGenerator::new(&config), Err(LevelError::Config(_))));
    }

    #[test]
    fn test_start_covers_horizon() {
        let mut generator = LevelGenerator::new(&Config::default()).unwrap();
        let built = generator.start(0.0);
        assert!(built > 0);
        assert!(generator.frontier_z() >= generator.settings().generation_threshold);
        assert_eq!(generator.sections_generated(), u64::from(built));
    }

    #[test]
    fn test_start_respects_section_cap() {
        let mut config = Config::default();
        config.generation.initial_sections_max = 2;
        config.generation.generation_threshold = 10_000.0;
        let mut generator = LevelGenerator::new(&config).unwrap();
        assert_eq!(generator.start(0.0), 2);
    }

    #[test]
    fn test_tick_generates_when_frontier_close() {
        let mut generator = LevelGenerator::new(&Config::default()).unwrap();
        generator.start(0.0);
        let before = generator.frontier_z();

        let far = generator.tick(before - 500.0, 0.016);
        assert!(far.section.is_none());

        let near = generator.tick(before - 10.0, 0.016);
        let section = near.section.unwrap();
        assert!(section.frontier.position.z > before);
        assert_eq!(section.lanes, 3);
    }

    #[test]
    fn test_cleanup_reclaims_behind_player() {
        let mut generator = LevelGenerator::new(&instant(Config::default())).unwrap();
        generator.start(0.0);
        let on_loan = generator.pool().active_count();
        assert!(on_loan > 0);

        let reclaimed = generator.cleanup(10_000.0);
        assert_eq!(reclaimed, on_loan);
        assert_eq!(generator.pool().active_count(), 0);
        assert!(generator.track().active().is_empty());
        assert!(generator.scenery().active().is_empty());
        assert!(generator.obstacles().active().is_empty());
        // Reclaiming again touches nothing.
        assert_eq!(generator.cleanup(10_000.0), 0);
        assert_eq!(generator.pool().stats().releases as usize, on_loan);
    }

    #[test]
    fn test_trigger_ignored_under_polling() {
        let mut generator = LevelGenerator::new(&Config::default()).unwrap();
        assert!(generator.on_lane_end_trigger().is_none());
        assert_eq!(generator.sections_generated(), 0);
    }

    #[test]
    fn test_trigger_cadence() {
        let mut config = Config::default();
        config.generation.cadence = Cadence::Trigger;
        let mut generator = LevelGenerator::new(&config).unwrap();
        generator.start(0.0);
        let before = generator.sections_generated();

        // Polling is off: a close frontier does not generate on its own.
        let report = generator.tick(generator.frontier_z(), 0.016);
        assert!(report.section.is_none());

        assert!(generator.on_lane_end_trigger().is_some());
        assert_eq!(generator.sections_generated(), before + 1);
    }

    #[test]
    fn test_missing_attach_point_halts() {
        let mut config = Config::default();
        config.prefabs.push(PrefabConfig {
            name: "broken".to_string(),
            end_attach: None,
            spawn_duration: None,
            despawn_duration: None,
        });
        config.biomes[0].tracks = vec!["broken".to_string()];
        let mut generator = LevelGenerator::new(&instant(config)).unwrap();

        assert_eq!(generator.start(0.0), 0);
        assert!(matches!(generator.state(), GeneratorState::Halted(_)));
        assert_eq!(generator.frontier_z(), 0.0);
        assert_eq!(generator.pool().active_count(), 0);

        // Halted generators still tick.
        let report = generator.tick(0.0, 0.016);
        assert!(report.section.is_none());
        assert!(matches!(
            generator.generate_section(),
            Err(GenerationError::Halted(_))
        ));
    }

    #[test]
    fn test_desync_retries() {
        let mut config = Config::default();
        config.prefabs.push(PrefabConfig {
            name: "backwards".to_string(),
            end_attach: Some(AttachConfig {
                position: [0.0, 0.0, -100.0],
                yaw_degrees: 0.0,
            }),
            spawn_duration: None,
            despawn_duration: None,
        });
        config.biomes[0].tracks = vec!["backwards".to_string()];
        let mut generator = LevelGenerator::new(&config).unwrap();

        generator.tick(0.0, 0.016);
        assert_eq!(generator.state(), &GeneratorState::Running);
        assert_eq!(generator.sections_generated(), 0);
    }

    #[test]
    fn test_biome_without_scenery_still_generates() {
        let mut config = Config::default();
        config.biomes = vec![BiomeConfig {
            name: "Bare".to_string(),
            tracks: vec!["track_straight".to_string()],
            ..BiomeConfig::default()
        }];
        let mut generator = LevelGenerator::new(&config).unwrap();
        let section = generator.generate_section().unwrap();
        assert_eq!(section.scenery, 0);
        assert_eq!(section.obstacles, 0);
        assert_eq!(section.lanes, 3);
    }

    #[test]
    fn test_speed_multiplier_follows_biome() {
        let mut generator = LevelGenerator::new(&Config::default()).unwrap();
        assert_eq!(generator.context().speed_multiplier(), 1.0);
        for _ in 0..10 {
            generator.generate_section().unwrap();
        }
        assert_eq!(generator.biomes().current().name, "Frost Canyon");
        assert_eq!(generator.context().speed_multiplier(), 1.2);
    }

    #[test]
    fn test_reset_replays_same_level() {
        let mut generator = LevelGenerator::new(&instant(Config::default())).unwrap();
        generator.start(0.0);
        let first: Vec<_> = generator
            .drain_pool_events()
            .into_iter()
            .filter_map(|e| match e {
                PoolEvent::Spawned { transform, .. } => Some(transform),
                _ => None,
            })
            .collect();

        generator.reset();
        assert_eq!(generator.pool().active_count(), 0);
        assert_eq!(generator.biomes().current_index(), 0);
        assert_eq!(generator.frontier_z(), 0.0);
        generator.drain_pool_events();

        generator.start(0.0);
        let second: Vec<_> = generator
            .drain_pool_events()
            .into_iter()
            .filter_map(|e| match e {
                PoolEvent::Spawned { transform, .. } => Some(transform),
                _ => None,
            })
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_mid_transition() {
        let mut generator = LevelGenerator::new(&Config::default()).unwrap();
        generator.start(0.0);
        let lane = generator.track().active().iter().next().unwrap();
        assert_eq!(generator.pool().state(lane), Some(LifecycleState::SpawningIn));

        generator.reset();
        assert_eq!(generator.pool().pending_transitions(), 0);
        assert_eq!(generator.pool().state(lane), Some(LifecycleState::Inactive));
        // Late completions are ignored.
        generator.tick(0.0, 5.0);
        assert_eq!(generator.pool().stats().returns, 0);
    }
}
