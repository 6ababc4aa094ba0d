//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "runner.ron";

/// Top-level runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Generation cadence and distances.
    pub generation: GenerationConfig,
    /// Parallel lane layout.
    pub track: TrackConfig,
    /// Background scenery placement.
    pub scenery: SceneryConfig,
    /// Lane obstacle placement.
    pub obstacles: ObstacleConfig,
    /// Pool pre-warm sizes.
    pub pool: PoolConfig,
    /// Default enter/exit transition timings.
    pub transitions: TransitionConfig,
    /// Every prefab the pool may instantiate.
    pub prefabs: Vec<PrefabConfig>,
    /// Biomes in cycle order.
    pub biomes: Vec<BiomeConfig>,
    /// Headless simulation settings.
    pub simulation: SimulationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// How the level generator decides to extend the world.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum Cadence {
    /// Poll player distance to the frontier every tick.
    #[default]
    Polling,
    /// Generate only when the player crosses a lane-end trigger.
    Trigger,
}

/// Generation cadence and distances.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Generate a new section when the frontier is closer than this to the player.
    pub generation_threshold: f32,
    /// Reclaim instances further than this behind the player.
    pub cleanup_distance: f32,
    /// Ticks between two cleanup scans (1 = every tick).
    pub cleanup_interval_ticks: u32,
    /// Upper bound on sections generated synchronously at startup.
    pub initial_sections_max: u32,
    /// Scenery instances placed per lane set.
    pub sceneries_per_set: u32,
    /// Generation trigger model.
    pub cadence: Cadence,
    /// Seed for the generation RNG.
    pub seed: u64,
}

/// Parallel lane layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackConfig {
    /// Lanes per set. Odd counts keep one lane centred.
    pub parallel_track_count: u32,
    /// Lower bound of the per-set lateral wander.
    pub lateral_jitter_min: f32,
    /// Upper bound of the per-set lateral wander.
    pub lateral_jitter_max: f32,
    /// World position of the initial track frontier.
    pub origin: [f32; 3],
}

/// Background scenery placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneryConfig {
    /// Symmetric random jitter applied per axis (x, y, z).
    pub jitter: [f32; 3],
}

/// Lane obstacle placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Probability of placing an obstacle at each candidate step, in `[0.0, 1.0]`.
    pub spawn_probability: f32,
    /// Minimum distance between two candidate steps.
    pub min_spacing: f32,
    /// Maximum distance between two candidate steps.
    pub max_spacing: f32,
}

/// Pool pre-warm sizes per prefab kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances created up front for each track kind.
    pub track_prewarm: u32,
    /// Instances created up front for each scenery kind.
    pub scenery_prewarm: u32,
    /// Instances created up front for each obstacle kind.
    pub obstacle_prewarm: u32,
}

/// Default enter/exit transition timings, overridable per prefab.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransitionConfig {
    /// Enter transition length in seconds.
    pub spawn_duration: f32,
    /// Exit transition length in seconds.
    pub despawn_duration: f32,
    /// Scale the enter transition starts from, relative to the base scale.
    pub enter_scale: f32,
}

/// Local transform of a prefab's end attach point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttachConfig {
    /// Offset from the prefab origin.
    pub position: [f32; 3],
    /// Rotation around the up axis, in degrees.
    #[serde(default)]
    pub yaw_degrees: f32,
}

/// One prefab the pool may instantiate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrefabConfig {
    /// Unique prefab name referenced by biomes.
    pub name: String,
    /// Where the next chained object begins. Required for track prefabs.
    #[serde(default)]
    pub end_attach: Option<AttachConfig>,
    /// Enter transition override in seconds.
    #[serde(default)]
    pub spawn_duration: Option<f32>,
    /// Exit transition override in seconds.
    #[serde(default)]
    pub despawn_duration: Option<f32>,
}

/// A themed configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BiomeConfig {
    /// Display name shown when the biome starts.
    pub name: String,
    /// Banner/debug colour (RGBA).
    pub debug_color: [f32; 4],
    /// Legal track prefab names.
    pub tracks: Vec<String>,
    /// Legal scenery prefab names.
    pub scenery: Vec<String>,
    /// Legal obstacle prefab names.
    pub obstacles: Vec<String>,
    /// Horizontal spacing between parallel lanes.
    pub lane_spacing: f32,
    /// Forward gap between the previous frontier and the next lane set.
    pub set_z_spacing: f32,
    /// Height lost per generated set.
    pub descent_per_set: f32,
    /// Skybox asset name handed to the presentation layer.
    pub skybox: Option<String>,
    /// Ambient particle asset name handed to the presentation layer.
    pub particles: Option<String>,
    /// Modules generated before switching to the next biome.
    pub modules_before_transition: u32,
    /// Player speed multiplier while this biome is current.
    pub speed_multiplier: f32,
    /// Lateral distance range of scenery from the track frontier.
    pub scenery_lateral: [f32; 2],
    /// Vertical offset range of scenery.
    pub scenery_vertical: [f32; 2],
    /// Forward offset range of scenery.
    pub scenery_forward: [f32; 2],
}

/// Headless simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base player speed in units per second.
    pub player_speed: f32,
    /// Fixed tick length in seconds.
    pub tick_seconds: f32,
    /// Number of ticks to simulate.
    pub ticks: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            track: TrackConfig::default(),
            scenery: SceneryConfig::default(),
            obstacles: ObstacleConfig::default(),
            pool: PoolConfig::default(),
            transitions: TransitionConfig::default(),
            prefabs: default_prefabs(),
            biomes: default_biomes(),
            simulation: SimulationConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            generation_threshold: 150.0,
            cleanup_distance: 200.0,
            cleanup_interval_ticks: 1,
            initial_sections_max: 16,
            sceneries_per_set: 1,
            cadence: Cadence::Polling,
            seed: 42,
        }
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            parallel_track_count: 3,
            lateral_jitter_min: -4.0,
            lateral_jitter_max: 4.0,
            origin: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for SceneryConfig {
    fn default() -> Self {
        Self {
            jitter: [2.0, 1.0, 5.0],
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            spawn_probability: 0.7,
            min_spacing: 5.0,
            max_spacing: 15.0,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            track_prewarm: 10,
            scenery_prewarm: 5,
            obstacle_prewarm: 8,
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            spawn_duration: 0.6,
            despawn_duration: 0.4,
            enter_scale: 1.5,
        }
    }
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed Biome".to_string(),
            debug_color: [1.0, 1.0, 1.0, 1.0],
            tracks: Vec::new(),
            scenery: Vec::new(),
            obstacles: Vec::new(),
            lane_spacing: 20.0,
            set_z_spacing: 50.0,
            descent_per_set: 0.5,
            skybox: None,
            particles: None,
            modules_before_transition: 4,
            speed_multiplier: 1.0,
            scenery_lateral: [40.0, 80.0],
            scenery_vertical: [-10.0, 20.0],
            scenery_forward: [0.0, 30.0],
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            player_speed: 30.0,
            tick_seconds: 1.0 / 60.0,
            ticks: 3600,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

fn track_prefab(name: &str, length: f32) -> PrefabConfig {
    PrefabConfig {
        name: name.to_string(),
        end_attach: Some(AttachConfig {
            position: [0.0, 0.0, length],
            yaw_degrees: 0.0,
        }),
        spawn_duration: None,
        despawn_duration: None,
    }
}

fn plain_prefab(name: &str) -> PrefabConfig {
    PrefabConfig {
        name: name.to_string(),
        end_attach: None,
        spawn_duration: None,
        despawn_duration: None,
    }
}

fn default_prefabs() -> Vec<PrefabConfig> {
    vec![
        track_prefab("track_straight", 40.0),
        track_prefab("track_long", 60.0),
        track_prefab("track_ice", 40.0),
        plain_prefab("tree_cluster"),
        plain_prefab("rock_spire"),
        plain_prefab("ice_shard"),
        plain_prefab("spike"),
        plain_prefab("barrel"),
    ]
}

fn default_biomes() -> Vec<BiomeConfig> {
    vec![
        BiomeConfig {
            name: "Sugar Meadow".to_string(),
            debug_color: [0.95, 0.55, 0.75, 1.0],
            tracks: vec!["track_straight".to_string(), "track_long".to_string()],
            scenery: vec!["tree_cluster".to_string(), "rock_spire".to_string()],
            obstacles: vec!["spike".to_string(), "barrel".to_string()],
            set_z_spacing: 10.0,
            skybox: Some("sky_meadow".to_string()),
            modules_before_transition: 10,
            ..BiomeConfig::default()
        },
        BiomeConfig {
            name: "Frost Canyon".to_string(),
            debug_color: [0.55, 0.8, 1.0, 1.0],
            tracks: vec!["track_ice".to_string()],
            scenery: vec!["ice_shard".to_string(), "rock_spire".to_string()],
            obstacles: vec!["spike".to_string()],
            lane_spacing: 18.0,
            set_z_spacing: 14.0,
            descent_per_set: 1.0,
            skybox: Some("sky_frost".to_string()),
            particles: Some("snowfall".to_string()),
            modules_before_transition: 5,
            speed_multiplier: 1.2,
            ..BiomeConfig::default()
        },
    ]
}

// --- Validation ---

fn finite(label: &str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::Invalid(format!("{label} must be finite, got {value}")));
    }
    Ok(())
}

/// `min <= max`, both finite, and a width that is itself finite.
fn ordered(label: &str, min: f32, max: f32) -> Result<(), ConfigError> {
    finite(label, min)?;
    finite(label, max)?;
    if min > max {
        return Err(ConfigError::Invalid(format!(
            "{label}: min {min} must not exceed max {max}"
        )));
    }
    if !(max - min).is_finite() {
        return Err(ConfigError::Invalid(format!(
            "{label}: range [{min}, {max}] is too wide"
        )));
    }
    Ok(())
}

impl Config {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        finite("generation_threshold", g.generation_threshold)?;
        if g.generation_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "generation_threshold must be positive".to_string(),
            ));
        }
        finite("cleanup_distance", g.cleanup_distance)?;
        if g.cleanup_distance < 0.0 {
            return Err(ConfigError::Invalid(
                "cleanup_distance must not be negative".to_string(),
            ));
        }
        if g.cleanup_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "cleanup_interval_ticks must be at least 1".to_string(),
            ));
        }
        if self.track.parallel_track_count == 0 {
            return Err(ConfigError::Invalid(
                "parallel_track_count must be at least 1".to_string(),
            ));
        }
        ordered(
            "track lateral jitter",
            self.track.lateral_jitter_min,
            self.track.lateral_jitter_max,
        )?;
        for axis in self.track.origin {
            finite("track origin", axis)?;
        }
        for extent in self.scenery.jitter {
            // Drawn from [-extent, extent], so twice the extent must fit.
            ordered("scenery jitter", -extent, extent)?;
        }

        let o = &self.obstacles;
        if !(0.0..=1.0).contains(&o.spawn_probability) {
            return Err(ConfigError::Invalid(format!(
                "obstacle spawn_probability {} outside [0, 1]",
                o.spawn_probability
            )));
        }
        ordered("obstacle spacing", o.min_spacing, o.max_spacing)?;
        if o.min_spacing <= 0.0 {
            return Err(ConfigError::Invalid(
                "obstacle min_spacing must be positive".to_string(),
            ));
        }

        let t = &self.transitions;
        for (label, value) in [
            ("spawn_duration", t.spawn_duration),
            ("despawn_duration", t.despawn_duration),
            ("enter_scale", t.enter_scale),
        ] {
            finite(label, value)?;
        }
        if t.spawn_duration < 0.0 || t.despawn_duration < 0.0 {
            return Err(ConfigError::Invalid(
                "transition durations must not be negative".to_string(),
            ));
        }
        for prefab in &self.prefabs {
            if let Some(attach) = &prefab.end_attach {
                let label = format!("prefab '{}' end_attach", prefab.name);
                for axis in attach.position {
                    finite(&label, axis)?;
                }
                finite(&label, attach.yaw_degrees)?;
            }
        }

        if self.biomes.is_empty() {
            return Err(ConfigError::Invalid("no biomes configured".to_string()));
        }
        for biome in &self.biomes {
            if biome.modules_before_transition == 0 {
                return Err(ConfigError::Invalid(format!(
                    "biome '{}': modules_before_transition must be at least 1",
                    biome.name
                )));
            }
            for (field, value) in [
                ("lane_spacing", biome.lane_spacing),
                ("set_z_spacing", biome.set_z_spacing),
                ("descent_per_set", biome.descent_per_set),
                ("speed_multiplier", biome.speed_multiplier),
            ] {
                finite(&format!("biome '{}' {field}", biome.name), value)?;
            }
            if biome.lane_spacing < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "biome '{}': lane_spacing must not be negative",
                    biome.name
                )));
            }
            ordered(
                &format!("biome '{}' scenery_lateral", biome.name),
                biome.scenery_lateral[0],
                biome.scenery_lateral[1],
            )?;
            ordered(
                &format!("biome '{}' scenery_vertical", biome.name),
                biome.scenery_vertical[0],
                biome.scenery_vertical[1],
            )?;
            ordered(
                &format!("biome '{}' scenery_forward", biome.name),
                biome.scenery_forward[0],
                biome.scenery_forward[1],
            )?;
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `runner.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(ron_str.contains("generation_threshold: 150.0"));
        assert!(ron_str.contains("Sugar Meadow"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(generation: (seed: 7))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.generation.seed, 7);
        assert_eq!(config.generation.cleanup_distance, 200.0);
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.biomes.len(), 2);
    }

    #[test]
    fn test_biome_fields_default_individually() {
        let ron_str = r#"(biomes: [(name: "Only", tracks: ["a"], modules_before_transition: 3)])"#;
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.biomes.len(), 1);
        assert_eq!(config.biomes[0].modules_before_transition, 3);
        assert_eq!(config.biomes[0].lane_spacing, 20.0);
    }

    #[test]
    fn test_cadence_parses() {
        let config: Config = ron::from_str("(generation: (cadence: Trigger))").unwrap();
        assert_eq!(config.generation.cadence, Cadence::Trigger);
    }

    #[test]
    fn test_validate_rejects_empty_biomes() {
        let config = Config {
            biomes: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_quota() {
        let mut config = Config::default();
        config.biomes[1].modules_before_transition = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Frost Canyon"));
    }

    #[test]
    fn test_validate_rejects_inverted_jitter() {
        let mut config = Config::default();
        config.track.lateral_jitter_min = 5.0;
        config.track.lateral_jitter_max = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_obstacle_spacing() {
        let mut config = Config::default();
        config.obstacles.min_spacing = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan_threshold() {
        let mut config = Config::default();
        config.generation.generation_threshold = f32::NAN;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("generation_threshold"));
    }

    #[test]
    fn test_validate_rejects_overflowing_range() {
        let mut config = Config::default();
        config.biomes[0].scenery_lateral = [-3e38, 3e38];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too wide"), "{err}");
    }

    #[test]
    fn test_validate_rejects_infinite_biome_geometry() {
        let mut config = Config::default();
        config.biomes[1].set_z_spacing = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.biomes[0].descent_per_set = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_infinite_jitter() {
        let mut config = Config::default();
        config.track.lateral_jitter_max = f32::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scenery.jitter = [0.0, 2e38, 0.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.generation.seed = 1234;
        config.track.parallel_track_count = 5;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.generation.generation_threshold = 90.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().generation.generation_threshold, 90.0);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }
}
