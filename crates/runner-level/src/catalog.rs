//! Prefab catalog: resolves configured prefab and biome names into pool
//! templates and typed kinds.

use glam::Vec3;
use hashbrown::HashMap;
use runner_config::{BiomeConfig, PrefabConfig, TransitionConfig};
use runner_pool::{PrefabKind, PrefabTemplate, Transform};
use tracing::debug;

use crate::biome::{Biome, BiomeTheme, SceneryPlacement};
use crate::error::LevelError;

/// Named prefab templates. Kinds are assigned in declaration order.
#[derive(Clone, Debug, Default)]
pub struct PrefabCatalog {
    templates: Vec<PrefabTemplate>,
    by_name: HashMap<String, PrefabKind>,
}

impl PrefabCatalog {
    /// Build templates from configuration. Per-prefab durations fall back to
    /// the global transition settings.
    pub fn from_config(
        prefabs: &[PrefabConfig],
        transitions: &TransitionConfig,
    ) -> Result<Self, LevelError> {
        let mut catalog = Self::default();
        for prefab in prefabs {
            if catalog.by_name.contains_key(&prefab.name) {
                return Err(LevelError::DuplicatePrefab(prefab.name.clone()));
            }
            let kind = PrefabKind(catalog.templates.len() as u32);
            let mut template = PrefabTemplate::new(kind, prefab.name.clone()).with_durations(
                prefab.spawn_duration.unwrap_or(transitions.spawn_duration),
                prefab.despawn_duration.unwrap_or(transitions.despawn_duration),
            );
            template.enter_scale = transitions.enter_scale;
            if let Some(attach) = &prefab.end_attach {
                template = template.with_end_attach(Transform::from_yaw_degrees(
                    Vec3::from_array(attach.position),
                    attach.yaw_degrees,
                ));
            }
            catalog.by_name.insert(prefab.name.clone(), kind);
            catalog.templates.push(template);
        }
        debug!("Prefab catalog built with {} templates", catalog.templates.len());
        Ok(catalog)
    }

    pub fn lookup(&self, name: &str) -> Option<PrefabKind> {
        self.by_name.get(name).copied()
    }

    pub fn template(&self, kind: PrefabKind) -> Option<&PrefabTemplate> {
        self.templates.get(kind.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve a biome's prefab names.
    pub fn resolve(&self, biome: &str, names: &[String]) -> Result<Vec<PrefabKind>, LevelError> {
        names
            .iter()
            .map(|name| {
                self.lookup(name).ok_or_else(|| LevelError::UnknownPrefab {
                    biome: biome.to_string(),
                    prefab: name.clone(),
                })
            })
            .collect()
    }

    /// Turn biome configuration into resolved biomes, in order.
    pub fn build_biomes(&self, configs: &[BiomeConfig]) -> Result<Vec<Biome>, LevelError> {
        configs
            .iter()
            .map(|c| {
                Ok(Biome {
                    name: c.name.clone(),
                    track_kinds: self.resolve(&c.name, &c.tracks)?,
                    scenery_kinds: self.resolve(&c.name, &c.scenery)?,
                    obstacle_kinds: self.resolve(&c.name, &c.obstacles)?,
                    lane_spacing: c.lane_spacing,
                    set_z_spacing: c.set_z_spacing,
                    descent_per_set: c.descent_per_set,
                    transition_quota: c.modules_before_transition,
                    speed_multiplier: c.speed_multiplier,
                    scenery: SceneryPlacement {
                        lateral: (c.scenery_lateral[0], c.scenery_lateral[1]),
                        vertical: (c.scenery_vertical[0], c.scenery_vertical[1]),
                        forward: (c.scenery_forward[0], c.scenery_forward[1]),
                    },
                    theme: BiomeTheme {
                        skybox: c.skybox.clone(),
                        particles: c.particles.clone(),
                        debug_color: c.debug_color,
                    },
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_config::{AttachConfig, Config};

    #[test]
    fn test_default_config_resolves() {
        let config = Config::default();
        let catalog = PrefabCatalog::from_config(&config.prefabs, &config.transitions).unwrap();
        let biomes = catalog.build_biomes(&config.biomes).unwrap();

        assert_eq!(biomes.len(), config.biomes.len());
        assert_eq!(biomes[0].name, "Sugar Meadow");
        assert!(!biomes[0].track_kinds.is_empty());
        assert_eq!(biomes[1].theme.particles.as_deref(), Some("snowfall"));
    }

    #[test]
    fn test_kinds_follow_declaration_order() {
        let config = Config::default();
        let catalog = PrefabCatalog::from_config(&config.prefabs, &config.transitions).unwrap();
        for (i, prefab) in config.prefabs.iter().enumerate() {
            assert_eq!(catalog.lookup(&prefab.name), Some(PrefabKind(i as u32)));
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let prefab = PrefabConfig {
            name: "twin".to_string(),
            end_attach: None,
            spawn_duration: None,
            despawn_duration: None,
        };
        let err = PrefabCatalog::from_config(&[prefab.clone(), prefab], &TransitionConfig::default())
            .unwrap_err();
        assert!(matches!(err, LevelError::DuplicatePrefab(name) if name == "twin"));
    }

    #[test]
    fn test_unknown_reference_rejected() {
        let catalog = PrefabCatalog::default();
        let err = catalog
            .resolve("Void", &["ghost".to_string()])
            .unwrap_err();
        assert!(matches!(
            err,
            LevelError::UnknownPrefab { biome, prefab } if biome == "Void" && prefab == "ghost"
        ));
    }

    #[test]
    fn test_template_durations_and_attach() {
        let transitions = TransitionConfig::default();
        let prefabs = [
            PrefabConfig {
                name: "ramp".to_string(),
                end_attach: Some(AttachConfig {
                    position: [0.0, -2.0, 30.0],
                    yaw_degrees: 0.0,
                }),
                spawn_duration: Some(0.0),
                despawn_duration: None,
            },
        ];
        let catalog = PrefabCatalog::from_config(&prefabs, &transitions).unwrap();
        let template = catalog.template(PrefabKind(0)).unwrap();
        assert_eq!(template.spawn_duration, 0.0);
        assert_eq!(template.despawn_duration, transitions.despawn_duration);
        assert_eq!(template.enter_scale, transitions.enter_scale);
        let attach = template.end_attach.unwrap();
        assert_eq!(attach.position, Vec3::new(0.0, -2.0, 30.0));
    }
}
