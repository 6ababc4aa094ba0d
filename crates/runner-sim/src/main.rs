//! Headless driver for the track generator.
//!
//! Loads `runner.ron` (created with defaults on first run), moves a simulated
//! player forward at the configured speed scaled by the current biome, and
//! ticks the level generator once per step.
//!
//! Run with: `cargo run -p runner-sim -- --seed 7 --ticks 7200`

use clap::Parser;
use runner_config::{Cadence, CliArgs, Config};
use runner_level::{BiomeEvent, GeneratorState, LevelGenerator};
use runner_pool::PoolEvent;
use tracing::{error, info, warn};

/// Per-run tallies of presentation-layer events.
#[derive(Debug, Default)]
struct EventTally {
    spawned: u64,
    returned: u64,
    biome_changes: u64,
}

impl EventTally {
    fn absorb(&mut self, generator: &mut LevelGenerator) {
        for event in generator.drain_pool_events() {
            match event {
                PoolEvent::Spawned { .. } => self.spawned += 1,
                PoolEvent::Returned { .. } => self.returned += 1,
                _ => {}
            }
        }
        for event in generator.drain_biome_events() {
            match event {
                BiomeEvent::WillChange { from, to } => {
                    info!("Biome transition starting: {} -> {}", from, to);
                }
                BiomeEvent::Entered {
                    index,
                    name,
                    theme,
                    speed_multiplier,
                } => {
                    self.biome_changes += 1;
                    info!(
                        "Entered biome {} '{}' (skybox {:?}, particles {:?}, speed x{:.2})",
                        index, name, theme.skybox, theme.particles, speed_multiplier
                    );
                }
            }
        }
    }
}

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config_dir();
    let mut config = match &config_dir {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    runner_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    let mut generator = match LevelGenerator::new(&config) {
        Ok(generator) => generator,
        Err(e) => {
            error!("Cannot build level generator: {e}");
            std::process::exit(1);
        }
    };

    let sim = &config.simulation;
    info!(
        "Simulating {} ticks at {:.1} u/s (dt {:.4}s), cadence {:?}",
        sim.ticks, sim.player_speed, sim.tick_seconds, config.generation.cadence
    );

    let mut tally = EventTally::default();
    let mut player_z = 0.0_f32;
    generator.start(player_z);
    tally.absorb(&mut generator);

    let threshold = config.generation.generation_threshold;
    let mut reclaimed = 0;
    let mut triggers = 0;
    for _ in 0..sim.ticks {
        player_z += sim.player_speed * generator.context().speed_multiplier() * sim.tick_seconds;
        let report = generator.tick(player_z, sim.tick_seconds);
        reclaimed += report.reclaimed;

        // Stand-in for the lane-end collider a game would place on each set.
        if config.generation.cadence == Cadence::Trigger
            && generator.frontier_z() - player_z < threshold
            && generator.on_lane_end_trigger().is_some()
        {
            triggers += 1;
        }
        tally.absorb(&mut generator);
    }

    if let GeneratorState::Halted(reason) = generator.state() {
        warn!("Generation halted during the run: {}", reason);
    }

    let stats = generator.pool().stats();
    info!(
        "Run complete: player z={:.1}, frontier z={:.1}, {} sections ({} from lane-end triggers), {} biome entries",
        player_z,
        generator.frontier_z(),
        generator.sections_generated(),
        triggers,
        tally.biome_changes
    );
    info!(
        "Pool: {} instances ({} on demand), {} on loan, {} acquires, {} releases, {} reclaimed, {} spawn / {} return events",
        stats.created,
        stats.created_on_demand,
        generator.pool().active_count(),
        stats.acquires,
        stats.releases,
        reclaimed,
        tally.spawned,
        tally.returned
    );
}
