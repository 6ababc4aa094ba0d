//! Command-line argument parsing for the runner simulation.

use std::path::PathBuf;

use clap::Parser;

use crate::{Cadence, Config};

/// Runner simulation command-line arguments.
///
/// CLI values override settings loaded from `runner.ron`.
#[derive(Parser, Debug)]
#[command(name = "runner-sim", about = "Headless endless-runner track generation")]
pub struct CliArgs {
    /// Seed for the generation RNG.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of ticks to simulate.
    #[arg(long)]
    pub ticks: Option<u32>,

    /// Base player speed in units per second.
    #[arg(long)]
    pub player_speed: Option<f32>,

    /// Generation trigger model.
    #[arg(long, value_enum)]
    pub cadence: Option<Cadence>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// The config directory to use: `--config` if given, else the platform
    /// config directory joined with `runner-track`.
    pub fn config_dir(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join("runner-track")))
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.generation.seed = seed;
        }
        if let Some(ticks) = args.ticks {
            self.simulation.ticks = ticks;
        }
        if let Some(speed) = args.player_speed {
            self.simulation.player_speed = speed;
        }
        if let Some(cadence) = args.cadence {
            self.generation.cadence = cadence;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs {
            seed: None,
            ticks: None,
            player_speed: None,
            cadence: None,
            log_level: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(99),
            cadence: Some(Cadence::Trigger),
            ..empty_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.generation.seed, 99);
        assert_eq!(config.generation.cadence, Cadence::Trigger);
        // Non-overridden fields retain defaults
        assert_eq!(config.simulation.ticks, 3600);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&empty_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from([
            "runner-sim",
            "--seed",
            "5",
            "--cadence",
            "trigger",
            "--player-speed",
            "12.5",
        ]);
        assert_eq!(args.seed, Some(5));
        assert_eq!(args.cadence, Some(Cadence::Trigger));
        assert_eq!(args.player_speed, Some(12.5));
    }

    #[test]
    fn test_explicit_config_dir_wins() {
        let args = CliArgs {
            config: Some(PathBuf::from("/tmp/runner")),
            ..empty_args()
        };
        assert_eq!(args.config_dir(), Some(PathBuf::from("/tmp/runner")));
    }
}
