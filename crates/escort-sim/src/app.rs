//! Headless runner: option parsing, loading and the tick loop.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use escort_ai::{GameEvent, LevelData, SimStats, Simulation, SpriteSet, TickOutcome, TuningConfig};
use tracing::{debug, info, warn};

use crate::script::EscortScript;

/// Configuration file name.
const CONFIG_FILE: &str = "escort.toml";

/// Level used when no level file is given.
const DEMO_LEVEL: &str = include_str!("../levels/demo.json");

/// Default seed for spawn placement and speed jitter.
const DEFAULT_SEED: u64 = 0x5eed;

/// Default tick limit, ten minutes at 60 ticks per second.
const DEFAULT_MAX_TICKS: u64 = 60 * 60 * 10;

/// Default number of respawns.
const DEFAULT_MAX_RESPAWNS: u32 = 3;

/// Headless runner for the escort NPC layer
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(author, version, about, long_about = None)]
pub struct RunOptions {
    /// Level JSON file, or the built-in demo level
    #[arg(long)]
    pub level: Option<PathBuf>,
    /// Tuning file, or the platform config location
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed for spawn placement and speed jitter
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
    /// Tick limit for the whole run
    #[arg(long = "ticks", default_value_t = DEFAULT_MAX_TICKS)]
    pub max_ticks: u64,
    /// Respawns allowed before giving up
    #[arg(long = "respawns", default_value_t = DEFAULT_MAX_RESPAWNS)]
    pub max_respawns: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            level: None,
            config: None,
            seed: DEFAULT_SEED,
            max_ticks: DEFAULT_MAX_TICKS,
            max_respawns: DEFAULT_MAX_RESPAWNS,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Outcome of the last tick
    pub outcome: TickOutcome,
    /// Ticks simulated
    pub ticks: u64,
    /// Respawns used
    pub respawns: u32,
    /// Events seen on the bus
    pub events: usize,
    /// Final statistics
    pub stats: SimStats,
}

/// Loads everything and runs the level.
pub fn run(options: &RunOptions) -> Result<()> {
    let config_path = options.config.clone().unwrap_or_else(config_path);
    let tuning = TuningConfig::load_from(&config_path);

    let level = load_level(options)?;
    let mut sim = Simulation::new(&level, tuning, SpriteSet::default(), options.seed)?;

    info!("Simulation ready:");
    info!("  Seed: {}", options.seed);
    info!("  Tick limit: {}", options.max_ticks);

    let report = simulate(&mut sim, &EscortScript::default(), options);

    info!("Run finished: {:?} after {} ticks", report.outcome, report.ticks);
    info!("  Respawns: {}", report.respawns);
    info!("  Events: {}", report.events);
    info!("  Hostiles hit: {}", report.stats.hostiles_hit);
    info!("  Hostiles killed: {}", report.stats.hostiles_killed);
    info!("  Player deaths: {}", report.stats.player_deaths);
    info!("  Companion deaths: {}", report.stats.companion_deaths);
    Ok(())
}

fn load_level(options: &RunOptions) -> Result<LevelData> {
    let level = match &options.level {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read level {}", path.display()))?;
            info!("Loaded level from {}", path.display());
            LevelData::from_json(&json)?
        },
        None => {
            info!("No level given, using the demo level");
            LevelData::from_json(DEMO_LEVEL)?
        },
    };
    Ok(level)
}

/// Drives the simulation with the scripted player until the level is won
/// or the tick or respawn budget runs out.
pub fn simulate(sim: &mut Simulation, script: &EscortScript, options: &RunOptions) -> RunReport {
    let mut respawns = 0;
    let mut events = 0;
    let mut outcome = TickOutcome::Running;

    while sim.tick() < options.max_ticks {
        script.attack(sim);
        outcome = sim.step(script.next_position(sim));

        for event in sim.drain_events() {
            events += 1;
            match event {
                GameEvent::Audio(cue) => debug!(?cue, tick = sim.tick(), "Audio cue"),
                other => debug!(event = ?other, tick = sim.tick(), "Game event"),
            }
        }

        match outcome {
            TickOutcome::Running => {},
            TickOutcome::LevelWon => break,
            TickOutcome::GameOver(reason) => {
                if respawns >= options.max_respawns {
                    warn!(?reason, "Out of respawns");
                    break;
                }
                respawns += 1;
                info!(?reason, respawns, "Game over, respawning");
                sim.respawn();
            },
        }
    }

    RunReport {
        outcome,
        ticks: sim.tick(),
        respawns,
        events,
        stats: sim.stats(),
    }
}

/// Get the default configuration file path.
fn config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("escort").join(CONFIG_FILE)
    } else {
        PathBuf::from(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_options() {
        let options = RunOptions::try_parse_from([
            "escort", "--level", "a.json", "--seed", "9", "--ticks", "100",
        ])
        .expect("valid args");
        assert_eq!(options.level, Some(PathBuf::from("a.json")));
        assert_eq!(options.config, None);
        assert_eq!(options.seed, 9);
        assert_eq!(options.max_ticks, 100);
        assert_eq!(options.max_respawns, RunOptions::default().max_respawns);

        assert!(RunOptions::try_parse_from(["escort", "--bogus"]).is_err());
        assert!(RunOptions::try_parse_from(["escort", "--seed"]).is_err());
        assert!(RunOptions::try_parse_from(["escort", "--seed", "x"]).is_err());
    }

    #[test]
    fn test_parse_defaults_match_default() {
        let options = RunOptions::try_parse_from(["escort"]).expect("no args");
        assert_eq!(options, RunOptions::default());

        let options = RunOptions::try_parse_from(["escort", "--config", "t.toml", "--respawns", "0"])
            .expect("valid args");
        assert_eq!(options.config, Some(PathBuf::from("t.toml")));
        assert_eq!(options.max_respawns, 0);
    }

    #[test]
    fn test_config_path_names_the_file() {
        assert!(config_path().ends_with(CONFIG_FILE));
    }

    #[test]
    fn test_demo_level_is_valid() {
        let level = LevelData::from_json(DEMO_LEVEL).expect("demo level");
        assert_eq!(level.checkpoints.len(), 2);
        assert!(level.build_grid().is_ok());
    }

    #[test]
    fn test_simulate_respects_budgets() {
        let level = LevelData::from_json(DEMO_LEVEL).expect("demo level");
        let mut sim =
            Simulation::new(&level, TuningConfig::default(), SpriteSet::default(), 3).expect("sim");
        let options = RunOptions {
            max_ticks: 600,
            ..RunOptions::default()
        };
        let report = simulate(&mut sim, &EscortScript::default(), &options);
        assert!(report.ticks <= 600);
        assert!(report.respawns <= options.max_respawns);
    }

    #[test]
    fn test_level_file_and_config_are_loaded() {
        let temp_dir = TempDir::new().expect("temp dir");
        let level_path = temp_dir.path().join("level.json");
        fs::write(&level_path, DEMO_LEVEL).expect("write level");

        let options = RunOptions {
            level: Some(level_path),
            config: Some(temp_dir.path().join("missing.toml")),
            max_ticks: 10,
            ..RunOptions::default()
        };
        assert!(load_level(&options).is_ok());
        assert!(run(&options).is_ok());

        let broken = RunOptions {
            level: Some(temp_dir.path().join("nope.json")),
            ..options
        };
        assert!(load_level(&broken).is_err());
    }
}
