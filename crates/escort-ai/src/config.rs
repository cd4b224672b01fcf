//! Tuning configuration.
//!
//! All speeds, radii, counts and tick thresholds of the behaviour layer live
//! in one immutable [`TuningConfig`] that is built once at startup and
//! handed to every component constructor. Missing keys fall back to the
//! compiled-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Upper bound for any hit count.
pub const MAX_HITS: u32 = 10_000;

/// Errors that can occur while reading or writing a tuning file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read or written
    #[error("config io error: {0}")]
    Io(#[from] io::Error),

    /// File contents are not valid TOML for [`TuningConfig`]
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be serialized
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Hostile tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileTuning {
    /// Base speed of basic hostiles (units per tick)
    pub basic_speed: f32,
    /// Base speed of crawlers
    pub crawler_speed: f32,
    /// Base speed of sprinters
    pub sprinter_speed: f32,
    /// Base speed of the elite in its first phase
    pub elite_speed: f32,
    /// Half-width of the random speed band, as a fraction of the base speed
    pub speed_jitter: f32,
    /// Hits needed to kill a basic hostile
    pub basic_hits: u32,
    /// Hits needed to kill a crawler
    pub crawler_hits: u32,
    /// Hits needed to kill a sprinter
    pub sprinter_hits: u32,
    /// Hits needed to end the elite's first phase
    pub elite_phase1_hits: u32,
    /// Hits needed to end the elite's second phase
    pub elite_phase2_hits: u32,
    /// Distance at which a hostile notices the player
    pub detection_radius: f32,
    /// Multiplier applied to the detection radius when the target is the companion
    pub companion_detection_factor: f32,
    /// Speed multiplier while standing in a sand trap
    pub sand_trap_factor: f32,
}

impl Default for HostileTuning {
    fn default() -> Self {
        Self {
            basic_speed: 0.4,
            crawler_speed: 0.2,
            sprinter_speed: 0.9,
            elite_speed: 0.35,
            speed_jitter: 0.2,
            basic_hits: 2,
            crawler_hits: 1,
            sprinter_hits: 2,
            elite_phase1_hits: 8,
            elite_phase2_hits: 6,
            detection_radius: 200.0,
            companion_detection_factor: 1.2,
            sand_trap_factor: 0.5,
        }
    }
}

/// Companion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionTuning {
    /// Speed while following a path calmly
    pub walking_speed: f32,
    /// Speed while fleeing
    pub running_speed: f32,
    /// Player distance beyond which the companion waits
    pub waiting_radius: f32,
    /// Player distance under which a waiting companion follows again
    pub following_radius: f32,
    /// Hostile distance that starts barking
    pub bark_radius: f32,
    /// Hostile distance that starts fleeing
    pub flee_radius: f32,
    /// Every hostile must be farther than this before danger clears
    pub safe_radius: f32,
    /// Length of a single flee step
    pub flee_path_length: f32,
    /// Minimum number of ticks spent sniffing at a checkpoint
    pub sniff_ticks: u32,
    /// Interval of the re-bark while waiting at a checkpoint
    pub bark_interval_ticks: u32,
    /// Ticks off screen after which the companion is lost
    pub out_of_sight_limit: u32,
    /// Distance at which a path point counts as reached
    pub arrival_threshold: f32,
    /// Subdivision used for the authored main path
    pub main_path_subdivision: usize,
    /// Subdivision used for return routes
    pub return_path_subdivision: usize,
    /// Distance to the player kept once the main path is finished
    pub follow_stop_distance: f32,
    /// Offset from the player when placed at a respawn
    pub respawn_offset: f32,
}

impl Default for CompanionTuning {
    fn default() -> Self {
        Self {
            walking_speed: 0.7,
            running_speed: 1.3,
            waiting_radius: 96.0,
            following_radius: 96.0,
            bark_radius: 150.0,
            flee_radius: 80.0,
            safe_radius: 192.0,
            flee_path_length: 200.0,
            sniff_ticks: 180,
            bark_interval_ticks: 300,
            out_of_sight_limit: 300,
            arrival_threshold: 2.0,
            main_path_subdivision: 4,
            return_path_subdivision: 2,
            follow_stop_distance: 32.0,
            respawn_offset: 20.0,
        }
    }
}

/// Spawn controller tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Player distance under which a spawn point is too close to activate
    pub activation_min: f32,
    /// Player distance over which a spawn point is inactive
    pub activation_max: f32,
    /// Distance between placement rings
    pub ring_spacing: f32,
    /// Placement attempts before falling back to the last candidate
    pub placement_attempts: u32,
    /// Shortest cooldown between continuous respawns
    pub respawn_ticks_min: u32,
    /// Longest cooldown between continuous respawns
    pub respawn_ticks_max: u32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            activation_min: 160.0,
            activation_max: 480.0,
            ring_spacing: 24.0,
            placement_attempts: 6,
            respawn_ticks_min: 4 * 60,
            respawn_ticks_max: 6 * 60,
        }
    }
}

/// Animation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationTuning {
    /// Width of the visible area around the player
    pub viewport_width: f32,
    /// Height of the visible area around the player
    pub viewport_height: f32,
}

impl Default for AnimationTuning {
    fn default() -> Self {
        Self {
            viewport_width: 640.0,
            viewport_height: 360.0,
        }
    }
}

/// Numeric tuning of the whole behaviour layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Hostile parameters
    pub hostile: HostileTuning,
    /// Companion parameters
    pub companion: CompanionTuning,
    /// Spawn controller parameters
    pub spawn: SpawnTuning,
    /// Animation and viewport parameters
    pub animation: AnimationTuning,
}

impl TuningConfig {
    /// Reads a tuning file, reporting every failure.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut contents = String::new();
        fs::File::open(path.as_ref())?.read_to_string(&mut contents)?;
        let mut config: Self = toml::from_str(&contents)?;
        config.validate();
        Ok(config)
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Tuning file {} not found, using defaults", path.display());
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded tuning from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load tuning file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved tuning to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        let hostile = &mut self.hostile;
        hostile.basic_speed = hostile.basic_speed.clamp(0.05, 8.0);
        hostile.crawler_speed = hostile.crawler_speed.clamp(0.05, 8.0);
        hostile.sprinter_speed = hostile.sprinter_speed.clamp(0.05, 8.0);
        hostile.elite_speed = hostile.elite_speed.clamp(0.05, 8.0);
        hostile.speed_jitter = hostile.speed_jitter.clamp(0.0, 0.9);
        hostile.basic_hits = hostile.basic_hits.clamp(1, MAX_HITS);
        hostile.crawler_hits = hostile.crawler_hits.clamp(1, MAX_HITS);
        hostile.sprinter_hits = hostile.sprinter_hits.clamp(1, MAX_HITS);
        hostile.elite_phase1_hits = hostile.elite_phase1_hits.clamp(1, MAX_HITS);
        hostile.elite_phase2_hits = hostile.elite_phase2_hits.clamp(1, MAX_HITS);
        hostile.detection_radius = hostile.detection_radius.clamp(0.0, 4096.0);
        hostile.companion_detection_factor = hostile.companion_detection_factor.clamp(0.1, 10.0);
        hostile.sand_trap_factor = hostile.sand_trap_factor.clamp(0.0, 1.0);

        let companion = &mut self.companion;
        companion.walking_speed = companion.walking_speed.clamp(0.05, 8.0);
        companion.running_speed = companion.running_speed.clamp(companion.walking_speed, 16.0);
        companion.waiting_radius = companion.waiting_radius.max(1.0);
        companion.following_radius = companion.following_radius.clamp(1.0, companion.waiting_radius);
        companion.flee_radius = companion.flee_radius.max(1.0);
        companion.bark_radius = companion.bark_radius.max(companion.flee_radius);
        // Danger may only clear strictly outside the flee radius.
        if companion.safe_radius <= companion.flee_radius {
            companion.safe_radius = companion.flee_radius + 1.0;
        }
        companion.flee_path_length = companion.flee_path_length.max(1.0);
        companion.bark_interval_ticks = companion.bark_interval_ticks.max(1);
        companion.arrival_threshold = companion.arrival_threshold.max(companion.running_speed);
        companion.main_path_subdivision = companion.main_path_subdivision.clamp(1, 32);
        companion.return_path_subdivision = companion.return_path_subdivision.clamp(1, 32);
        companion.follow_stop_distance = companion.follow_stop_distance.max(0.0);

        let spawn = &mut self.spawn;
        spawn.activation_min = spawn.activation_min.max(0.0);
        if spawn.activation_max <= spawn.activation_min {
            spawn.activation_max = spawn.activation_min + 1.0;
        }
        spawn.ring_spacing = spawn.ring_spacing.max(1.0);
        spawn.placement_attempts = spawn.placement_attempts.clamp(1, 64);
        spawn.respawn_ticks_max = spawn.respawn_ticks_max.max(spawn.respawn_ticks_min);

        let animation = &mut self.animation;
        animation.viewport_width = animation.viewport_width.max(1.0);
        animation.viewport_height = animation.viewport_height.max(1.0);
    }

    /// Returns a validated copy of the configuration.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }
}
