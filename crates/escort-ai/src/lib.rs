//! # Escort AI
//!
//! NPC behaviour layer for a top-down escort level.
//!
//! This crate provides:
//! - Navigation grid with A* planning and curve smoothing
//! - Frame-tag animation advancing
//! - Hostile state machine with an elite two-phase variant
//! - Companion state machine (route following, checkpoints, fleeing)
//! - Spawn controller
//! - Collision space abstraction
//! - Tuning configuration and level data
//! - Event bus for audio cues and game events
//! - Simulation driver tying everything together

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod animation;
pub mod bezier;
pub mod collision;
pub mod companion;
pub mod config;
pub mod elite;
pub mod events;
pub mod hostile;
pub mod level;
pub mod nav;
pub mod path;
pub mod sim;
pub mod spawner;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::animation::*;
    pub use crate::bezier::*;
    pub use crate::collision::*;
    pub use crate::companion::*;
    pub use crate::config::*;
    pub use crate::elite::*;
    pub use crate::events::*;
    pub use crate::hostile::*;
    pub use crate::level::*;
    pub use crate::nav::*;
    pub use crate::path::*;
    pub use crate::sim::*;
    pub use crate::spawner::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use escort_common::Coord;

    #[test]
    fn test_planned_route_is_smoothed() {
        let grid = NavGrid::open(20, 20).expect("grid");
        let raw = grid.find_path(Coord::new(8.0, 8.0), Coord::new(300.0, 200.0));
        assert!(raw.len() >= 2);

        let smooth = bezier_path(&raw, 4);
        assert!(smooth.len() >= raw.len());
        let (first, last) = (smooth[0], smooth[smooth.len() - 1]);
        assert!(first.distance(raw[0]) < 1e-3);
        assert!(last.distance(raw[raw.len() - 1]) < 1e-3);
    }

    #[test]
    fn test_prelude_covers_the_driver() {
        let config = TuningConfig::default();
        let bus = EventBus::default();
        bus.cue(AudioCue::ThreatDetected);
        assert_eq!(bus.pending_count(), 1);
        assert!(config.spawn.activation_min < config.spawn.activation_max);
        assert!(config.companion.flee_radius < config.companion.safe_radius);
    }
}
