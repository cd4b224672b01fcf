//! Two-phase elite hostile.
//!
//! The elite is an ordinary [`Hostile`](crate::hostile::Hostile) that carries
//! an [`EliteState`]. Its coarse state drives the same idle/walk/hit logic,
//! while the animation is picked from a fixed table of phase, coarse state
//! and remaining hits. Finishing the first death animation revives it in the
//! faster daemon phase; finishing the second one defeats it for good.

use serde::{Deserialize, Serialize};

use crate::animation::{AnimationError, FrameTag, FrameTagTable};
use crate::hostile::HostileState;

/// Life phase of the elite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElitePhase {
    /// First life
    First,
    /// Second life after the first death
    Daemon,
}

/// Animation sub-states of the elite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EliteAnim {
    /// Idle, unhurt
    Idle1,
    /// Idle, wounded
    Idle2,
    /// Idle, badly wounded
    Idle3,
    /// Idle in daemon phase
    Idle4,
    /// Walking, unhurt
    Walking1,
    /// Walking, wounded
    Walking2,
    /// Walking, badly wounded
    Walking3,
    /// Running in daemon phase
    Running,
    /// Hit in the first phase
    Hit1,
    /// Hit in daemon phase
    Hit2,
    /// First death, leads to the daemon phase
    Death1,
    /// Final death
    Death2,
}

/// Phase data composed into an elite hostile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliteState {
    /// Current life phase
    pub phase: ElitePhase,
    /// Hits of the first phase, used to grade wounds
    pub phase1_hits: u32,
    /// Hits restored on entering the daemon phase
    pub phase2_hits: u32,
}

impl EliteState {
    /// Creates the state of a fresh elite.
    #[must_use]
    pub const fn new(phase1_hits: u32, phase2_hits: u32) -> Self {
        Self {
            phase: ElitePhase::First,
            phase1_hits,
            phase2_hits,
        }
    }

    /// Returns true in the second life.
    #[must_use]
    pub fn is_daemon(&self) -> bool {
        self.phase == ElitePhase::Daemon
    }
}

/// Wound tier from 1 (unhurt) to 3 (badly wounded).
fn wound_tier(hits_left: u32, max_hits: u32) -> u8 {
    let hits = u64::from(hits_left) * 3;
    let max = u64::from(max_hits.max(1));
    if hits > max * 2 {
        1
    } else if hits > max {
        2
    } else {
        3
    }
}

/// Picks the elite animation for a phase, coarse state and remaining hits.
#[must_use]
pub fn elite_animation(elite: &EliteState, state: HostileState, hits_left: u32) -> EliteAnim {
    match (elite.phase, state) {
        (ElitePhase::First, HostileState::Idle) => match wound_tier(hits_left, elite.phase1_hits) {
            1 => EliteAnim::Idle1,
            2 => EliteAnim::Idle2,
            _ => EliteAnim::Idle3,
        },
        (ElitePhase::First, HostileState::Walking) => {
            match wound_tier(hits_left, elite.phase1_hits) {
                1 => EliteAnim::Walking1,
                2 => EliteAnim::Walking2,
                _ => EliteAnim::Walking3,
            }
        },
        (ElitePhase::First, HostileState::Hit) => EliteAnim::Hit1,
        (ElitePhase::First, HostileState::Death | HostileState::Dead) => EliteAnim::Death1,
        (ElitePhase::Daemon, HostileState::Idle) => EliteAnim::Idle4,
        (ElitePhase::Daemon, HostileState::Walking) => EliteAnim::Running,
        (ElitePhase::Daemon, HostileState::Hit) => EliteAnim::Hit2,
        (ElitePhase::Daemon, HostileState::Death | HostileState::Dead) => EliteAnim::Death2,
    }
}

/// Frame tags of the elite sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliteAnimations {
    /// Idle, unhurt
    pub idle1: FrameTag,
    /// Idle, wounded
    pub idle2: FrameTag,
    /// Idle, badly wounded
    pub idle3: FrameTag,
    /// Idle in daemon phase
    pub idle4: FrameTag,
    /// Walking, unhurt
    pub walking1: FrameTag,
    /// Walking, wounded
    pub walking2: FrameTag,
    /// Walking, badly wounded
    pub walking3: FrameTag,
    /// Running in daemon phase
    pub running: FrameTag,
    /// Hit in the first phase
    pub hit1: FrameTag,
    /// Hit in daemon phase
    pub hit2: FrameTag,
    /// First death
    pub death1: FrameTag,
    /// Final death
    pub death2: FrameTag,
}

impl Default for EliteAnimations {
    fn default() -> Self {
        Self {
            idle1: FrameTag::new(0, 3),
            walking1: FrameTag::new(4, 11),
            hit1: FrameTag::new(12, 14),
            idle2: FrameTag::new(15, 18),
            walking2: FrameTag::new(19, 26),
            idle3: FrameTag::new(27, 30),
            walking3: FrameTag::new(31, 38),
            death1: FrameTag::new(39, 46),
            idle4: FrameTag::new(47, 50),
            running: FrameTag::new(51, 58),
            hit2: FrameTag::new(59, 61),
            death2: FrameTag::new(62, 69),
        }
    }
}

impl EliteAnimations {
    /// Reads the elite tags from a sprite sheet table.
    pub fn from_table(table: &FrameTagTable) -> Result<Self, AnimationError> {
        Ok(Self {
            idle1: table.require("Idle1")?,
            idle2: table.require("Idle2")?,
            idle3: table.require("Idle3")?,
            idle4: table.require("Idle4")?,
            walking1: table.require("Walking1")?,
            walking2: table.require("Walking2")?,
            walking3: table.require("Walking3")?,
            running: table.require("Running")?,
            hit1: table.require("Hit1")?,
            hit2: table.require("Hit2")?,
            death1: table.require("Death1")?,
            death2: table.require("Death2")?,
        })
    }

    /// Returns the frame tag of an animation sub-state.
    #[must_use]
    pub const fn tag(&self, anim: EliteAnim) -> FrameTag {
        match anim {
            EliteAnim::Idle1 => self.idle1,
            EliteAnim::Idle2 => self.idle2,
            EliteAnim::Idle3 => self.idle3,
            EliteAnim::Idle4 => self.idle4,
            EliteAnim::Walking1 => self.walking1,
            EliteAnim::Walking2 => self.walking2,
            EliteAnim::Walking3 => self.walking3,
            EliteAnim::Running => self.running,
            EliteAnim::Hit1 => self.hit1,
            EliteAnim::Hit2 => self.hit2,
            EliteAnim::Death1 => self.death1,
            EliteAnim::Death2 => self.death2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_phase_grades_wounds() {
        let elite = EliteState::new(9, 6);
        assert_eq!(elite_animation(&elite, HostileState::Idle, 9), EliteAnim::Idle1);
        assert_eq!(elite_animation(&elite, HostileState::Idle, 7), EliteAnim::Idle1);
        assert_eq!(elite_animation(&elite, HostileState::Idle, 6), EliteAnim::Idle2);
        assert_eq!(elite_animation(&elite, HostileState::Walking, 4), EliteAnim::Walking2);
        assert_eq!(elite_animation(&elite, HostileState::Walking, 3), EliteAnim::Walking3);
        assert_eq!(elite_animation(&elite, HostileState::Walking, 1), EliteAnim::Walking3);
        assert_eq!(elite_animation(&elite, HostileState::Hit, 1), EliteAnim::Hit1);
        assert_eq!(elite_animation(&elite, HostileState::Death, 0), EliteAnim::Death1);
    }

    #[test]
    fn test_daemon_phase_table() {
        let mut elite = EliteState::new(9, 6);
        elite.phase = ElitePhase::Daemon;
        assert!(elite.is_daemon());
        assert_eq!(elite_animation(&elite, HostileState::Idle, 6), EliteAnim::Idle4);
        assert_eq!(elite_animation(&elite, HostileState::Walking, 1), EliteAnim::Running);
        assert_eq!(elite_animation(&elite, HostileState::Hit, 3), EliteAnim::Hit2);
        assert_eq!(elite_animation(&elite, HostileState::Death, 0), EliteAnim::Death2);
    }

    #[test]
    fn test_huge_hit_counts_grade_without_overflow() {
        let max = u32::MAX;
        let elite = EliteState::new(max, 6);
        assert_eq!(elite_animation(&elite, HostileState::Idle, max), EliteAnim::Idle1);
        assert_eq!(elite_animation(&elite, HostileState::Idle, max / 2), EliteAnim::Idle2);
        assert_eq!(elite_animation(&elite, HostileState::Walking, 1), EliteAnim::Walking3);
    }

    #[test]
    fn test_animations_from_table() {
        let defaults = EliteAnimations::default();
        let mut table = FrameTagTable::new();
        for (name, anim) in [
            ("Idle1", EliteAnim::Idle1),
            ("Idle2", EliteAnim::Idle2),
            ("Idle3", EliteAnim::Idle3),
            ("Idle4", EliteAnim::Idle4),
            ("Walking1", EliteAnim::Walking1),
            ("Walking2", EliteAnim::Walking2),
            ("Walking3", EliteAnim::Walking3),
            ("Running", EliteAnim::Running),
            ("Hit1", EliteAnim::Hit1),
            ("Hit2", EliteAnim::Hit2),
            ("Death1", EliteAnim::Death1),
        ] {
            table.insert(name, defaults.tag(anim));
        }
        assert!(EliteAnimations::from_table(&table).is_err());

        table.insert("Death2", defaults.death2);
        assert_eq!(EliteAnimations::from_table(&table).expect("complete table"), defaults);
    }
}
