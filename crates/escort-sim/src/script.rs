//! Scripted player used by the headless runner.
//!
//! Stays beside the companion, confirms checkpoints, swings at hostiles in
//! reach and heads for the exit once the boss is down.

use escort_ai::{Hostile, Simulation};
use escort_common::{Coord, EntityId};
use tracing::trace;

/// Scripted player behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscortScript {
    /// Where the player stands relative to the companion
    pub offset: Coord,
    /// Player speed per tick
    pub speed: f32,
    /// Reach of an attack
    pub attack_range: f32,
    /// Ticks between attacks
    pub attack_interval: u64,
}

impl Default for EscortScript {
    fn default() -> Self {
        Self {
            offset: Coord::new(0.0, 40.0),
            speed: 1.2,
            attack_range: 40.0,
            attack_interval: 20,
        }
    }
}

impl EscortScript {
    /// Where the player wants to go this tick.
    #[must_use]
    pub fn target(&self, sim: &Simulation) -> Coord {
        let companion = sim.companion();

        if companion.is_at_checkpoint() && companion.checkpoint() > sim.confirmed_checkpoint() {
            if let Some(checkpoint) = sim
                .level()
                .checkpoints
                .iter()
                .find(|c| c.id == companion.checkpoint().raw())
            {
                return checkpoint.area.center();
            }
        }

        if companion.is_finished() {
            if sim.boss_defeated() {
                return sim.level().end_area.center();
            }
            if let Some(hostile) = self.nearest_hostile(sim) {
                let position = hostile.position();
                let away = (sim.player_position() - position)
                    .normalized()
                    .unwrap_or(Coord::new(1.0, 0.0));
                return position + away * (self.attack_range / 2.0);
            }
        }

        companion.position() + self.offset
    }

    /// Player position for the next tick.
    #[must_use]
    pub fn next_position(&self, sim: &Simulation) -> Coord {
        let current = sim.player_position();
        let target = self.target(sim);
        let to_target = target - current;
        let distance = to_target.length();
        if distance <= self.speed {
            return target;
        }
        to_target
            .normalized()
            .map_or(current, |dir| current + dir * self.speed)
    }

    /// Hits every hostile in reach on attack ticks. Returns the hit count.
    pub fn attack(&self, sim: &mut Simulation) -> usize {
        if self.attack_interval == 0 || sim.tick() % self.attack_interval != 0 {
            return 0;
        }
        let player = sim.player_position();
        let targets: Vec<EntityId> = sim
            .hostiles()
            .iter()
            .filter(|h| !h.is_dying() && h.position().distance(player) <= self.attack_range)
            .map(Hostile::id)
            .collect();
        for id in &targets {
            trace!(id = id.raw(), "Player attacks");
            sim.hit_hostile(*id);
        }
        targets.len()
    }

    fn nearest_hostile<'a>(&self, sim: &'a Simulation) -> Option<&'a Hostile> {
        let player = sim.player_position();
        sim.hostiles()
            .iter()
            .filter(|h| !h.is_dying())
            .min_by(|a, b| {
                a.position()
                    .distance(player)
                    .total_cmp(&b.position().distance(player))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escort_ai::{HostileKind, HostileState, LevelData, SpriteSet, TuningConfig};

    fn sim() -> Simulation {
        let level = LevelData::from_json(include_str!("../levels/demo.json")).expect("demo level");
        Simulation::new(&level, TuningConfig::default(), SpriteSet::default(), 11).expect("sim")
    }

    #[test]
    fn test_player_keeps_beside_companion() {
        let sim = sim();
        let script = EscortScript::default();
        let expected = sim.companion().position() + script.offset;
        assert_eq!(script.target(&sim), expected);

        let next = script.next_position(&sim);
        let moved = next.distance(sim.player_position());
        assert!(moved <= script.speed + 1e-4);
    }

    #[test]
    fn test_attack_hits_hostiles_in_reach() {
        let mut sim = sim();
        let script = EscortScript::default();
        let player = sim.player_position();
        let near = sim.spawn_hostile(HostileKind::Basic, player + Coord::new(30.0, 0.0));
        let far = sim.spawn_hostile(HostileKind::Basic, player + Coord::new(300.0, 0.0));

        // Tick 0 is an attack tick
        assert_eq!(script.attack(&mut sim), 1);
        assert_eq!(sim.hit_hostile(far), Some(HostileState::Hit));
        assert_eq!(sim.stats().hostiles_hit, 2);
        let state = sim
            .hostiles()
            .iter()
            .find(|h| h.id() == near)
            .map(Hostile::state);
        assert_eq!(state, Some(HostileState::Hit));
    }
}
