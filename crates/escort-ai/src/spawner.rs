//! Spawn controller.
//!
//! Spawn points wake up when the player is inside their activation window,
//! place their initial population in rings around themselves and, if
//! continuous, top the population back up after a random cooldown. The
//! population never exceeds the initial count.

use std::f32::consts::TAU;

use escort_common::{Coord, EntityId, SpawnPointId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::{HostileTuning, SpawnTuning};
use crate::events::{EventBus, GameEvent};
use crate::hostile::{Hostile, HostileKind};
use crate::level::SpawnPointData;
use crate::nav::NavGrid;

/// Angular slots per placement ring.
pub const SLOTS_PER_RING: u32 = 6;

/// Position of the next placement around a spawn point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementCursor {
    /// Ring index, 0 is the innermost ring
    pub ring: u32,
    /// Angular slot within the ring
    pub slot: u32,
}

impl PlacementCursor {
    /// Moves to the next slot, opening a new ring when the slot wraps.
    pub fn advance(&mut self) {
        self.slot = (self.slot + 1) % SLOTS_PER_RING;
        if self.slot == 0 {
            self.ring += 1;
        }
    }

    /// World offset of this slot from the spawn point.
    #[must_use]
    pub fn offset(&self, ring_spacing: f32) -> Coord {
        let angle = self.slot as f32 * TAU / SLOTS_PER_RING as f32;
        Coord::from_angle(angle) * (ring_spacing * (self.ring + 1) as f32)
    }
}

/// A spawn point and its live population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    id: SpawnPointId,
    position: Coord,
    initial_count: usize,
    continuous: bool,
    kind: HostileKind,
    population: Vec<EntityId>,
    spawned: bool,
    active: bool,
    cursor: PlacementCursor,
    cooldown: u32,
}

impl SpawnPoint {
    /// Creates a dormant spawn point.
    #[must_use]
    pub fn new(id: SpawnPointId, data: &SpawnPointData) -> Self {
        Self {
            id,
            position: data.position,
            initial_count: data.initial_count,
            continuous: data.continuous,
            kind: data.kind,
            population: Vec::new(),
            spawned: false,
            active: false,
            cursor: PlacementCursor::default(),
            cooldown: 0,
        }
    }

    /// Spawn point id.
    #[must_use]
    pub const fn id(&self) -> SpawnPointId {
        self.id
    }

    /// Center of the spawn pattern.
    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    /// Population cap.
    #[must_use]
    pub const fn initial_count(&self) -> usize {
        self.initial_count
    }

    /// Whether the point replenishes its population.
    #[must_use]
    pub const fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Kind of hostile spawned here.
    #[must_use]
    pub const fn kind(&self) -> HostileKind {
        self.kind
    }

    /// Live hostiles created by this point.
    #[must_use]
    pub fn population(&self) -> &[EntityId] {
        &self.population
    }

    /// Whether the initial population was created.
    #[must_use]
    pub const fn has_spawned(&self) -> bool {
        self.spawned
    }

    /// Whether the player is inside the activation window.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Next placement slot.
    #[must_use]
    pub const fn cursor(&self) -> PlacementCursor {
        self.cursor
    }

    /// Ticks left before the next continuous spawn.
    #[must_use]
    pub const fn cooldown(&self) -> u32 {
        self.cooldown
    }

    fn at_cap(&self) -> bool {
        self.population.len() >= self.initial_count
    }
}

/// Owns every spawn point of the level.
#[derive(Debug)]
pub struct SpawnController {
    points: Vec<SpawnPoint>,
    tuning: SpawnTuning,
    hostile_tuning: HostileTuning,
    rng: fastrand::Rng,
}

impl SpawnController {
    /// Creates the controller from level data.
    #[must_use]
    pub fn new(
        points: &[SpawnPointData],
        mut tuning: SpawnTuning,
        hostile_tuning: HostileTuning,
        seed: u64,
    ) -> Self {
        let points = points
            .iter()
            .zip(0..=u16::MAX)
            .map(|(data, index)| SpawnPoint::new(SpawnPointId::new(index), data))
            .collect();
        if tuning.respawn_ticks_min > tuning.respawn_ticks_max {
            std::mem::swap(&mut tuning.respawn_ticks_min, &mut tuning.respawn_ticks_max);
        }
        Self {
            points,
            tuning,
            hostile_tuning,
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// All spawn points.
    #[must_use]
    pub fn points(&self) -> &[SpawnPoint] {
        &self.points
    }

    /// Looks up a spawn point.
    #[must_use]
    pub fn point(&self, id: SpawnPointId) -> Option<&SpawnPoint> {
        self.points.get(id.index())
    }

    /// Total live population over all points.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.points.iter().map(|p| p.population.len()).sum()
    }

    /// Runs one tick for every spawn point and returns the new hostiles.
    ///
    /// The caller registers them in the collision space and its live list.
    pub fn update(&mut self, player: Coord, grid: &NavGrid, events: &EventBus) -> Vec<Hostile> {
        let mut spawned = Vec::new();

        for index in 0..self.points.len() {
            let point = &mut self.points[index];
            let distance = point.position.distance(player);
            let active =
                distance >= self.tuning.activation_min && distance <= self.tuning.activation_max;
            if active != point.active {
                debug!(spawn_point = point.id.raw(), active, "Spawn point activation changed");
                point.active = active;
            }

            if point.spawned && (!point.continuous || point.at_cap()) {
                continue;
            }
            if !point.active {
                continue;
            }

            if !point.spawned {
                let count = point.initial_count;
                info!(spawn_point = point.id.raw(), count, kind = ?point.kind, "Spawn point activated");
                for _ in 0..count {
                    spawned.push(self.spawn_one(index, grid, events));
                }
                let cooldown = self.roll_cooldown();
                let point = &mut self.points[index];
                point.spawned = true;
                point.cooldown = cooldown;
                continue;
            }

            if point.cooldown > 0 {
                point.cooldown -= 1;
                continue;
            }
            spawned.push(self.spawn_one(index, grid, events));
            self.points[index].cooldown = self.roll_cooldown();
        }

        spawned
    }

    fn roll_cooldown(&mut self) -> u32 {
        let (min, max) = (self.tuning.respawn_ticks_min, self.tuning.respawn_ticks_max);
        self.rng.u32(min.min(max)..=min.max(max))
    }

    /// Finds a placement near the point. Candidates on obstacles are
    /// skipped for a bounded number of attempts; after that the last
    /// candidate is used anyway.
    fn place(&mut self, index: usize, grid: &NavGrid) -> Coord {
        let point = &mut self.points[index];
        let mut candidate = point.position;
        for attempt in 0..self.tuning.placement_attempts.max(1) {
            candidate = point.position + point.cursor.offset(self.tuning.ring_spacing);
            point.cursor.advance();
            if grid.is_free_at(candidate) {
                return candidate;
            }
            trace!(spawn_point = point.id.raw(), attempt, ?candidate, "Placement blocked");
        }
        debug!(spawn_point = point.id.raw(), ?candidate, "No free placement, using last candidate");
        candidate
    }

    fn spawn_one(&mut self, index: usize, grid: &NavGrid, events: &EventBus) -> Hostile {
        let position = self.place(index, grid);
        let point = &mut self.points[index];
        let hostile = Hostile::new(
            EntityId::new(),
            point.kind,
            position,
            &self.hostile_tuning,
            &mut self.rng,
        )
        .with_spawn_point(point.id);
        point.population.push(hostile.id());
        events.publish(GameEvent::HostileSpawned {
            entity_id: hostile.id(),
            spawn_point: point.id,
        });
        hostile
    }

    /// Forgets a hostile that left the level.
    pub fn remove_hostile(&mut self, spawn_point: SpawnPointId, id: EntityId) -> bool {
        let Some(point) = self.points.get_mut(spawn_point.index()) else {
            return false;
        };
        let before = point.population.len();
        point.population.retain(|member| *member != id);
        point.population.len() != before
    }

    /// Returns every spawn point to its dormant state.
    ///
    /// Returns the ids of the hostiles that were still alive so the caller
    /// can unregister them. A second reset returns nothing.
    pub fn reset(&mut self) -> Vec<EntityId> {
        let mut removed = Vec::new();
        for point in &mut self.points {
            removed.append(&mut point.population);
            point.spawned = false;
            point.active = false;
            point.cursor = PlacementCursor::default();
            point.cooldown = 0;
        }
        debug!(removed = removed.len(), "Spawn points reset");
        removed
    }
}
