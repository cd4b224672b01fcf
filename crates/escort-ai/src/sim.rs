//! Level simulation driver.
//!
//! Owns every runtime object of a level and runs them in a fixed order
//! each tick: player, companion, hostiles, spawn points, then the level
//! rules (deaths, checkpoints, level end).

use escort_common::{CheckpointId, Coord, EntityId, EscortResult, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::animation::EntityPose;
use crate::collision::{Body, BodyTag, CollisionSpace, Space};
use crate::companion::{Companion, CompanionAnimations, CompanionContext};
use crate::config::TuningConfig;
use crate::events::{AudioCue, EventBus, GameEvent};
use crate::hostile::{Hostile, HostileContext, HostileKind, HostileSprites, HostileState};
use crate::level::LevelData;
use crate::nav::NavGrid;
use crate::spawner::SpawnController;

/// Half size of the player's collision body.
pub const PLAYER_HALF_EXTENT: f32 = 6.0;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOverReason {
    /// A hostile reached the player
    PlayerKilled,
    /// The companion died
    CompanionLost,
}

/// Result of one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickOutcome {
    /// Play continues
    Running,
    /// The run is over until [`Simulation::respawn`]
    GameOver(GameOverReason),
    /// The player reached the exit after the boss fell
    LevelWon,
}

/// Run statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    /// Hits landed on hostiles
    pub hostiles_hit: u32,
    /// Hostiles removed after their death animation
    pub hostiles_killed: u32,
    /// Times the player was caught
    pub player_deaths: u32,
    /// Times the companion died
    pub companion_deaths: u32,
}

/// Sprite tags for every animated entity in a level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSet {
    /// Hostile sprites
    pub hostiles: HostileSprites,
    /// Companion sprite
    pub companion: CompanionAnimations,
}

/// One running level.
#[derive(Debug)]
pub struct Simulation {
    level: LevelData,
    tuning: TuningConfig,
    sprites: SpriteSet,
    grid: NavGrid,
    space: Space,
    player: EntityId,
    player_position: Coord,
    companion: Companion,
    hostiles: Vec<Hostile>,
    spawner: SpawnController,
    events: EventBus,
    rng: fastrand::Rng,
    confirmed_checkpoint: CheckpointId,
    boss_defeated: bool,
    outcome: TickOutcome,
    tick: u64,
    stats: SimStats,
}

impl Simulation {
    /// Builds a level from its data.
    pub fn new(
        level: &LevelData,
        tuning: TuningConfig,
        sprites: SpriteSet,
        seed: u64,
    ) -> EscortResult<Self> {
        level.validate()?;
        let tuning = tuning.validated();
        let grid = level.build_grid()?;
        let mut space = Space::new();

        for cell in &level.obstacles {
            let center = cell.center(escort_common::CELL_SIZE);
            let half = escort_common::CELL_SIZE as f32 / 2.0;
            space.insert(Body::new(EntityId::new(), BodyTag::Wall, center, half, half));
        }
        for trap in &level.sand_traps {
            space.insert(Body::from_rect(EntityId::new(), BodyTag::SandTrap, *trap));
        }
        for checkpoint in &level.checkpoints {
            space.insert(
                Body::from_rect(EntityId::new(), BodyTag::Checkpoint, checkpoint.area)
                    .with_data(checkpoint.id),
            );
        }
        space.insert(Body::from_rect(EntityId::new(), BodyTag::End, level.end_area));

        let player = EntityId::new();
        space.insert(Body::new(
            player,
            BodyTag::Player,
            level.player_start,
            PLAYER_HALF_EXTENT,
            PLAYER_HALF_EXTENT,
        ));

        let companion = Companion::new(
            EntityId::new(),
            &level.companion_path,
            tuning.companion.clone(),
            sprites.companion,
        )?;
        space.insert(companion.body());

        let spawner = SpawnController::new(
            &level.spawn_points,
            tuning.spawn.clone(),
            tuning.hostile.clone(),
            seed.wrapping_add(1),
        );

        info!(
            width = level.width,
            height = level.height,
            spawn_points = level.spawn_points.len(),
            checkpoints = level.checkpoints.len(),
            "Level loaded"
        );

        Ok(Self {
            level: level.clone(),
            tuning,
            sprites,
            grid,
            space,
            player,
            player_position: level.player_start,
            companion,
            hostiles: Vec::new(),
            spawner,
            events: EventBus::default(),
            rng: fastrand::Rng::with_seed(seed),
            confirmed_checkpoint: CheckpointId::START,
            boss_defeated: false,
            outcome: TickOutcome::Running,
            tick: 0,
            stats: SimStats::default(),
        })
    }

    /// Runs one tick with the player at `player_position`.
    ///
    /// Once the run ended the outcome is latched and the world stays frozen
    /// until [`Self::respawn`].
    pub fn step(&mut self, player_position: Coord) -> TickOutcome {
        if self.outcome != TickOutcome::Running {
            return self.outcome;
        }
        self.tick += 1;

        self.player_position = player_position;
        self.space.set_position(self.player, player_position);

        self.update_companion();
        self.update_hostiles();
        self.update_spawner();

        self.outcome = self.check_rules();
        self.outcome
    }

    fn viewport(&self) -> Rect {
        Rect::from_center(
            self.player_position,
            self.tuning.animation.viewport_width / 2.0,
            self.tuning.animation.viewport_height / 2.0,
        )
    }

    fn update_companion(&mut self) {
        let threats: Vec<Coord> = self
            .hostiles
            .iter()
            .filter(|h| !h.is_dying())
            .map(Hostile::position)
            .collect();
        let viewport = self.viewport();

        let mut ctx = CompanionContext {
            tick: self.tick,
            player: self.player_position,
            player_checkpoint: self.confirmed_checkpoint,
            threats: &threats,
            viewport,
            grid: &self.grid,
            space: &mut self.space,
            events: &self.events,
        };
        self.companion.update(&mut ctx);
    }

    fn update_hostiles(&mut self) {
        let companion = (!self.companion.is_dead()).then(|| self.companion.position());
        let mut ctx = HostileContext {
            tick: self.tick,
            player: Some(self.player_position),
            companion,
            tuning: &self.tuning.hostile,
            sprites: &self.sprites.hostiles,
            space: &mut self.space,
            events: &self.events,
        };
        for hostile in &mut self.hostiles {
            hostile.update(&mut ctx);
        }

        // Compact after the pass so no hostile sees a half-updated list
        let (dead, alive): (Vec<Hostile>, Vec<Hostile>) = std::mem::take(&mut self.hostiles)
            .into_iter()
            .partition(|h| h.state() == HostileState::Dead);
        self.hostiles = alive;

        for hostile in dead {
            self.space.remove(hostile.id());
            if let Some(point) = hostile.spawn_point() {
                self.spawner.remove_hostile(point, hostile.id());
            }
            if hostile.kind() == HostileKind::Elite {
                info!("Boss defeated");
                self.boss_defeated = true;
            }
            self.stats.hostiles_killed += 1;
            self.events.publish(GameEvent::HostileRemoved {
                entity_id: hostile.id(),
            });
        }
    }

    fn update_spawner(&mut self) {
        let spawned = self
            .spawner
            .update(self.player_position, &self.grid, &self.events);
        for hostile in spawned {
            self.register(hostile);
        }
    }

    fn register(&mut self, hostile: Hostile) {
        let half = hostile.kind().half_extent();
        self.space.insert(Body::new(
            hostile.id(),
            BodyTag::Mob,
            hostile.position(),
            half,
            half,
        ));
        self.hostiles.push(hostile);
    }

    /// Returns true if a hostile that is not dying overlaps `body`.
    fn touched_by_hostile(&self, body: EntityId) -> bool {
        let Some(bounds) = self.space.body(body).map(Body::bounds) else {
            return false;
        };
        self.hostiles
            .iter()
            .filter(|h| !h.is_dying())
            .filter_map(|h| self.space.body(h.id()))
            .any(|other| other.bounds().overlaps(&bounds))
    }

    fn check_rules(&mut self) -> TickOutcome {
        if self.touched_by_hostile(self.player) {
            warn!(position = ?self.player_position, "Player caught");
            self.stats.player_deaths += 1;
            return TickOutcome::GameOver(GameOverReason::PlayerKilled);
        }

        if !self.companion.is_dead() && self.touched_by_hostile(self.companion.id()) {
            self.companion.kill(&self.events);
        }
        if self.companion.is_dead() {
            self.stats.companion_deaths += 1;
            return TickOutcome::GameOver(GameOverReason::CompanionLost);
        }

        if let Some(contact) = self
            .space
            .check(self.player, Coord::ZERO, &[BodyTag::Checkpoint])
        {
            let reached = CheckpointId::new(contact.data);
            if reached > self.confirmed_checkpoint && self.companion.is_at_checkpoint() {
                info!(checkpoint = reached.raw(), "Player confirmed checkpoint");
                self.confirmed_checkpoint = reached;
                self.companion.continue_from_checkpoint();
            }
        }

        if self.boss_defeated
            && self
                .space
                .check(self.player, Coord::ZERO, &[BodyTag::End])
                .is_some()
        {
            info!(tick = self.tick, "Level won");
            return TickOutcome::LevelWon;
        }

        TickOutcome::Running
    }

    /// Lands one hit on a hostile.
    ///
    /// Returns the hostile's new state, or `None` if no such hostile exists.
    pub fn hit_hostile(&mut self, id: EntityId) -> Option<HostileState> {
        let hostile = self.hostiles.iter_mut().find(|h| h.id() == id)?;
        if hostile.is_dying() {
            return Some(hostile.state());
        }
        let state = hostile.hit();
        self.stats.hostiles_hit += 1;
        self.events.cue(if state == HostileState::Death {
            AudioCue::HostileDied
        } else {
            AudioCue::HostileHit
        });
        Some(state)
    }

    /// Places a hostile outside of any spawn point.
    pub fn spawn_hostile(&mut self, kind: HostileKind, position: Coord) -> EntityId {
        let hostile = Hostile::new(
            EntityId::new(),
            kind,
            position,
            &self.tuning.hostile,
            &mut self.rng,
        );
        let id = hostile.id();
        debug!(id = id.raw(), ?kind, ?position, "Hostile placed");
        self.register(hostile);
        id
    }

    /// Restarts play from the last confirmed checkpoint.
    ///
    /// Every hostile is removed and spawn points go dormant. The boss stays
    /// defeated.
    pub fn respawn(&mut self) {
        for hostile in self.hostiles.drain(..) {
            self.space.remove(hostile.id());
            self.events.publish(GameEvent::HostileRemoved {
                entity_id: hostile.id(),
            });
        }
        for id in self.spawner.reset() {
            self.space.remove(id);
        }

        let position = self.level.respawn_position(self.confirmed_checkpoint);
        self.player_position = position;
        self.space.set_position(self.player, position);

        let companion_position = position + Coord::new(self.tuning.companion.respawn_offset, 0.0);
        self.companion
            .reset(self.confirmed_checkpoint, companion_position);
        self.space.insert(self.companion.body());

        self.outcome = TickOutcome::Running;
        info!(checkpoint = self.confirmed_checkpoint.raw(), ?position, "Respawned");
    }

    /// Renderer snapshots: companion first, then hostiles.
    #[must_use]
    pub fn poses(&self) -> Vec<EntityPose> {
        std::iter::once(self.companion.pose())
            .chain(self.hostiles.iter().map(Hostile::pose))
            .collect()
    }

    /// Takes every pending event.
    pub fn drain_events(&self) -> Vec<GameEvent> {
        self.events.drain()
    }

    /// Event bus of the level.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Last player position.
    #[must_use]
    pub const fn player_position(&self) -> Coord {
        self.player_position
    }

    /// The companion.
    #[must_use]
    pub const fn companion(&self) -> &Companion {
        &self.companion
    }

    /// Live hostiles.
    #[must_use]
    pub fn hostiles(&self) -> &[Hostile] {
        &self.hostiles
    }

    /// Spawn controller.
    #[must_use]
    pub const fn spawner(&self) -> &SpawnController {
        &self.spawner
    }

    /// Collision space.
    #[must_use]
    pub const fn space(&self) -> &Space {
        &self.space
    }

    /// Navigation grid.
    #[must_use]
    pub const fn grid(&self) -> &NavGrid {
        &self.grid
    }

    /// Level data the simulation was built from.
    #[must_use]
    pub const fn level(&self) -> &LevelData {
        &self.level
    }

    /// Effective tuning after validation.
    #[must_use]
    pub const fn tuning(&self) -> &TuningConfig {
        &self.tuning
    }

    /// Highest checkpoint the player confirmed.
    #[must_use]
    pub const fn confirmed_checkpoint(&self) -> CheckpointId {
        self.confirmed_checkpoint
    }

    /// Whether the elite was killed.
    #[must_use]
    pub const fn boss_defeated(&self) -> bool {
        self.boss_defeated
    }

    /// Outcome of the last tick.
    #[must_use]
    pub const fn outcome(&self) -> TickOutcome {
        self.outcome
    }

    /// Run statistics.
    #[must_use]
    pub const fn stats(&self) -> SimStats {
        self.stats
    }
}
