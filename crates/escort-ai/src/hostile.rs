//! Hostile state machine.
//!
//! Hostiles idle until the player or the companion comes within detection
//! range, then walk straight at the nearest one. Hits move them through a
//! short hit animation or into their death animation; once that has played
//! the hostile reports [`HostileStatus::Dead`] and its owner removes it.

use escort_common::{Coord, EntityId, SpawnPointId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::animation::{advance_frame, AnimationError, EntityPose, FrameTag, FrameTagTable};
use crate::collision::{BodyTag, CollisionSpace};
use crate::config::HostileTuning;
use crate::elite::{elite_animation, EliteAnimations, ElitePhase, EliteState};
use crate::events::{AudioCue, EventBus, GameEvent};

/// Half size of a regular hostile's collision body.
pub const HOSTILE_HALF_EXTENT: f32 = 6.0;

/// Half size of the elite's collision body.
pub const ELITE_HALF_EXTENT: f32 = 12.0;

/// Bodies a walking hostile cannot pass through.
const BLOCKING_TAGS: [BodyTag; 2] = [BodyTag::Wall, BodyTag::Mob];

/// Hostile variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostileKind {
    /// Regular walker
    Basic,
    /// Slow, fragile crawler
    Crawler,
    /// Fast sprinter
    Sprinter,
    /// Two-phase boss
    Elite,
}

impl HostileKind {
    /// Base movement speed before jitter.
    #[must_use]
    pub fn base_speed(self, tuning: &HostileTuning) -> f32 {
        match self {
            Self::Basic => tuning.basic_speed,
            Self::Crawler => tuning.crawler_speed,
            Self::Sprinter => tuning.sprinter_speed,
            Self::Elite => tuning.elite_speed,
        }
    }

    /// Hits needed to kill a fresh hostile of this kind.
    #[must_use]
    pub fn hits_to_die(self, tuning: &HostileTuning) -> u32 {
        match self {
            Self::Basic => tuning.basic_hits,
            Self::Crawler => tuning.crawler_hits,
            Self::Sprinter => tuning.sprinter_hits,
            Self::Elite => tuning.elite_phase1_hits,
        }
    }

    /// Half size of the collision body.
    #[must_use]
    pub const fn half_extent(self) -> f32 {
        match self {
            Self::Elite => ELITE_HALF_EXTENT,
            _ => HOSTILE_HALF_EXTENT,
        }
    }
}

/// Coarse hostile behaviour state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostileState {
    /// No target in range
    Idle,
    /// Moving towards a target
    Walking,
    /// Playing the hit animation
    Hit,
    /// Playing the death animation
    Death,
    /// Death animation finished
    Dead,
}

/// Result of a hostile update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostileStatus {
    /// Still in the level
    Alive,
    /// Must be removed by the owner
    Dead,
}

/// Entity a hostile is chasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    /// The player character
    Player,
    /// The companion
    Companion,
}

/// Frame tags of a regular hostile sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostileAnimations {
    /// Idle loop
    pub idle: FrameTag,
    /// Walk loop
    pub walking: FrameTag,
    /// Hit reaction
    pub hit: FrameTag,
    /// Death, played once
    pub death: FrameTag,
}

impl Default for HostileAnimations {
    fn default() -> Self {
        Self {
            idle: FrameTag::new(0, 3),
            walking: FrameTag::new(4, 11),
            hit: FrameTag::new(12, 14),
            death: FrameTag::new(15, 20),
        }
    }
}

impl HostileAnimations {
    /// Reads the tags from a sprite sheet table.
    pub fn from_table(table: &FrameTagTable) -> Result<Self, AnimationError> {
        Ok(Self {
            idle: table.require("Idle")?,
            walking: table.require("Walking")?,
            hit: table.require("Hit")?,
            death: table.require("Death")?,
        })
    }

    /// Returns the tag for a coarse state.
    #[must_use]
    pub const fn tag(&self, state: HostileState) -> FrameTag {
        match state {
            HostileState::Idle => self.idle,
            HostileState::Walking => self.walking,
            HostileState::Hit => self.hit,
            HostileState::Death | HostileState::Dead => self.death,
        }
    }
}

/// Sprite tags for every hostile kind, loaded once per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostileSprites {
    /// Basic walker
    pub basic: HostileAnimations,
    /// Crawler
    pub crawler: HostileAnimations,
    /// Sprinter
    pub sprinter: HostileAnimations,
    /// Elite
    pub elite: EliteAnimations,
}

/// Everything a hostile reads or writes during its update.
pub struct HostileContext<'a> {
    /// Current tick
    pub tick: u64,
    /// Player position, if the player is in play
    pub player: Option<Coord>,
    /// Companion position, if the companion is alive
    pub companion: Option<Coord>,
    /// Hostile tuning
    pub tuning: &'a HostileTuning,
    /// Sprite tags
    pub sprites: &'a HostileSprites,
    /// Collision space
    pub space: &'a mut dyn CollisionSpace,
    /// Event bus for cues
    pub events: &'a EventBus,
}

/// A hostile entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hostile {
    id: EntityId,
    kind: HostileKind,
    position: Coord,
    angle: f32,
    speed: f32,
    hits_to_die: u32,
    state: HostileState,
    target: Option<TargetKind>,
    spawn_point: Option<SpawnPointId>,
    frame: usize,
    speed_modifier: f32,
    elite: Option<EliteState>,
}

impl Hostile {
    /// Creates a hostile with a speed drawn from the kind's jitter band.
    #[must_use]
    pub fn new(
        id: EntityId,
        kind: HostileKind,
        position: Coord,
        tuning: &HostileTuning,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let jitter = tuning.speed_jitter * (rng.f32() * 2.0 - 1.0);
        let speed = kind.base_speed(tuning) * (1.0 + jitter);
        let elite = (kind == HostileKind::Elite)
            .then(|| EliteState::new(tuning.elite_phase1_hits, tuning.elite_phase2_hits));

        Self {
            id,
            kind,
            position,
            angle: 0.0,
            speed,
            hits_to_die: kind.hits_to_die(tuning),
            state: HostileState::Idle,
            target: None,
            spawn_point: None,
            frame: 0,
            speed_modifier: 1.0,
            elite,
        }
    }

    /// Records the spawn point that owns this hostile.
    #[must_use]
    pub const fn with_spawn_point(mut self, spawn_point: SpawnPointId) -> Self {
        self.spawn_point = Some(spawn_point);
        self
    }

    /// Overrides the rolled speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Hostile id, also used as its collision body id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Hostile variant.
    #[must_use]
    pub const fn kind(&self) -> HostileKind {
        self.kind
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Coord {
        self.position
    }

    /// Facing angle in radians.
    #[must_use]
    pub const fn angle(&self) -> f32 {
        self.angle
    }

    /// Movement speed per tick, before terrain.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Terrain speed multiplier of the last update.
    #[must_use]
    pub const fn speed_modifier(&self) -> f32 {
        self.speed_modifier
    }

    /// Remaining hits in the current life.
    #[must_use]
    pub const fn hits_to_die(&self) -> u32 {
        self.hits_to_die
    }

    /// Coarse behaviour state.
    #[must_use]
    pub const fn state(&self) -> HostileState {
        self.state
    }

    /// Current target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<TargetKind> {
        self.target
    }

    /// Owning spawn point, if it was spawned by one.
    #[must_use]
    pub const fn spawn_point(&self) -> Option<SpawnPointId> {
        self.spawn_point
    }

    /// Current animation frame.
    #[must_use]
    pub const fn frame(&self) -> usize {
        self.frame
    }

    /// Elite phase data, for elites only.
    #[must_use]
    pub const fn elite(&self) -> Option<&EliteState> {
        self.elite.as_ref()
    }

    /// Returns true once the hostile no longer threatens anyone.
    #[must_use]
    pub fn is_dying(&self) -> bool {
        matches!(self.state, HostileState::Death | HostileState::Dead)
    }

    /// Renderer snapshot.
    #[must_use]
    pub const fn pose(&self) -> EntityPose {
        EntityPose {
            id: self.id,
            position: self.position,
            angle: self.angle,
            frame: self.frame,
        }
    }

    /// Frame tag for the current state.
    #[must_use]
    pub fn current_tag(&self, sprites: &HostileSprites) -> FrameTag {
        match (&self.elite, self.kind) {
            (Some(elite), _) => sprites
                .elite
                .tag(elite_animation(elite, self.state, self.hits_to_die)),
            (None, HostileKind::Crawler) => sprites.crawler.tag(self.state),
            (None, HostileKind::Sprinter) => sprites.sprinter.tag(self.state),
            (None, _) => sprites.basic.tag(self.state),
        }
    }

    /// Registers one hit and returns the resulting state.
    ///
    /// Dying hostiles ignore further hits.
    pub fn hit(&mut self) -> HostileState {
        if self.is_dying() {
            return self.state;
        }
        self.hits_to_die = self.hits_to_die.saturating_sub(1);
        self.state = if self.hits_to_die == 0 {
            HostileState::Death
        } else {
            HostileState::Hit
        };
        debug!(id = self.id.raw(), hits_left = self.hits_to_die, state = ?self.state, "Hostile hit");
        self.state
    }

    /// Runs one tick of behaviour and animation.
    pub fn update(&mut self, ctx: &mut HostileContext<'_>) -> HostileStatus {
        if self.state == HostileState::Dead {
            return HostileStatus::Dead;
        }

        self.speed_modifier = 1.0;
        if ctx.space.overlaps(self.id, &[BodyTag::SandTrap]) {
            self.speed_modifier = ctx.tuning.sand_trap_factor;
        }

        match self.state {
            HostileState::Death => {
                if self.current_tag(ctx.sprites).is_last(self.frame) {
                    self.finish_death(ctx.events);
                    if self.state == HostileState::Dead {
                        return HostileStatus::Dead;
                    }
                }
            },
            HostileState::Hit => {
                if self.current_tag(ctx.sprites).is_last(self.frame) {
                    self.state = HostileState::Walking;
                }
            },
            HostileState::Idle | HostileState::Walking => self.chase(ctx),
            HostileState::Dead => {},
        }

        self.frame = advance_frame(self.frame, ctx.tick, self.current_tag(ctx.sprites));
        HostileStatus::Alive
    }

    fn finish_death(&mut self, events: &EventBus) {
        match &mut self.elite {
            Some(elite) if elite.phase == ElitePhase::First => {
                elite.phase = ElitePhase::Daemon;
                self.hits_to_die = elite.phase2_hits;
                self.speed *= 2.0;
                self.state = HostileState::Walking;
                info!(id = self.id.raw(), speed = self.speed, "Elite entered daemon phase");
                events.cue(AudioCue::PhaseTransition);
            },
            Some(_) => {
                self.state = HostileState::Dead;
                info!(id = self.id.raw(), "Elite defeated");
                events.publish(GameEvent::BossDefeated);
            },
            None => {
                self.state = HostileState::Dead;
                debug!(id = self.id.raw(), "Hostile dead");
            },
        }
    }

    /// Picks the nearest target inside its detection range.
    fn select_target(&self, ctx: &HostileContext<'_>) -> Option<(TargetKind, Coord)> {
        let player_range = ctx.tuning.detection_radius;
        let companion_range = ctx.tuning.detection_radius * ctx.tuning.companion_detection_factor;

        let player = ctx
            .player
            .map(|p| (TargetKind::Player, p, self.position.distance(p)))
            .filter(|(_, _, d)| *d <= player_range);
        let companion = ctx
            .companion
            .map(|c| (TargetKind::Companion, c, self.position.distance(c)))
            .filter(|(_, _, d)| *d <= companion_range);

        match (player, companion) {
            (Some(p), Some(c)) => Some(if c.2 < p.2 { (c.0, c.1) } else { (p.0, p.1) }),
            (Some(p), None) => Some((p.0, p.1)),
            (None, Some(c)) => Some((c.0, c.1)),
            (None, None) => None,
        }
    }

    fn chase(&mut self, ctx: &mut HostileContext<'_>) {
        let Some((kind, target)) = self.select_target(ctx) else {
            if self.state == HostileState::Walking {
                debug!(id = self.id.raw(), "Hostile lost its target");
            }
            self.target = None;
            self.state = HostileState::Idle;
            return;
        };

        if self.state == HostileState::Idle {
            debug!(id = self.id.raw(), target = ?kind, "Hostile started chasing");
        }
        self.target = Some(kind);
        self.state = HostileState::Walking;
        self.angle = self.position.angle_to(target);

        let step = self.speed * self.speed_modifier;
        let dx = (target.x - self.position.x).clamp(-step, step);
        let dy = (target.y - self.position.y).clamp(-step, step);
        self.try_move(ctx.space, Coord::new(dx, 0.0));
        self.try_move(ctx.space, Coord::new(0.0, dy));
    }

    fn try_move(&mut self, space: &mut dyn CollisionSpace, delta: Coord) {
        if delta == Coord::ZERO || space.check(self.id, delta, &BLOCKING_TAGS).is_some() {
            return;
        }
        self.position += delta;
        space.set_position(self.id, self.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Body, Space};
    use escort_common::Rect;

    struct Rig {
        space: Space,
        events: EventBus,
        tuning: HostileTuning,
        sprites: HostileSprites,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                space: Space::new(),
                events: EventBus::default(),
                tuning: HostileTuning {
                    speed_jitter: 0.0,
                    ..HostileTuning::default()
                },
                sprites: HostileSprites::default(),
            }
        }

        fn spawn(&mut self, kind: HostileKind, at: Coord) -> Hostile {
            let mut rng = fastrand::Rng::with_seed(7);
            let hostile = Hostile::new(EntityId::new(), kind, at, &self.tuning, &mut rng);
            self.space.insert(Body::new(
                hostile.id(),
                BodyTag::Mob,
                at,
                kind.half_extent(),
                kind.half_extent(),
            ));
            hostile
        }

        fn update(
            &mut self,
            hostile: &mut Hostile,
            tick: u64,
            player: Option<Coord>,
            companion: Option<Coord>,
        ) -> HostileStatus {
            let mut ctx = HostileContext {
                tick,
                player,
                companion,
                tuning: &self.tuning,
                sprites: &self.sprites,
                space: &mut self.space,
                events: &self.events,
            };
            hostile.update(&mut ctx)
        }
    }

    #[test]
    fn test_idle_until_target_in_range() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO);

        rig.update(&mut hostile, 1, Some(Coord::new(500.0, 0.0)), None);
        assert_eq!(hostile.state(), HostileState::Idle);
        assert_eq!(hostile.position(), Coord::ZERO);

        rig.update(&mut hostile, 2, Some(Coord::new(150.0, 0.0)), None);
        assert_eq!(hostile.state(), HostileState::Walking);
        assert_eq!(hostile.target(), Some(TargetKind::Player));
        assert!(hostile.position().x > 0.0);

        rig.update(&mut hostile, 3, Some(Coord::new(900.0, 0.0)), None);
        assert_eq!(hostile.state(), HostileState::Idle);
        assert_eq!(hostile.target(), None);
    }

    #[test]
    fn test_companion_detected_from_farther_away() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO);
        let far = Coord::new(230.0, 0.0);

        rig.update(&mut hostile, 1, Some(far), None);
        assert_eq!(hostile.state(), HostileState::Idle);

        rig.update(&mut hostile, 2, None, Some(far));
        assert_eq!(hostile.state(), HostileState::Walking);
        assert_eq!(hostile.target(), Some(TargetKind::Companion));
    }

    #[test]
    fn test_chases_nearest_target() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO);
        rig.update(
            &mut hostile,
            1,
            Some(Coord::new(120.0, 0.0)),
            Some(Coord::new(-60.0, 0.0)),
        );
        assert_eq!(hostile.target(), Some(TargetKind::Companion));
        assert!(hostile.position().x < 0.0);
    }

    #[test]
    fn test_greedy_per_axis_movement() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO).with_speed(1.0);
        rig.update(&mut hostile, 1, Some(Coord::new(100.0, 20.0)), None);
        assert_eq!(hostile.position(), Coord::new(1.0, 1.0));
        assert!((hostile.angle() - 20.0_f32.atan2(100.0)).abs() < 1e-5);
    }

    #[test]
    fn test_wall_blocks_one_axis_only() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO).with_speed(2.0);
        rig.space.insert(Body::from_rect(
            EntityId::new(),
            BodyTag::Wall,
            Rect::from_origin(7.0, -50.0, 10.0, 100.0),
        ));
        rig.update(&mut hostile, 1, Some(Coord::new(100.0, 50.0)), None);
        assert_eq!(hostile.position(), Coord::new(0.0, 2.0));
        assert_eq!(rig.space.position(hostile.id()), Some(Coord::new(0.0, 2.0)));
    }

    #[test]
    fn test_sand_trap_halves_speed_and_resets() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO).with_speed(2.0);
        let trap = EntityId::new();
        rig.space.insert(Body::from_rect(
            trap,
            BodyTag::SandTrap,
            Rect::from_origin(-20.0, -20.0, 40.0, 40.0),
        ));
        rig.update(&mut hostile, 1, Some(Coord::new(100.0, 0.0)), None);
        assert!((hostile.speed_modifier() - 0.5).abs() < f32::EPSILON);
        assert_eq!(hostile.position(), Coord::new(1.0, 0.0));

        rig.space.remove(trap);
        rig.update(&mut hostile, 2, Some(Coord::new(100.0, 0.0)), None);
        assert!((hostile.speed_modifier() - 1.0).abs() < f32::EPSILON);
        assert_eq!(hostile.position(), Coord::new(3.0, 0.0));
    }

    #[test]
    fn test_hostiles_block_each_other() {
        let mut rig = Rig::new();
        let mut first = rig.spawn(HostileKind::Basic, Coord::ZERO).with_speed(2.0);
        let _second = rig.spawn(HostileKind::Basic, Coord::new(13.0, 0.0));
        rig.update(&mut first, 1, Some(Coord::new(100.0, 0.0)), None);
        assert_eq!(first.position(), Coord::ZERO);
    }

    #[test]
    fn test_hit_point_exhaustion() {
        let rig = Rig::new();
        for kind in [HostileKind::Basic, HostileKind::Crawler, HostileKind::Sprinter] {
            let mut rng = fastrand::Rng::with_seed(1);
            let mut hostile = Hostile::new(EntityId::new(), kind, Coord::ZERO, &rig.tuning, &mut rng);
            let n = kind.hits_to_die(&rig.tuning);
            for _ in 1..n {
                assert_eq!(hostile.hit(), HostileState::Hit);
            }
            assert_eq!(hostile.hit(), HostileState::Death);
            assert_eq!(hostile.hit(), HostileState::Death, "dying hostiles ignore hits");
            assert_eq!(hostile.hits_to_die(), 0);
        }
    }

    #[test]
    fn test_hit_returns_to_walking_after_animation() {
        let mut rig = Rig::new();
        rig.tuning.basic_hits = 3;
        let mut hostile = rig.spawn(HostileKind::Basic, Coord::ZERO);
        let player = Some(Coord::new(50.0, 0.0));
        rig.update(&mut hostile, 1, player, None);
        assert_eq!(hostile.hit(), HostileState::Hit);

        let mut tick = 2;
        while hostile.state() == HostileState::Hit && tick < 100 {
            rig.update(&mut hostile, tick, player, None);
            tick += 1;
        }
        assert_eq!(hostile.state(), HostileState::Walking);
        assert!(tick < 100);
    }

    #[test]
    fn test_death_animation_then_dead() {
        let mut rig = Rig::new();
        let mut hostile = rig.spawn(HostileKind::Crawler, Coord::ZERO);
        assert_eq!(hostile.hit(), HostileState::Death);

        let mut status = HostileStatus::Alive;
        let mut tick = 0;
        while status == HostileStatus::Alive && tick < 200 {
            status = rig.update(&mut hostile, tick, Some(Coord::new(10.0, 0.0)), None);
            if status == HostileStatus::Alive {
                assert_eq!(hostile.position(), Coord::ZERO, "dying hostiles stand still");
            }
            tick += 1;
        }
        assert_eq!(status, HostileStatus::Dead);
        assert_eq!(hostile.state(), HostileState::Dead);
        assert_eq!(rig.update(&mut hostile, tick, None, None), HostileStatus::Dead);
    }

    #[test]
    fn test_elite_two_phases() {
        let mut rig = Rig::new();
        rig.tuning.elite_phase1_hits = 2;
        rig.tuning.elite_phase2_hits = 3;
        let mut elite = rig.spawn(HostileKind::Elite, Coord::ZERO);
        let base_speed = elite.speed();

        elite.hit();
        assert_eq!(elite.hit(), HostileState::Death);

        let mut tick = 0;
        while elite.state() == HostileState::Death && tick < 200 {
            assert_eq!(rig.update(&mut elite, tick, None, None), HostileStatus::Alive);
            tick += 1;
        }
        let phase = elite.elite().expect("elite state");
        assert_eq!(phase.phase, ElitePhase::Daemon);
        assert_eq!(elite.hits_to_die(), 3);
        assert!((elite.speed() - base_speed * 2.0).abs() < 1e-5);
        assert!(rig
            .events
            .drain()
            .contains(&GameEvent::Audio(AudioCue::PhaseTransition)));

        for _ in 0..3 {
            elite.hit();
        }
        assert_eq!(elite.state(), HostileState::Death);

        let mut status = HostileStatus::Alive;
        while status == HostileStatus::Alive && tick < 400 {
            status = rig.update(&mut elite, tick, None, None);
            tick += 1;
        }
        assert_eq!(status, HostileStatus::Dead);
        assert!(rig.events.drain().contains(&GameEvent::BossDefeated));
    }

    #[test]
    fn test_elite_uses_phase_animation() {
        let mut rig = Rig::new();
        let mut elite = rig.spawn(HostileKind::Elite, Coord::ZERO);
        rig.update(&mut elite, 1, None, None);
        let tag = rig.sprites.elite.idle1;
        assert!(elite.frame() >= tag.from && elite.frame() <= tag.to);
    }
}
