//! Companion state machine.
//!
//! The companion walks its authored route while the player stays close,
//! sniffs at every new checkpoint and waits there for the player. Hostiles
//! inside the bark radius switch it into danger mode; closer ones make it
//! flee along short transient paths. Once every hostile is beyond the safe
//! radius it plans a route back to the point where it left its route and
//! carries on from there.

use std::f32::consts::PI;

use escort_common::{CheckpointId, Coord, EntityId, LevelError, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::animation::{advance_frame, AnimationError, EntityPose, FrameTag, FrameTagTable};
use crate::bezier::bezier_path;
use crate::collision::{Body, BodyTag, CollisionSpace};
use crate::config::CompanionTuning;
use crate::events::{AudioCue, EventBus, GameEvent};
use crate::nav::NavGrid;
use crate::path::Path;

/// Half size of the companion's collision body.
pub const COMPANION_HALF_EXTENT: f32 = 6.0;

/// Top-level companion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanionMode {
    /// No hostile close by
    Normal,
    /// Hostiles are close
    Danger,
    /// The companion died
    Dead,
}

/// Companion sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanionState {
    /// Player too far away
    Waiting,
    /// Following the current path
    Walking,
    /// The next step would run into the player
    Blocked,
    /// Dwelling at a freshly reached checkpoint
    Sniffing,
    /// Done sniffing, waiting for the player at the checkpoint
    WaitingAtCheckpoint,
    /// Alerting about a hostile
    Barking,
    /// Running away from hostiles
    Fleeing,
}

/// Result of a companion update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionStatus {
    /// Still in play
    Alive,
    /// Dead or lost; the level has to be restarted
    Dead,
}

/// Why the companion left its main route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetourKind {
    /// Running away from hostiles
    Flee,
    /// Heading back to the main route
    Return,
}

/// A transient path together with the main-route point to come back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detour {
    /// Why the detour exists
    pub kind: DetourKind,
    /// Transient path being followed
    pub path: Path,
    /// Main-route coordinate where the companion left it
    pub rejoin: Coord,
}

/// Frame tags of the companion sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionAnimations {
    /// Walking and running
    pub walk: FrameTag,
    /// Sniffing and barking
    pub sniff: FrameTag,
    /// Standing still
    pub idle: FrameTag,
}

impl Default for CompanionAnimations {
    fn default() -> Self {
        Self {
            walk: FrameTag::new(0, 7),
            sniff: FrameTag::new(8, 11),
            idle: FrameTag::single(12),
        }
    }
}

impl CompanionAnimations {
    /// Reads the first three tags of the companion sprite sheet in order:
    /// walk, sniff, idle.
    pub fn from_table(table: &FrameTagTable) -> Result<Self, AnimationError> {
        let at = |index: usize| {
            table
                .by_index(index)
                .ok_or_else(|| AnimationError::MissingTag(format!("#{index}")))
        };
        Ok(Self {
            walk: at(0)?,
            sniff: at(1)?,
            idle: at(2)?,
        })
    }

    /// Returns the tag for a sub-state.
    #[must_use]
    pub const fn tag(&self, state: CompanionState) -> FrameTag {
        match state {
            CompanionState::Walking | CompanionState::Fleeing => self.walk,
            CompanionState::Sniffing | CompanionState::Barking => self.sniff,
            CompanionState::Waiting
            | CompanionState::Blocked
            | CompanionState::WaitingAtCheckpoint => self.idle,
        }
    }
}

/// Everything the companion reads or writes during its update.
pub struct CompanionContext<'a> {
    /// Current tick
    pub tick: u64,
    /// Player position
    pub player: Coord,
    /// Highest checkpoint the player has confirmed
    pub player_checkpoint: CheckpointId,
    /// Positions of live hostiles
    pub threats: &'a [Coord],
    /// Visible area of the level
    pub viewport: Rect,
    /// Navigation grid for return routes
    pub grid: &'a NavGrid,
    /// Collision space
    pub space: &'a mut dyn CollisionSpace,
    /// Event bus for cues
    pub events: &'a EventBus,
}

/// The player's companion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    id: EntityId,
    position: Coord,
    angle: f32,
    frame: usize,
    mode: CompanionMode,
    state: CompanionState,
    prev_state: CompanionState,
    main_path: Path,
    detour: Option<Detour>,
    finished: bool,
    checkpoint: CheckpointId,
    at_checkpoint_ticks: u32,
    out_of_sight_ticks: u32,
    tuning: CompanionTuning,
    animations: CompanionAnimations,
}

impl Companion {
    /// Creates a companion at the start of its authored route.
    ///
    /// The control points are smoothed into the main path.
    pub fn new(
        id: EntityId,
        control_points: &[Coord],
        tuning: CompanionTuning,
        animations: CompanionAnimations,
    ) -> Result<Self, LevelError> {
        if control_points.len() < 2 {
            return Err(LevelError::CompanionPathTooShort(control_points.len()));
        }
        let main_path = Path::new(bezier_path(control_points, tuning.main_path_subdivision));
        let position = control_points[0];

        let mut companion = Self {
            id,
            position,
            angle: 0.0,
            frame: 0,
            mode: CompanionMode::Normal,
            state: CompanionState::Waiting,
            prev_state: CompanionState::Waiting,
            main_path,
            detour: None,
            finished: false,
            checkpoint: CheckpointId::START,
            at_checkpoint_ticks: 0,
            out_of_sight_ticks: 0,
            tuning,
            animations,
        };
        companion.turn_towards_path_point();
        Ok(companion)
    }

    /// Companion id, also used as its collision body id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Collision body at the current position.
    #[must_use]
    pub fn body(&self) -> Body {
        Body::new(
            self.id,
            BodyTag::Companion,
            self.position,
            COMPANION_HALF_EXTENT,
            COMPANION_HALF_EXTENT,
        )
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

    /// Current animation frame.
    #[must_use]
    pub const fn frame(&self) -> usize {
        self.frame
    }

    /// Top-level mode.
    #[must_use]
    pub const fn mode(&self) -> CompanionMode {
        self.mode
    }

    /// Current sub-state.
    #[must_use]
    pub const fn state(&self) -> CompanionState {
        self.state
    }

    /// Sub-state at the start of the last update.
    #[must_use]
    pub const fn prev_state(&self) -> CompanionState {
        self.prev_state
    }

    /// The authored main route.
    #[must_use]
    pub const fn main_path(&self) -> &Path {
        &self.main_path
    }

    /// Active detour, if the companion left its main route.
    #[must_use]
    pub const fn detour(&self) -> Option<&Detour> {
        self.detour.as_ref()
    }

    /// Returns true while following the main route.
    #[must_use]
    pub const fn on_main_path(&self) -> bool {
        self.detour.is_none()
    }

    /// Path currently being followed.
    #[must_use]
    pub fn active_path(&self) -> &Path {
        self.detour.as_ref().map_or(&self.main_path, |d| &d.path)
    }

    fn active_path_mut(&mut self) -> &mut Path {
        match &mut self.detour {
            Some(detour) => &mut detour.path,
            None => &mut self.main_path,
        }
    }

    /// Returns true once the end of the main route was reached.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Highest checkpoint the companion has sniffed.
    #[must_use]
    pub const fn checkpoint(&self) -> CheckpointId {
        self.checkpoint
    }

    /// Returns true while the companion waits at a checkpoint for the player.
    #[must_use]
    pub fn is_at_checkpoint(&self) -> bool {
        matches!(
            self.state,
            CompanionState::Sniffing | CompanionState::WaitingAtCheckpoint
        )
    }

    /// Returns true once the companion died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.mode == CompanionMode::Dead
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

    /// Runs one tick of behaviour and animation.
    pub fn update(&mut self, ctx: &mut CompanionContext<'_>) -> CompanionStatus {
        if self.is_dead() {
            return CompanionStatus::Dead;
        }

        self.update_state(ctx);

        if ctx.viewport.contains(self.position) {
            self.out_of_sight_ticks = 0;
        } else {
            self.out_of_sight_ticks += 1;
            if self.out_of_sight_ticks > self.tuning.out_of_sight_limit {
                warn!(ticks = self.out_of_sight_ticks, "Companion out of sight for too long");
                self.kill(ctx.events);
                return CompanionStatus::Dead;
            }
        }

        match self.state {
            CompanionState::Waiting => {},
            CompanionState::Walking | CompanionState::Blocked => self.walk(ctx),
            CompanionState::Sniffing => self.at_checkpoint_ticks += 1,
            CompanionState::WaitingAtCheckpoint => {
                self.at_checkpoint_ticks += 1;
                if self.at_checkpoint_ticks % self.tuning.bark_interval_ticks.max(1) == 0 {
                    ctx.events.cue(AudioCue::WaitingBark);
                }
            },
            CompanionState::Barking => {
                if self.prev_state != CompanionState::Barking {
                    ctx.events.cue(AudioCue::ThreatDetected);
                }
            },
            CompanionState::Fleeing => {
                if let Some(direction) = self.flee_direction(ctx.threats) {
                    self.plan_flee(direction);
                }
                self.follow_path(ctx);
            },
        }

        self.frame = advance_frame(self.frame, ctx.tick, self.animations.tag(self.state));
        ctx.space.set_position(self.id, self.position);
        CompanionStatus::Alive
    }

    /// Marks the companion dead and reports it.
    pub fn kill(&mut self, events: &EventBus) {
        if self.is_dead() {
            return;
        }
        info!(position = ?self.position, "Companion died");
        self.mode = CompanionMode::Dead;
        events.cue(AudioCue::CompanionDied);
        events.publish(GameEvent::CompanionLost);
    }

    /// Resumes walking once the player confirmed the checkpoint.
    pub fn continue_from_checkpoint(&mut self) {
        if self.mode == CompanionMode::Normal {
            debug!(checkpoint = self.checkpoint.raw(), "Companion continues from checkpoint");
            self.state = CompanionState::Walking;
        }
    }

    /// Puts the companion back in play at `position` after a respawn.
    ///
    /// The main route resumes from the point closest to `position`.
    pub fn reset(&mut self, checkpoint: CheckpointId, position: Coord) {
        self.mode = CompanionMode::Normal;
        self.state = CompanionState::Waiting;
        self.prev_state = CompanionState::Waiting;
        self.detour = None;
        self.position = position;
        self.checkpoint = checkpoint;
        self.at_checkpoint_ticks = 0;
        self.out_of_sight_ticks = 0;
        self.frame = 0;
        let closest = self.main_path.closest_point_index(position);
        self.main_path.reset_to(closest);
        self.finished = self.main_path.is_complete();
        self.turn_towards_path_point();
        debug!(cursor = closest, "Companion reset");
    }

    fn update_state(&mut self, ctx: &mut CompanionContext<'_>) {
        self.prev_state = self.state;

        match self.mode {
            CompanionMode::Normal => {
                if self.threatened(ctx.threats, self.tuning.bark_radius) {
                    info!("Companion in danger");
                    self.mode = CompanionMode::Danger;
                    self.state = CompanionState::Barking;
                }
            },
            CompanionMode::Danger => {
                if !self.threatened(ctx.threats, self.tuning.safe_radius) {
                    info!("Companion safe again");
                    self.mode = CompanionMode::Normal;
                    self.state = CompanionState::Waiting;
                }
            },
            CompanionMode::Dead => {},
        }

        match self.mode {
            CompanionMode::Normal => {
                let player_distance = self.position.distance(ctx.player);
                match self.state {
                    CompanionState::Waiting => {
                        if self.prev_state == CompanionState::Fleeing {
                            self.plan_return(ctx.grid);
                        }
                        let radius = if self.finished {
                            self.tuning.following_radius
                        } else {
                            self.tuning.waiting_radius
                        };
                        if player_distance <= radius {
                            self.state = CompanionState::Walking;
                        }
                    },
                    CompanionState::Walking => {
                        if player_distance > self.tuning.waiting_radius {
                            self.state = CompanionState::Waiting;
                        }
                    },
                    CompanionState::Sniffing => {
                        if ctx.player_checkpoint >= self.checkpoint {
                            self.state = CompanionState::Walking;
                        } else if self.at_checkpoint_ticks >= self.tuning.sniff_ticks {
                            self.state = CompanionState::WaitingAtCheckpoint;
                        }
                    },
                    CompanionState::WaitingAtCheckpoint => {
                        if ctx.player_checkpoint >= self.checkpoint {
                            self.state = CompanionState::Walking;
                        }
                    },
                    _ => {},
                }
            },
            CompanionMode::Danger => {
                if self.state == CompanionState::Barking
                    && self.threatened(ctx.threats, self.tuning.flee_radius)
                {
                    debug!("Companion starts fleeing");
                    self.state = CompanionState::Fleeing;
                }
            },
            CompanionMode::Dead => {},
        }
    }

    /// Returns true if any threat is closer than `radius`.
    fn threatened(&self, threats: &[Coord], radius: f32) -> bool {
        threats.iter().any(|t| self.position.distance(*t) < radius)
    }

    /// Normalised resultant of the vectors pointing away from every threat
    /// inside the flee radius, or `None` if nothing is that close.
    fn flee_direction(&self, threats: &[Coord]) -> Option<Coord> {
        let mut resultant = Coord::ZERO;
        let mut in_range = false;
        for threat in threats {
            if self.position.distance(*threat) < self.tuning.flee_radius {
                resultant += self.position - *threat;
                in_range = true;
            }
        }
        if !in_range {
            return None;
        }
        Some(
            resultant
                .normalized()
                .unwrap_or_else(|| Coord::from_angle(self.angle + PI)),
        )
    }

    /// Replaces the transient path with a single point straight away from
    /// the threats. The rejoin point is only recorded when leaving the
    /// main route.
    fn plan_flee(&mut self, direction: Coord) {
        let rejoin = match &self.detour {
            Some(detour) => detour.rejoin,
            None => self
                .main_path
                .current()
                .or_else(|| self.main_path.last())
                .unwrap_or(self.position),
        };
        let target = self.position + direction * self.tuning.flee_path_length;
        self.detour = Some(Detour {
            kind: DetourKind::Flee,
            path: Path::new(vec![target]),
            rejoin,
        });
        self.turn_towards_path_point();
    }

    /// Plans the way back to the rejoin point after fleeing.
    fn plan_return(&mut self, grid: &NavGrid) {
        let Some(rejoin) = self.detour.as_ref().map(|d| d.rejoin) else {
            return;
        };

        let mut points = grid.find_path(self.position, rejoin);
        if let Some(last) = points.last_mut() {
            *last = rejoin;
        } else {
            warn!(from = ?self.position, to = ?rejoin, "No route back to the main path, going straight");
            points = vec![self.position, rejoin];
        }

        let path = Path::new(bezier_path(&points, self.tuning.return_path_subdivision));
        debug!(points = path.len(), "Companion returning to the main path");
        self.detour = Some(Detour {
            kind: DetourKind::Return,
            path,
            rejoin,
        });
        self.turn_towards_path_point();
    }

    fn walk(&mut self, ctx: &mut CompanionContext<'_>) {
        if self.finished {
            self.follow_player(ctx);
        } else {
            self.follow_path(ctx);
        }
    }

    fn follow_player(&mut self, ctx: &mut CompanionContext<'_>) {
        self.angle = self.position.angle_to(ctx.player);
        if self.position.distance(ctx.player) <= self.tuning.follow_stop_distance {
            return;
        }
        let step = Coord::from_angle(self.angle) * self.tuning.walking_speed;
        self.try_move(step, ctx);
    }

    /// Moves along the active path.
    ///
    /// Does nothing once the path is complete, so calling it after the
    /// main route was finished is safe.
    pub fn follow_path(&mut self, ctx: &mut CompanionContext<'_>) {
        let Some(next) = self.active_path().current() else {
            return;
        };

        if self.position.distance(next) < self.tuning.arrival_threshold {
            self.active_path_mut().advance();
            if self.active_path().is_complete() {
                if self.state == CompanionState::Fleeing {
                    match self.flee_direction(ctx.threats) {
                        Some(direction) => self.plan_flee(direction),
                        None => return,
                    }
                } else if self.detour.take().is_none() {
                    info!("Companion reached the end of its route");
                    self.finished = true;
                    return;
                } else {
                    debug!(cursor = self.main_path.cursor(), "Companion back on the main path");
                }
            }
            self.turn_towards_path_point();
            return;
        }

        self.angle = self.position.angle_to(next);
        let speed = if self.state == CompanionState::Fleeing {
            self.tuning.running_speed
        } else {
            self.tuning.walking_speed
        };
        let step = Coord::from_angle(self.angle) * speed;
        self.try_move(step, ctx);
    }

    /// Applies the collision policy of the current state, then moves.
    fn try_move(&mut self, delta: Coord, ctx: &mut CompanionContext<'_>) {
        match self.state {
            CompanionState::Walking => {
                if ctx.space.check(self.id, delta, &[BodyTag::Player]).is_some() {
                    self.state = CompanionState::Blocked;
                    return;
                }
                if let Some(contact) = ctx.space.check(self.id, delta, &[BodyTag::Checkpoint]) {
                    self.reach_checkpoint(CheckpointId::new(contact.data), ctx.events);
                }
                if ctx.space.check(self.id, delta, &[BodyTag::Wall, BodyTag::Mob]).is_some() {
                    return;
                }
            },
            CompanionState::Blocked => {
                if ctx.space.check(self.id, delta, &[BodyTag::Player]).is_some() {
                    return;
                }
                self.state = CompanionState::Walking;
                if ctx.space.check(self.id, delta, &[BodyTag::Wall, BodyTag::Mob]).is_some() {
                    return;
                }
            },
            _ => {
                let blocking = [BodyTag::Wall, BodyTag::Mob, BodyTag::Player];
                if ctx.space.check(self.id, delta, &blocking).is_some() {
                    return;
                }
            },
        }

        self.position += delta;
        ctx.space.set_position(self.id, self.position);
    }

    fn reach_checkpoint(&mut self, checkpoint: CheckpointId, events: &EventBus) {
        if checkpoint <= self.checkpoint {
            return;
        }
        info!(checkpoint = checkpoint.raw(), "Companion reached checkpoint");
        self.checkpoint = checkpoint;
        self.at_checkpoint_ticks = 0;
        self.state = CompanionState::Sniffing;
        events.cue(AudioCue::CheckpointReached);
        events.publish(GameEvent::CheckpointReached { checkpoint });
    }

    fn turn_towards_path_point(&mut self) {
        if let Some(point) = self.active_path().current() {
            self.angle = self.position.angle_to(point);
        }
    }
}
