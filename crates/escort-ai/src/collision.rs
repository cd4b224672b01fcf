//! Collision space queried by the behaviour layer.
//!
//! The [`CollisionSpace`] trait is the sole arbiter of "can I move here":
//! a mover asks whether its body, shifted by a delta, would touch any body
//! carrying one of the requested tags. [`Space`] is the in-memory
//! implementation used by the simulation and the tests.

use escort_common::{Coord, EntityId, Rect};
use serde::{Deserialize, Serialize};

/// Category of a collision body, used to filter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyTag {
    /// The player character
    Player,
    /// The companion
    Companion,
    /// A hostile
    Mob,
    /// Impassable level geometry
    Wall,
    /// Checkpoint trigger area (data = checkpoint number)
    Checkpoint,
    /// Terrain that slows hostiles down
    SandTrap,
    /// Level exit
    End,
}

/// A body registered in the collision space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Body identifier
    pub id: EntityId,
    /// Body category
    pub tag: BodyTag,
    /// Center of the body
    pub center: Coord,
    /// Half of the body width
    pub half_width: f32,
    /// Half of the body height
    pub half_height: f32,
    /// Extra payload (checkpoint number for checkpoint areas)
    pub data: u32,
}

impl Body {
    /// Creates a body centred on `center`.
    #[must_use]
    pub fn new(id: EntityId, tag: BodyTag, center: Coord, half_width: f32, half_height: f32) -> Self {
        Self {
            id,
            tag,
            center,
            half_width,
            half_height,
            data: 0,
        }
    }

    /// Creates a body covering an axis-aligned rectangle.
    #[must_use]
    pub fn from_rect(id: EntityId, tag: BodyTag, rect: Rect) -> Self {
        Self::new(id, tag, rect.center(), rect.width() / 2.0, rect.height() / 2.0)
    }

    /// Sets the payload.
    #[must_use]
    pub const fn with_data(mut self, data: u32) -> Self {
        self.data = data;
        self
    }

    /// Returns the bounds of the body.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center, self.half_width, self.half_height)
    }
}

/// A body reported by a collision query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    /// Body that was hit
    pub body: EntityId,
    /// Category of the body that was hit
    pub tag: BodyTag,
    /// Payload of the body that was hit
    pub data: u32,
}

/// Collision query interface.
///
/// Implementations are synchronous and authoritative.
pub trait CollisionSpace {
    /// Returns the first body with one of `tags` that `body` would overlap
    /// after moving by `delta`, or `None` if the move is clear.
    fn check(&self, body: EntityId, delta: Coord, tags: &[BodyTag]) -> Option<Contact>;

    /// Returns the current center of a body.
    fn position(&self, body: EntityId) -> Option<Coord>;

    /// Moves a body to a new center.
    fn set_position(&mut self, body: EntityId, center: Coord);

    /// Registers a body.
    fn insert(&mut self, body: Body);

    /// Unregisters a body. Returns false if it was not registered.
    fn remove(&mut self, body: EntityId) -> bool;

    /// Returns true if `body` currently overlaps a body with one of `tags`.
    fn overlaps(&self, body: EntityId, tags: &[BodyTag]) -> bool {
        self.check(body, Coord::ZERO, tags).is_some()
    }
}

/// In-memory collision space with insertion-ordered bodies.
#[derive(Debug, Clone, Default)]
pub struct Space {
    bodies: Vec<Body>,
}

impl Space {
    /// Creates an empty space.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registered body with the given id.
    #[must_use]
    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.bodies.iter().find(|body| body.id == id)
    }

    /// Returns the number of registered bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns true if no bodies are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Counts bodies with the given tag.
    #[must_use]
    pub fn count_tagged(&self, tag: BodyTag) -> usize {
        self.bodies.iter().filter(|body| body.tag == tag).count()
    }
}

impl CollisionSpace for Space {
    fn check(&self, body: EntityId, delta: Coord, tags: &[BodyTag]) -> Option<Contact> {
        let mover = self.body(body)?;
        let moved = mover.bounds().translated(delta);
        self.bodies
            .iter()
            .filter(|other| other.id != body && tags.contains(&other.tag))
            .find(|other| moved.overlaps(&other.bounds()))
            .map(|other| Contact {
                body: other.id,
                tag: other.tag,
                data: other.data,
            })
    }

    fn position(&self, body: EntityId) -> Option<Coord> {
        self.body(body).map(|b| b.center)
    }

    fn set_position(&mut self, body: EntityId, center: Coord) {
        if let Some(b) = self.bodies.iter_mut().find(|b| b.id == body) {
            b.center = center;
        }
    }

    fn insert(&mut self, body: Body) {
        self.remove(body.id);
        self.bodies.push(body);
    }

    fn remove(&mut self, body: EntityId) -> bool {
        let before = self.bodies.len();
        self.bodies.retain(|b| b.id != body);
        self.bodies.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space_with_wall() -> (Space, EntityId, EntityId) {
        let mut space = Space::new();
        let mover = EntityId::new();
        let wall = EntityId::new();
        space.insert(Body::new(mover, BodyTag::Mob, Coord::new(0.0, 0.0), 4.0, 4.0));
        space.insert(Body::from_rect(
            wall,
            BodyTag::Wall,
            Rect::from_origin(10.0, -16.0, 32.0, 32.0),
        ));
        (space, mover, wall)
    }

    #[test]
    fn test_check_detects_blocked_move() {
        let (space, mover, wall) = space_with_wall();
        assert!(space.check(mover, Coord::new(1.0, 0.0), &[BodyTag::Wall]).is_none());
        let contact = space
            .check(mover, Coord::new(3.0, 0.0), &[BodyTag::Wall])
            .expect("would hit wall");
        assert_eq!(contact.body, wall);
        assert_eq!(contact.tag, BodyTag::Wall);
    }

    #[test]
    fn test_check_filters_by_tag_and_ignores_self() {
        let (space, mover, _) = space_with_wall();
        assert!(space.check(mover, Coord::new(3.0, 0.0), &[BodyTag::Player]).is_none());
        assert!(space.check(mover, Coord::ZERO, &[BodyTag::Mob]).is_none());
    }

    #[test]
    fn test_insert_replaces_and_remove_reports() {
        let (mut space, mover, _) = space_with_wall();
        space.insert(Body::new(mover, BodyTag::Mob, Coord::new(50.0, 50.0), 4.0, 4.0));
        assert_eq!(space.len(), 2);
        assert_eq!(space.position(mover), Some(Coord::new(50.0, 50.0)));
        assert!(space.remove(mover));
        assert!(!space.remove(mover));
        assert!(space.check(mover, Coord::ZERO, &[BodyTag::Wall]).is_none());
    }

    #[test]
    fn test_overlaps_and_checkpoint_data() {
        let mut space = Space::new();
        let player = EntityId::new();
        space.insert(Body::new(player, BodyTag::Player, Coord::new(5.0, 5.0), 4.0, 4.0));
        space.insert(
            Body::from_rect(EntityId::new(), BodyTag::Checkpoint, Rect::from_origin(0.0, 0.0, 16.0, 16.0))
                .with_data(3),
        );
        assert!(space.overlaps(player, &[BodyTag::Checkpoint]));
        let contact = space
            .check(player, Coord::ZERO, &[BodyTag::Checkpoint])
            .expect("inside checkpoint");
        assert_eq!(contact.data, 3);
        space.set_position(player, Coord::new(100.0, 100.0));
        assert!(!space.overlaps(player, &[BodyTag::Checkpoint]));
    }
}
