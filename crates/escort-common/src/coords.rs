//! Coordinate types for world positions and navigation cells.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// Size of a navigation cell in world units.
pub const CELL_SIZE: i32 = 32;

/// World coordinate in pixels (global position).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    /// X coordinate in world space
    pub x: f32,
    /// Y coordinate in world space
    pub y: f32,
}

impl Coord {
    /// Origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a new world coordinate.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the length of the coordinate treated as a vector.
    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the Euclidean distance to another coordinate.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    /// Returns a unit-length copy of the vector.
    /// Returns `None` if the vector has (near) zero length.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len < f32::EPSILON {
            None
        } else {
            Some(Self::new(self.x / len, self.y / len))
        }
    }

    /// Angle in radians of the vector from `self` towards `target`.
    #[must_use]
    pub fn angle_to(self, target: Self) -> f32 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    /// Unit vector pointing along `angle` (radians).
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// Converts to the navigation cell containing this coordinate.
    #[must_use]
    pub fn to_cell(self) -> Cell {
        Cell::from_world(self, CELL_SIZE)
    }
}

impl Add for Coord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Coord {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Coord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Coord {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Navigation cell coordinate (identifies a cell in the level grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// X coordinate in cell space
    pub x: i32,
    /// Y coordinate in cell space
    pub y: i32,
}

impl Cell {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts a world coordinate to the cell containing it.
    #[must_use]
    pub fn from_world(coord: Coord, cell_size: i32) -> Self {
        let size = cell_size as f32;
        Self {
            x: (coord.x / size).floor() as i32,
            y: (coord.y / size).floor() as i32,
        }
    }

    /// Returns the world coordinate of the centre of this cell.
    #[must_use]
    pub fn center(self, cell_size: i32) -> Coord {
        let half = cell_size / 2;
        Coord::new(
            (self.x * cell_size + half) as f32,
            (self.y * cell_size + half) as f32,
        )
    }

    /// Returns this cell shifted by the given offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Euclidean distance between two cells in cell units.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned world rectangle, used for camera viewports and trigger areas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Minimum X coordinate
    pub min_x: f32,
    /// Minimum Y coordinate
    pub min_y: f32,
    /// Maximum X coordinate
    pub max_x: f32,
    /// Maximum Y coordinate
    pub max_y: f32,
}

impl Rect {
    /// Creates a new rectangle.
    #[must_use]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates a rectangle from its top-left corner and size.
    #[must_use]
    pub fn from_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Creates a rectangle from center and half-extents.
    #[must_use]
    pub fn from_center(center: Coord, half_width: f32, half_height: f32) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    /// Returns the center of the rectangle.
    #[must_use]
    pub fn center(&self) -> Coord {
        Coord::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns the width of the rectangle.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Returns the height of the rectangle.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Checks if this rectangle overlaps with another (touching edges do not count).
    #[must_use]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Checks if a point lies inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Coord) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Returns the rectangle translated by a vector.
    #[must_use]
    pub fn translated(&self, offset: Coord) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_world_uses_floor_division() {
        assert_eq!(Cell::from_world(Coord::new(0.0, 0.0), 32), Cell::new(0, 0));
        assert_eq!(Cell::from_world(Coord::new(31.9, 32.0), 32), Cell::new(0, 1));
        assert_eq!(Cell::from_world(Coord::new(-1.0, 65.0), 32), Cell::new(-1, 2));
    }

    #[test]
    fn test_cell_center() {
        assert_eq!(Cell::new(0, 0).center(32), Coord::new(16.0, 16.0));
        assert_eq!(Cell::new(2, 3).center(32), Coord::new(80.0, 112.0));
    }

    #[test]
    fn test_coord_distance_and_normalize() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f32::EPSILON);

        let n = b.normalized().expect("non-zero vector");
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert!(Coord::ZERO.normalized().is_none());
    }

    #[test]
    fn test_rect_overlaps_and_contains() {
        let a = Rect::from_origin(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_origin(5.0, 5.0, 10.0, 10.0);
        let c = Rect::from_origin(10.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c), "touching edges do not overlap");
        assert!(a.contains(Coord::new(10.0, 10.0)));
        assert!(!a.contains(Coord::new(10.1, 5.0)));
    }

    #[test]
    fn test_angle_to() {
        let a = Coord::new(0.0, 0.0);
        assert!((a.angle_to(Coord::new(0.0, 1.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        let dir = Coord::from_angle(a.angle_to(Coord::new(-2.0, 0.0)));
        assert!((dir.x + 1.0).abs() < 1e-6);
    }
}
