//! Followable paths with a monotonic cursor.

use escort_common::Coord;
use serde::{Deserialize, Serialize};

/// Ordered path points plus the index of the next point to reach.
///
/// The cursor only moves forward through [`Path::advance`]; the only way to
/// move it back is [`Path::reset_to`] or replacing the path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    points: Vec<Coord>,
    next_point: usize,
}

impl Path {
    /// Creates a path starting at its first point.
    #[must_use]
    pub fn new(points: Vec<Coord>) -> Self {
        Self {
            points,
            next_point: 0,
        }
    }

    /// Returns all points of the path.
    #[must_use]
    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the path has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the next point to reach.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.next_point
    }

    /// The next point to reach, or `None` once the path is complete.
    #[must_use]
    pub fn current(&self) -> Option<Coord> {
        self.points.get(self.next_point).copied()
    }

    /// The last point of the path.
    #[must_use]
    pub fn last(&self) -> Option<Coord> {
        self.points.last().copied()
    }

    /// Moves the cursor to the following point. Saturates at the end.
    pub fn advance(&mut self) {
        if self.next_point < self.points.len() {
            self.next_point += 1;
        }
    }

    /// Returns true once every point has been reached.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next_point >= self.points.len()
    }

    /// Explicitly repositions the cursor (clamped to the path length).
    pub fn reset_to(&mut self, index: usize) {
        self.next_point = index.min(self.points.len());
    }

    /// Index of the point closest to `position`, or 0 for an empty path.
    #[must_use]
    pub fn closest_point_index(&self, position: Coord) -> usize {
        self.points
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                position
                    .distance(**a)
                    .total_cmp(&position.distance(**b))
            })
            .map_or(0, |(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(n: usize) -> Path {
        Path::new((0..n).map(|i| Coord::new(i as f32 * 10.0, 0.0)).collect())
    }

    #[test]
    fn test_path_walks_to_completion() {
        let mut path = line(3);
        assert_eq!(path.current(), Some(Coord::new(0.0, 0.0)));
        path.advance();
        path.advance();
        assert_eq!(path.current(), Some(Coord::new(20.0, 0.0)));
        path.advance();
        assert!(path.is_complete());
        assert_eq!(path.current(), None);

        path.advance();
        assert_eq!(path.cursor(), 3, "advance saturates at the end");
    }

    #[test]
    fn test_closest_point_index() {
        let path = line(5);
        assert_eq!(path.closest_point_index(Coord::new(21.0, 5.0)), 2);
        assert_eq!(Path::default().closest_point_index(Coord::ZERO), 0);
    }

    #[test]
    fn test_reset_to_clamps() {
        let mut path = line(2);
        path.reset_to(10);
        assert!(path.is_complete());
        path.reset_to(0);
        assert_eq!(path.cursor(), 0);
    }

    proptest! {
        #[test]
        fn prop_cursor_never_decreases(len in 0usize..20, steps in 0usize..40) {
            let mut path = line(len);
            let mut previous = path.cursor();
            for _ in 0..steps {
                path.advance();
                prop_assert!(path.cursor() >= previous);
                prop_assert!(path.cursor() <= path.len());
                previous = path.cursor();
            }
        }
    }
}
