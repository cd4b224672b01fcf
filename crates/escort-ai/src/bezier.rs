//! Curve smoothing with piecewise cubic Bezier segments.
//!
//! Control points are chosen so the curve passes through every input point
//! with continuous first and second derivatives at the joins. The first
//! control points come from a tridiagonal system solved per axis; the
//! second control points follow from them.

use escort_common::Coord;

/// Control points of one cubic segment between two consecutive knots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    /// Segment start (a knot)
    pub start: Coord,
    /// First control point
    pub control1: Coord,
    /// Second control point
    pub control2: Coord,
    /// Segment end (the next knot)
    pub end: Coord,
}

impl CubicSegment {
    /// Evaluates the segment at `t` in `[0, 1]`.
    #[must_use]
    pub fn point_at(&self, t: f32) -> Coord {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        Coord::new(
            b0 * self.start.x + b1 * self.control1.x + b2 * self.control2.x + b3 * self.end.x,
            b0 * self.start.y + b1 * self.control1.y + b2 * self.control2.y + b3 * self.end.y,
        )
    }
}

/// Computes the cubic segments of a smooth curve through `knots`.
///
/// Returns no segments for fewer than two knots.
#[must_use]
pub fn control_segments(knots: &[Coord]) -> Vec<CubicSegment> {
    if knots.len() < 2 {
        return Vec::new();
    }
    let n = knots.len() - 1;

    if n == 1 {
        let control1 = Coord::new(
            (2.0 * knots[0].x + knots[1].x) / 3.0,
            (2.0 * knots[0].y + knots[1].y) / 3.0,
        );
        let control2 = Coord::new(
            2.0 * control1.x - knots[0].x,
            2.0 * control1.y - knots[0].y,
        );
        return vec![CubicSegment {
            start: knots[0],
            control1,
            control2,
            end: knots[1],
        }];
    }

    let first_x = solve_first_controls(&right_hand_side(knots, |c| c.x));
    let first_y = solve_first_controls(&right_hand_side(knots, |c| c.y));

    (0..n)
        .map(|i| {
            let control1 = Coord::new(first_x[i], first_y[i]);
            let control2 = if i < n - 1 {
                Coord::new(
                    2.0 * knots[i + 1].x - first_x[i + 1],
                    2.0 * knots[i + 1].y - first_y[i + 1],
                )
            } else {
                Coord::new(
                    (knots[n].x + first_x[n - 1]) / 2.0,
                    (knots[n].y + first_y[n - 1]) / 2.0,
                )
            };
            CubicSegment {
                start: knots[i],
                control1,
                control2,
                end: knots[i + 1],
            }
        })
        .collect()
}

fn right_hand_side(knots: &[Coord], axis: impl Fn(Coord) -> f32) -> Vec<f32> {
    let n = knots.len() - 1;
    let mut rhs = vec![0.0; n];
    for i in 1..n - 1 {
        rhs[i] = 4.0 * axis(knots[i]) + 2.0 * axis(knots[i + 1]);
    }
    rhs[0] = axis(knots[0]) + 2.0 * axis(knots[1]);
    rhs[n - 1] = (8.0 * axis(knots[n - 1]) + axis(knots[n])) / 2.0;
    rhs
}

/// Thomas algorithm for the first-control-point system.
fn solve_first_controls(rhs: &[f32]) -> Vec<f32> {
    let n = rhs.len();
    let mut solution = vec![0.0; n];
    let mut scratch = vec![0.0; n];

    let mut b = 2.0;
    solution[0] = rhs[0] / b;
    for i in 1..n {
        scratch[i] = 1.0 / b;
        b = if i < n - 1 { 4.0 } else { 3.5 } - scratch[i];
        solution[i] = (rhs[i] - solution[i - 1]) / b;
    }
    for i in 1..n {
        solution[n - i - 1] -= scratch[n - i] * solution[n - i];
    }
    solution
}

/// Produces a denser, smoothed polyline through `points`.
///
/// Each segment is sampled at `subdivision` evenly spaced parameters
/// starting at its first knot, and the final knot is appended. Input with
/// fewer than two points is returned unchanged.
#[must_use]
pub fn bezier_path(points: &[Coord], subdivision: usize) -> Vec<Coord> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let subdivision = subdivision.max(1);
    let segments = control_segments(points);

    let mut result = Vec::with_capacity(segments.len() * subdivision + 1);
    for segment in &segments {
        for step in 0..subdivision {
            let t = step as f32 / subdivision as f32;
            result.push(segment.point_at(t));
        }
    }
    if let Some(last) = points.last() {
        result.push(*last);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Coord, b: Coord) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn test_bezier_path_passes_through_knots() {
        let knots = [
            Coord::new(0.0, 0.0),
            Coord::new(100.0, 0.0),
            Coord::new(100.0, 100.0),
            Coord::new(200.0, 150.0),
        ];
        let path = bezier_path(&knots, 4);
        assert_eq!(path.len(), 3 * 4 + 1);
        for (i, knot) in knots.iter().enumerate() {
            assert!(approx(path[i * 4], *knot), "knot {i} missing: {:?}", path[i * 4]);
        }
    }

    #[test]
    fn test_two_points_form_a_straight_line() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(90.0, 0.0);
        let path = bezier_path(&[a, b], 3);
        assert_eq!(path.len(), 4);
        for point in &path {
            assert!(point.y.abs() < 1e-4);
        }
        assert!(path.windows(2).all(|w| w[0].x < w[1].x));
        assert!(approx(path[3], b));
    }

    #[test]
    fn test_curve_is_smooth_at_joins() {
        let knots = [
            Coord::new(0.0, 0.0),
            Coord::new(50.0, 40.0),
            Coord::new(120.0, 10.0),
        ];
        let segments = control_segments(&knots);
        assert_eq!(segments.len(), 2);
        let incoming = segments[0].end - segments[0].control2;
        let outgoing = segments[1].control1 - segments[1].start;
        assert!(approx(incoming, outgoing), "tangent must be continuous");
    }

    #[test]
    fn test_degenerate_input_is_returned_unchanged() {
        assert!(bezier_path(&[], 4).is_empty());
        let single = [Coord::new(3.0, 4.0)];
        assert_eq!(bezier_path(&single, 4), single.to_vec());
    }

    #[test]
    fn test_zero_subdivision_is_treated_as_one() {
        let path = bezier_path(&[Coord::ZERO, Coord::new(10.0, 0.0)], 0);
        assert_eq!(path, vec![Coord::ZERO, Coord::new(10.0, 0.0)]);
    }
}
