//! Navigation grid and A* path planner.
//!
//! The grid is built once from level data and is read-only afterwards, so
//! every planner call sees the same obstacles.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use escort_common::{Cell, Coord, LevelError, CELL_SIZE};
use tracing::trace;

/// Orthogonal neighbour offsets: north, east, south, west.
const ORTHOGONAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Diagonal neighbour offsets: north-east, south-east, south-west, north-west.
const DIAGONAL_OFFSETS: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Uniform occupancy grid over the level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavGrid {
    width: u32,
    height: u32,
    blocked: Vec<bool>,
}

impl NavGrid {
    /// Creates a grid of `width` x `height` cells with the given obstacles.
    pub fn new(
        width: u32,
        height: u32,
        obstacles: impl IntoIterator<Item = Cell>,
    ) -> Result<Self, LevelError> {
        if width == 0 || height == 0 {
            return Err(LevelError::EmptyGrid { width, height });
        }
        let mut grid = Self {
            width,
            height,
            blocked: vec![false; width as usize * height as usize],
        };
        for cell in obstacles {
            let index = grid
                .index_of(cell)
                .ok_or(LevelError::ObstacleOutOfBounds {
                    x: cell.x,
                    y: cell.y,
                })?;
            grid.blocked[index] = true;
        }
        Ok(grid)
    }

    /// Creates an obstacle-free grid.
    pub fn open(width: u32, height: u32) -> Result<Self, LevelError> {
        Self::new(width, height, std::iter::empty())
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn index_of(&self, cell: Cell) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as u32, cell.y as u32);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Returns true if the cell is inside the grid and not an obstacle.
    #[must_use]
    pub fn is_free(&self, cell: Cell) -> bool {
        self.index_of(cell)
            .and_then(|index| self.blocked.get(index))
            .is_some_and(|blocked| !blocked)
    }

    /// Returns true if the cell containing the world coordinate is free.
    #[must_use]
    pub fn is_free_at(&self, coord: Coord) -> bool {
        self.is_free(coord.to_cell())
    }

    /// Returns the 8-connected neighbours reachable from `cell`.
    ///
    /// A diagonal step is only offered when both orthogonal cells it passes
    /// between are free, so paths never cut a wall corner.
    #[must_use]
    pub fn neighbors(&self, cell: Cell) -> Vec<Cell> {
        let mut result = Vec::with_capacity(8);

        for (dx, dy) in DIAGONAL_OFFSETS {
            let diagonal = cell.offset(dx, dy);
            if self.is_free(diagonal)
                && self.is_free(cell.offset(0, dy))
                && self.is_free(cell.offset(dx, 0))
            {
                result.push(diagonal);
            }
        }

        for (dx, dy) in ORTHOGONAL_OFFSETS {
            let orthogonal = cell.offset(dx, dy);
            if self.is_free(orthogonal) {
                result.push(orthogonal);
            }
        }

        result
    }

    /// Finds a route between two world coordinates.
    ///
    /// Returns cell centres with collinear runs collapsed. An empty vector
    /// means there is no route; callers fall back to direct movement.
    #[must_use]
    pub fn find_path(&self, start: Coord, dest: Coord) -> Vec<Coord> {
        let start_cell = start.to_cell();
        let dest_cell = dest.to_cell();

        let Some(cells) = self.find_cell_path(start_cell, dest_cell) else {
            trace!(?start_cell, ?dest_cell, "no route");
            return Vec::new();
        };

        simplify_path(&cells)
            .into_iter()
            .map(|cell| cell.center(CELL_SIZE))
            .collect()
    }

    /// A* search over cells with a Euclidean heuristic and edge cost.
    ///
    /// The start cell only has to be inside the grid; the goal must be free.
    #[must_use]
    pub fn find_cell_path(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        let start_index = self.index_of(start)?;
        let goal_index = self.index_of(goal)?;
        if !self.is_free(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let node_count = self.blocked.len();
        let mut closed = vec![false; node_count];
        let mut best_g = vec![f32::INFINITY; node_count];
        let mut parent = vec![None::<usize>; node_count];
        let mut open = BinaryHeap::new();
        let mut next_insertion = 0u64;

        best_g[start_index] = 0.0;
        open.push(OpenNode {
            cell: start,
            f_cost: start.distance(goal),
            insertion_order: next_insertion,
        });

        while let Some(current) = open.pop() {
            let Some(current_index) = self.index_of(current.cell) else {
                continue;
            };
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current_index == goal_index {
                return Some(self.reconstruct(&parent, start_index, goal_index));
            }

            let current_g = best_g[current_index];
            for neighbor in self.neighbors(current.cell) {
                let Some(neighbor_index) = self.index_of(neighbor) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }

                let tentative_g = current_g + current.cell.distance(neighbor);
                if tentative_g >= best_g[neighbor_index] {
                    continue;
                }

                best_g[neighbor_index] = tentative_g;
                parent[neighbor_index] = Some(current_index);
                next_insertion += 1;
                open.push(OpenNode {
                    cell: neighbor,
                    f_cost: tentative_g + neighbor.distance(goal),
                    insertion_order: next_insertion,
                });
            }
        }

        None
    }

    fn cell_at(&self, index: usize) -> Cell {
        let width = self.width as usize;
        Cell::new((index % width) as i32, (index / width) as i32)
    }

    fn reconstruct(&self, parent: &[Option<usize>], start_index: usize, goal_index: usize) -> Vec<Cell> {
        let mut cursor = goal_index;
        let mut cells = vec![self.cell_at(cursor)];
        while cursor != start_index {
            match parent[cursor] {
                Some(previous) => cursor = previous,
                None => break,
            }
            cells.push(self.cell_at(cursor));
        }
        cells.reverse();
        cells
    }
}

/// Open-set entry ordered so the heap pops the lowest f-cost first,
/// oldest insertion on ties.
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: Cell,
    f_cost: f32,
    insertion_order: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.insertion_order.cmp(&self.insertion_order))
    }
}

/// Removes points in the middle of straight runs.
///
/// A point is kept when the step leaving it differs from the step that
/// led to it; the first and last points are always kept.
#[must_use]
pub fn simplify_path(path: &[Cell]) -> Vec<Cell> {
    let mut result = Vec::with_capacity(path.len());
    let mut previous_step: Option<(i32, i32)> = None;

    for (index, cell) in path.iter().enumerate() {
        if let Some(next) = path.get(index + 1) {
            let step = (next.x - cell.x, next.y - cell.y);
            if previous_step == Some(step) {
                continue;
            }
            previous_step = Some(step);
        }
        result.push(*cell);
    }

    result
}
