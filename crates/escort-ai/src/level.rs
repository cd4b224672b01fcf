//! Level data supplied by the level loader.
//!
//! Everything here is plain data read once at level start. [`LevelData::validate`]
//! rejects levels the behaviour layer cannot run.

use std::collections::HashSet;

use escort_common::{Cell, CheckpointId, Coord, EscortError, EscortResult, LevelError, Rect};
use serde::{Deserialize, Serialize};

use crate::hostile::HostileKind;
use crate::nav::NavGrid;

/// A checkpoint trigger area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointData {
    /// Checkpoint number, counted from 1
    pub id: u32,
    /// Trigger area
    pub area: Rect,
}

/// A spawn point as authored in the level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPointData {
    /// Center of the spawn pattern
    pub position: Coord,
    /// Population created on first activation, also the population cap
    pub initial_count: usize,
    /// Whether the point keeps replenishing its population
    #[serde(default)]
    pub continuous: bool,
    /// Kind of hostile spawned here
    #[serde(default = "default_kind")]
    pub kind: HostileKind,
}

const fn default_kind() -> HostileKind {
    HostileKind::Basic
}

/// Static description of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Impassable cells
    #[serde(default)]
    pub obstacles: Vec<Cell>,
    /// Areas that slow hostiles down
    #[serde(default)]
    pub sand_traps: Vec<Rect>,
    /// Checkpoint trigger areas
    #[serde(default)]
    pub checkpoints: Vec<CheckpointData>,
    /// Control points of the companion route
    pub companion_path: Vec<Coord>,
    /// Spawn points
    #[serde(default)]
    pub spawn_points: Vec<SpawnPointData>,
    /// Where the player starts
    pub player_start: Coord,
    /// Exit area, usable once the boss is defeated
    pub end_area: Rect,
}

impl LevelData {
    /// Parses a level from JSON and validates it.
    pub fn from_json(json: &str) -> EscortResult<Self> {
        let level: Self =
            serde_json::from_str(json).map_err(|e| EscortError::Serialization(e.to_string()))?;
        level.validate()?;
        Ok(level)
    }

    /// Checks the level for data the behaviour layer cannot handle.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.width == 0 || self.height == 0 {
            return Err(LevelError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if let Some(cell) = self.obstacles.iter().find(|c| {
            c.x < 0 || c.y < 0 || c.x as u32 >= self.width || c.y as u32 >= self.height
        }) {
            return Err(LevelError::ObstacleOutOfBounds { x: cell.x, y: cell.y });
        }
        if self.companion_path.len() < 2 {
            return Err(LevelError::CompanionPathTooShort(self.companion_path.len()));
        }
        let mut seen = HashSet::new();
        for checkpoint in &self.checkpoints {
            if !seen.insert(checkpoint.id) {
                return Err(LevelError::DuplicateCheckpoint(checkpoint.id));
            }
        }
        if self.spawn_points.len() > usize::from(u16::MAX) {
            return Err(LevelError::TooManySpawnPoints(self.spawn_points.len()));
        }
        Ok(())
    }

    /// Builds the navigation grid.
    pub fn build_grid(&self) -> Result<NavGrid, LevelError> {
        NavGrid::new(self.width, self.height, self.obstacles.iter().copied())
    }

    /// Where the player restarts after reaching `checkpoint`.
    #[must_use]
    pub fn respawn_position(&self, checkpoint: CheckpointId) -> Coord {
        if checkpoint == CheckpointId::START {
            return self.player_start;
        }
        self.checkpoints
            .iter()
            .find(|c| c.id == checkpoint.raw())
            .map_or(self.player_start, |c| c.area.center())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "width": 10,
            "height": 8,
            "obstacles": [{"x": 3, "y": 3}, {"x": 3, "y": 4}],
            "checkpoints": [
                {"id": 1, "area": {"min_x": 200.0, "min_y": 0.0, "max_x": 232.0, "max_y": 64.0}}
            ],
            "companion_path": [{"x": 16.0, "y": 16.0}, {"x": 300.0, "y": 16.0}],
            "spawn_points": [
                {"position": {"x": 250.0, "y": 200.0}, "initial_count": 3, "continuous": true},
                {"position": {"x": 100.0, "y": 200.0}, "initial_count": 1, "kind": "Elite"}
            ],
            "player_start": {"x": 16.0, "y": 48.0},
            "end_area": {"min_x": 288.0, "min_y": 0.0, "max_x": 320.0, "max_y": 32.0}
        }"#
    }

    #[test]
    fn test_level_from_json() {
        let level = LevelData::from_json(sample_json()).expect("valid level");
        assert_eq!(level.obstacles.len(), 2);
        assert!(level.sand_traps.is_empty());
        assert_eq!(level.spawn_points[0].kind, HostileKind::Basic);
        assert_eq!(level.spawn_points[1].kind, HostileKind::Elite);
        assert!(!level.spawn_points[1].continuous);

        let grid = level.build_grid().expect("grid");
        assert!(!grid.is_free(Cell::new(3, 3)));
        assert!(grid.is_free(Cell::new(0, 0)));
    }

    #[test]
    fn test_respawn_position() {
        let level = LevelData::from_json(sample_json()).expect("valid level");
        assert_eq!(level.respawn_position(CheckpointId::START), level.player_start);
        assert_eq!(level.respawn_position(CheckpointId::new(1)), Coord::new(216.0, 32.0));
        assert_eq!(level.respawn_position(CheckpointId::new(9)), level.player_start);
    }

    #[test]
    fn test_validation_errors() {
        let mut level = LevelData::from_json(sample_json()).expect("valid level");
        level.companion_path.truncate(1);
        assert!(matches!(level.validate(), Err(LevelError::CompanionPathTooShort(1))));

        let mut level = LevelData::from_json(sample_json()).expect("valid level");
        level.checkpoints.push(level.checkpoints[0]);
        assert!(matches!(level.validate(), Err(LevelError::DuplicateCheckpoint(1))));

        let mut level = LevelData::from_json(sample_json()).expect("valid level");
        level.obstacles.push(Cell::new(10, 0));
        assert!(matches!(
            level.validate(),
            Err(LevelError::ObstacleOutOfBounds { x: 10, y: 0 })
        ));

        assert!(matches!(
            LevelData::from_json("{\"width\": 1}"),
            Err(EscortError::Serialization(_))
        ));
    }
}
