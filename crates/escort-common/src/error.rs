//! Error types for the escort NPC layer.

use thiserror::Error;

/// Top-level error type for escort operations.
#[derive(Debug, Error)]
pub enum EscortError {
    /// Level data errors
    #[error("Level error: {0}")]
    Level(#[from] LevelError),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Level data validation errors.
#[derive(Debug, Error)]
pub enum LevelError {
    /// Grid dimensions are zero
    #[error("Level grid must not be empty ({width}x{height})")]
    EmptyGrid {
        /// Grid width in cells
        width: u32,
        /// Grid height in cells
        height: u32,
    },

    /// An obstacle lies outside the grid
    #[error("Obstacle at ({x}, {y}) is outside the level grid")]
    ObstacleOutOfBounds {
        /// X cell coordinate
        x: i32,
        /// Y cell coordinate
        y: i32,
    },

    /// The companion route needs a start and at least one control point
    #[error("Companion path needs at least 2 points, got {0}")]
    CompanionPathTooShort(usize),

    /// Two checkpoints share the same number
    #[error("Duplicate checkpoint number: {0}")]
    DuplicateCheckpoint(u32),

    /// Too many spawn points to index
    #[error("Too many spawn points: {0}")]
    TooManySpawnPoints(usize),
}

/// Result type alias for escort operations.
pub type EscortResult<T> = Result<T, EscortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let level: EscortError = LevelError::CompanionPathTooShort(1).into();
        assert!(matches!(level, EscortError::Level(_)));
        assert_eq!(
            level.to_string(),
            "Level error: Companion path needs at least 2 points, got 1"
        );

        let io: EscortError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, EscortError::Io(_)));
        assert_eq!(io.to_string(), "IO error: gone");

        let parse = EscortError::Serialization("bad json".to_string());
        assert_eq!(parse.to_string(), "Serialization error: bad json");
    }
}
