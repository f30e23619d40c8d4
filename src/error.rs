use thiserror::Error;

use crate::game::GameType;

/// Errors surfaced by the core and its storage collaborators.
///
/// Input arriving in a state that cannot accept it is not an error; handlers
/// report it as [`crate::game::InputStatus::Ignored`].
#[derive(Debug, Error)]
pub enum GymError {
    /// A trial was requested for a parameter outside the supported range.
    #[error("invalid difficulty for {game}: {reason}")]
    InvalidDifficulty { game: GameType, reason: String },

    #[error("record store error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid import: {0}")]
    InvalidImport(String),
}

impl GymError {
    pub fn invalid_difficulty(game: GameType, reason: impl Into<String>) -> Self {
        GymError::InvalidDifficulty {
            game,
            reason: reason.into(),
        }
    }

    /// True for failures of the record store rather than of the game logic.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            GymError::Persistence(_) | GymError::Io(_) | GymError::Json(_) | GymError::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GymError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_difficulty_message_names_the_game() {
        let err = GymError::invalid_difficulty(GameType::SequenceMemory, "length 12 > 9");
        assert_eq!(
            err.to_string(),
            "invalid difficulty for sequence-memory: length 12 > 9"
        );
        assert!(!err.is_persistence());
    }

    #[test]
    fn storage_errors_are_persistence_failures() {
        let err: GymError = std::io::Error::new(std::io::ErrorKind::Other, "quota").into();
        assert!(err.is_persistence());
    }
}
