use serde_json;
use thiserror::Error;

use crate::dice::DieSpec;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

// Enum for handling various application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("AI error: {0}")]
    AI(#[from] AIError), // Errors from the generation service.

    #[error("Game error: {0}")]
    Game(#[from] GameError), // Errors specific to game rules or session state.

    #[error("Save error: {0}")]
    Save(#[from] SaveError), // Errors from the persistence layer.

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

// Enum for game-specific errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid die type: {0}")]
    InvalidDieType(String), // Token or face count outside d4..d100.

    #[error("Invalid ability score for point buy: {0}")]
    InvalidScore(u8),

    #[error("Study check used out of order: {0}")]
    StateContractViolation(StudyCheckViolation),

    #[error("The Game Master is still answering the previous message")]
    SessionBusy,

    #[error("No character sheet loaded")]
    NoCharacter,
}

// The two ways of driving a study check out of order.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum StudyCheckViolation {
    #[error("a study check for a {0} roll is already active")]
    AlreadyActive(DieSpec),

    #[error("no study check is active")]
    NotActive,
}

// Errors from the generation service are kept apart so the session can turn
// them into chat messages instead of aborting.
#[derive(Debug, Error)]
pub enum AIError {
    #[error("No API key configured. Add your OpenAI API key in the settings.")]
    NotConfigured,

    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("Timeout occurred")]
    Timeout,

    #[error("The Game Master returned an empty response")]
    EmptyResponse,

    #[error("Failed to build the request context: {0}")]
    Context(String),
}

impl AIError {
    /// Missing credentials never go away by retrying.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AIError::NotConfigured)
    }
}

impl From<serde_json::Error> for AIError {
    fn from(err: serde_json::Error) -> AIError {
        AIError::Context(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed save file: {0}")]
    MalformedSnapshot(String),

    #[error("Save not found: {0}")]
    NotFound(String),

    #[error("Invalid save name: {0:?}")]
    InvalidName(String),
}
