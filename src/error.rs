//! Error types for the dictation engine

use thiserror::Error;

/// Result type alias using the engine's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the engine can report.
///
/// Typos, reordering, omissions and insertions are never errors; they are
/// part of the comparison result.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input too large: {tokens} tokens exceeds the limit of {limit}")]
    InputTooLarge { tokens: usize, limit: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
