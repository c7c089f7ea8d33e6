//! ClubMind error types

use thiserror::Error;

/// ClubMind error type
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced session or user does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A backing store or index is unreachable
    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    /// Caller role lacks the required confidentiality tier
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Required field missing or invalid
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ClubMind operations
pub type Result<T> = std::result::Result<T, Error>;
