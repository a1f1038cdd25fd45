//! Error types for maestro-skills

use thiserror::Error;

/// Skill system error type
#[derive(Debug, Error)]
pub enum Error {
    /// Intent payload failed validation
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    /// Category definition failed validation
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
