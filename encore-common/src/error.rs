//! Common error types for Encore

use thiserror::Error;

/// Common result type for Encore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Encore crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps mongodb::error::Error)
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unique-index violation (slug or email already taken)
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// Missing or expired credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Media host request failure
    #[error("Media host error: {0}")]
    Media(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
