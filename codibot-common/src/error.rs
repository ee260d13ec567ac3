//! Common error types for codibot

use thiserror::Error;

/// Common result type for codibot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the codibot crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store operation exceeded its bounded timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
