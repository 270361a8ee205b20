//! Error types for EdgeSync

use thiserror::Error;

/// Result type alias for EdgeSync operations
pub type Result<T> = std::result::Result<T, EdgeSyncError>;

/// Main error type for EdgeSync
#[derive(Error, Debug)]
pub enum EdgeSyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
