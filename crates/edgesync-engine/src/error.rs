//! Engine-specific error types
//!
//! Two taxonomies, matching how failures surface:
//!
//! - [`EngineError`] covers the sync path. Attempt failures here are logged
//!   and swallowed by the scheduler; the next tick is the retry mechanism.
//! - [`PipelineError`] covers the pipeline client, where "the operation was
//!   rejected" is a value ([`crate::pipeline::Submission::Rejected`] /
//!   [`crate::pipeline::PipelineOutcome::Rejected`]) and only "the operation
//!   could not be attempted" is an error.

use thiserror::Error;

/// Result type alias for sync-path operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Result type alias for pipeline-client operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Error type for the sync path
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote configuration option missing: {0}")]
    MissingOption(String),
}

/// Error type for the pipeline client
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Malformed pipeline response: {0}")]
    MalformedResponse(String),

    #[error("Unrecognized pipeline status after retry budget: {raw}")]
    MalformedStatus { raw: String },

    #[error("Pipeline status polling exhausted after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("Pipeline polling cancelled")]
    Cancelled,
}
