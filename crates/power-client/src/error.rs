//! Error types for archive access.

use thiserror::Error;

/// Errors surfaced by data sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The archive could not be reached after the retry policy exhausted.
    #[error("archive unavailable after {attempts} attempts: {message}")]
    Unavailable { attempts: u32, message: String },

    /// The requested parameter id is not recognized.
    #[error("unknown parameter: {0}")]
    InvalidVariable(String),

    /// The archive rejected the request outright (4xx-equivalent).
    #[error("archive rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be decoded into a cube.
    #[error("failed to decode archive response: {0}")]
    Decode(String),

    /// Cache read/write failure.
    #[error("cache error: {0}")]
    Cache(String),
}

impl SourceError {
    /// Whether retrying could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable { .. })
    }
}

/// Result type for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
