//! Error types for rendering.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The render spec is unusable: inverted color-scale bounds, an
    /// unknown colormap id, or incompatible pair geometry.
    #[error("invalid render spec: {0}")]
    InvalidSpec(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// Filesystem failure writing the artifact.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
