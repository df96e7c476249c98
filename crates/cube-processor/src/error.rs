//! Error types for slicing and aggregation.

use power_common::CubeError;
use thiserror::Error;

/// Errors raised while restricting a cube to a requested extent.
#[derive(Debug, Error)]
pub enum SliceError {
    /// The requested window has zero overlap with the dataset on one
    /// axis. An empty result is never returned silently.
    #[error("requested {axis} window {requested} is outside dataset coverage {coverage}")]
    OutOfBounds {
        axis: &'static str,
        requested: String,
        coverage: String,
    },

    /// The subset failed the cube shape invariants, which indicates an
    /// indexing bug rather than bad input.
    #[error(transparent)]
    Cube(#[from] CubeError),
}
