//! The data-retrieval capability trait.

use async_trait::async_trait;
use power_common::{BoundingBox, DataCube, DateRange};

use crate::error::SourceResult;

/// Retrieval of gridded radiation variables for a time range and spatial
/// extent.
///
/// `bbox == None` requests the archive's full global grid. The returned
/// cube covers at least the requested extent; implementations may
/// over-fetch to grid boundaries.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
    ) -> SourceResult<DataCube>;
}
