//! Pipeline run configuration.
//!
//! A run is described either by a YAML file or by CLI flags; flags win
//! over file values. Raw config fields are validated into the typed
//! bounding box and date range before the pipeline starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use power_common::{BoundingBox, DateRange};
use serde::{Deserialize, Serialize};

fn default_colormap() -> String {
    "viridis".to_string()
}

fn default_scale_min() -> f64 {
    0.0
}

fn default_scale_max() -> f64 {
    500.0
}

fn default_pixel_scale() -> usize {
    8
}

fn default_max_concurrent() -> usize {
    4
}

/// Raw run configuration as loaded from YAML or assembled from flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Variables to process, in report order.
    pub variables: Vec<String>,

    /// Inclusive start date (YYYY-MM-DD).
    pub start: NaiveDate,
    /// Inclusive end date (YYYY-MM-DD).
    pub end: NaiveDate,

    /// Region of interest: "min_lon,min_lat,max_lon,max_lat".
    pub bounding_box: String,

    /// Directory receiving all artifacts.
    pub output_directory: PathBuf,

    /// Default colormap id for every variable.
    #[serde(default = "default_colormap")]
    pub colormap: String,

    /// Per-variable colormap overrides.
    #[serde(default)]
    pub colormap_overrides: HashMap<String, String>,

    /// Color-scale lower bound in the variable's units.
    #[serde(default = "default_scale_min")]
    pub scale_min: f64,

    /// Color-scale upper bound in the variable's units.
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,

    /// Square pixel block per grid cell in rendered maps.
    #[serde(default = "default_pixel_scale")]
    pub pixel_scale: usize,

    /// Worker pool width: variables processed concurrently.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Also render the first two variables side by side.
    #[serde(default)]
    pub combined: bool,

    /// Disk cache directory for fetched cubes. Disabled when unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Disk cache freshness bound in seconds. Unset entries never expire.
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

/// Validated, typed view of a [`PipelineConfig`].
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub variables: Vec<String>,
    pub range: DateRange,
    pub bbox: BoundingBox,
    pub output_directory: PathBuf,
    pub scale_min: f64,
    pub scale_max: f64,
    pub pixel_scale: usize,
    pub max_concurrent: usize,
    pub combined: bool,
}

impl PipelineConfig {
    /// Load from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Colormap id for a variable, honoring overrides.
    pub fn colormap_for(&self, variable: &str) -> &str {
        self.colormap_overrides
            .get(variable)
            .map(String::as_str)
            .unwrap_or(&self.colormap)
    }

    /// Validate into typed structures.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        if self.variables.is_empty() {
            anyhow::bail!("at least one variable is required");
        }

        let range = DateRange::new(self.start, self.end).context("invalid date range")?;
        let bbox =
            BoundingBox::from_arg_string(&self.bounding_box).context("invalid bounding box")?;

        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be > 0");
        }

        Ok(ResolvedConfig {
            variables: self.variables.clone(),
            range,
            bbox,
            output_directory: self.output_directory.clone(),
            scale_min: self.scale_min,
            scale_max: self.scale_max,
            pixel_scale: self.pixel_scale,
            max_concurrent: self.max_concurrent,
            combined: self.combined,
        })
    }
}
