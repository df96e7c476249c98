//! Temporally-averaged regional grids.

use serde::{Deserialize, Serialize};

use crate::cube::CubeError;

/// A 2-D grid of per-cell temporal means with per-cell sample counts.
///
/// A cell with `valid_counts == 0` is *no-data*: its entry in `means` is
/// meaningless and never exposed. [`RegionalMeanGrid::mean_at`] is the
/// only sanctioned read path for cell values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionalMeanGrid {
    variable: String,
    units: String,
    lats: Vec<f64>,
    lons: Vec<f64>,
    /// Row-major `[lat][lon]`. Undefined where the matching count is 0.
    means: Vec<f64>,
    valid_counts: Vec<u32>,
}

impl RegionalMeanGrid {
    pub fn new(
        variable: impl Into<String>,
        units: impl Into<String>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        means: Vec<f64>,
        valid_counts: Vec<u32>,
    ) -> Result<Self, CubeError> {
        let expected = lats.len() * lons.len();
        if means.len() != expected {
            return Err(CubeError::ShapeMismatch {
                expected,
                actual: means.len(),
            });
        }
        if valid_counts.len() != expected {
            return Err(CubeError::ShapeMismatch {
                expected,
                actual: valid_counts.len(),
            });
        }

        Ok(Self {
            variable: variable.into(),
            units: units.into(),
            lats,
            lons,
            means,
            valid_counts,
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Grid width (number of longitude cells).
    pub fn width(&self) -> usize {
        self.lons.len()
    }

    /// Grid height (number of latitude cells).
    pub fn height(&self) -> usize {
        self.lats.len()
    }

    /// Per-cell mean, `None` for no-data cells.
    pub fn mean_at(&self, j: usize, i: usize) -> Option<f64> {
        let idx = j * self.lons.len() + i;
        if self.valid_counts[idx] == 0 {
            None
        } else {
            Some(self.means[idx])
        }
    }

    /// Number of valid time samples behind a cell's mean.
    pub fn valid_count_at(&self, j: usize, i: usize) -> u32 {
        self.valid_counts[j * self.lons.len() + i]
    }

    /// Number of no-data cells in the grid.
    pub fn missing_cells(&self) -> usize {
        self.valid_counts.iter().filter(|&&c| c == 0).count()
    }

    /// Whole-region scalar mean over valid cells, `None` if every cell is
    /// no-data.
    ///
    /// Area-unweighted: acceptable in near-uniform latitude bands, an
    /// approximation elsewhere.
    pub fn region_mean(&self) -> Option<f64> {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for (mean, &valid) in self.means.iter().zip(&self.valid_counts) {
            if valid > 0 {
                sum += mean;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}
