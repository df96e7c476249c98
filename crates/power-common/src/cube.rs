//! Multi-dimensional radiation data cubes.
//!
//! A [`DataCube`] owns a flat value buffer plus coordinate vectors, the
//! "array with named axes" the rest of the pipeline works against. Values
//! are laid out `[time][lat][lon]` in row-major order. Slicing produces a
//! [`SlicedCube`] that carries an explicit missing mask instead of the
//! archive's sentinel values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel used by the POWER archive for missing samples.
pub const POWER_FILL_VALUE: f64 = -999.0;

/// An immutable gridded dataset for one variable.
///
/// Invariants, enforced at construction:
/// - `values.len() == times.len() * lats.len() * lons.len()`
/// - coordinate vectors are non-empty and strictly increasing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCube {
    variable: String,
    units: String,
    lats: Vec<f64>,
    lons: Vec<f64>,
    times: Vec<NaiveDate>,
    values: Vec<f64>,
    fill_value: f64,
}

impl DataCube {
    /// Build a cube, validating shape and coordinate monotonicity.
    pub fn new(
        variable: impl Into<String>,
        units: impl Into<String>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        times: Vec<NaiveDate>,
        values: Vec<f64>,
        fill_value: f64,
    ) -> Result<Self, CubeError> {
        check_axis_f64("lat", &lats)?;
        check_axis_f64("lon", &lons)?;
        if times.is_empty() {
            return Err(CubeError::EmptyAxis { axis: "time" });
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CubeError::NonMonotonicAxis { axis: "time" });
        }

        let expected = times.len() * lats.len() * lons.len();
        if values.len() != expected {
            return Err(CubeError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }

        Ok(Self {
            variable: variable.into(),
            units: units.into(),
            lats,
            lons,
            times,
            values,
            fill_value,
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

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    /// Value at (time, lat, lon) indices. Panics on out-of-range indices,
    /// which indicates a slicing bug upstream.
    pub fn value(&self, t: usize, j: usize, i: usize) -> f64 {
        self.values[self.flat_index(t, j, i)]
    }

    /// Whether the sample at (time, lat, lon) is missing: either the
    /// archive sentinel or a non-finite value.
    pub fn is_missing(&self, t: usize, j: usize, i: usize) -> bool {
        let v = self.value(t, j, i);
        !v.is_finite() || v == self.fill_value
    }

    fn flat_index(&self, t: usize, j: usize, i: usize) -> usize {
        (t * self.lats.len() + j) * self.lons.len() + i
    }

    /// Geographic coverage of the grid cell centers.
    pub fn coverage(&self) -> (f64, f64, f64, f64) {
        (
            self.lons[0],
            self.lats[0],
            *self.lons.last().expect("non-empty lon axis"),
            *self.lats.last().expect("non-empty lat axis"),
        )
    }

    /// Temporal coverage of the cube.
    pub fn time_coverage(&self) -> (NaiveDate, NaiveDate) {
        (self.times[0], *self.times.last().expect("non-empty time axis"))
    }
}

fn check_axis_f64(axis: &'static str, coords: &[f64]) -> Result<(), CubeError> {
    if coords.is_empty() {
        return Err(CubeError::EmptyAxis { axis });
    }
    if coords.windows(2).any(|w| w[0] >= w[1]) {
        return Err(CubeError::NonMonotonicAxis { axis });
    }
    Ok(())
}

/// A cube restricted to a bounding box and date range.
///
/// Owns a copy of the subset and a boolean missing mask of the same
/// shape; sentinel handling happens once at slice time so downstream
/// aggregation never sees raw fill values.
#[derive(Debug, Clone)]
pub struct SlicedCube {
    variable: String,
    units: String,
    lats: Vec<f64>,
    lons: Vec<f64>,
    times: Vec<NaiveDate>,
    values: Vec<f64>,
    missing: Vec<bool>,
}

impl SlicedCube {
    pub fn new(
        variable: impl Into<String>,
        units: impl Into<String>,
        lats: Vec<f64>,
        lons: Vec<f64>,
        times: Vec<NaiveDate>,
        values: Vec<f64>,
        missing: Vec<bool>,
    ) -> Result<Self, CubeError> {
        check_axis_f64("lat", &lats)?;
        check_axis_f64("lon", &lons)?;
        if times.is_empty() {
            return Err(CubeError::EmptyAxis { axis: "time" });
        }

        let expected = times.len() * lats.len() * lons.len();
        if values.len() != expected {
            return Err(CubeError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        if missing.len() != expected {
            return Err(CubeError::ShapeMismatch {
                expected,
                actual: missing.len(),
            });
        }

        Ok(Self {
            variable: variable.into(),
            units: units.into(),
            lats,
            lons,
            times,
            values,
            missing,
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

    pub fn times(&self) -> &[NaiveDate] {
        &self.times
    }

    pub fn num_cells(&self) -> usize {
        self.lats.len() * self.lons.len()
    }

    pub fn value(&self, t: usize, j: usize, i: usize) -> f64 {
        self.values[self.flat_index(t, j, i)]
    }

    pub fn is_missing(&self, t: usize, j: usize, i: usize) -> bool {
        self.missing[self.flat_index(t, j, i)]
    }

    fn flat_index(&self, t: usize, j: usize, i: usize) -> usize {
        (t * self.lats.len() + j) * self.lons.len() + i
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CubeError {
    #[error("cube buffer length {actual} does not match coordinate product {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("{axis} axis must be strictly increasing")]
    NonMonotonicAxis { axis: &'static str },

    #[error("{axis} axis is empty")]
    EmptyAxis { axis: &'static str },
}
