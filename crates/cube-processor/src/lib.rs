//! Spatio-temporal slicing and regional aggregation.
//!
//! [`slice`] restricts a dataset to a bounding box and date range,
//! converting the archive's sentinel values into an explicit missing
//! mask. [`aggregate`] reduces the sliced cube over time into per-cell
//! means with valid-sample counts.

pub mod aggregate;
pub mod error;
pub mod export;
pub mod slicer;

pub use aggregate::aggregate;
pub use error::SliceError;
pub use export::export_csv;
pub use slicer::{nearest_cell, slice, PointSeries};
