//! Deterministic map rendering for regional mean grids.
//!
//! Rendering is a pure function of (grid, spec): fixed color mapping,
//! fixed pixel geometry, fixed compression settings. Identical inputs
//! produce byte-identical artifacts, which the test suite relies on.

pub mod colormap;
pub mod error;
pub mod map;
pub mod png;

pub use colormap::{Color, Colormap};
pub use error::RenderError;
pub use map::{render, render_pair, RenderSpec};
