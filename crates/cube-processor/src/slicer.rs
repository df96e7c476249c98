//! Index-range slicing of data cubes.

use chrono::NaiveDate;
use power_common::{BoundingBox, DataCube, DateRange, SlicedCube};
use tracing::debug;

use crate::error::SliceError;

/// Half-open index window [start, end) into one coordinate axis.
fn coord_window(coords: &[f64], min: f64, max: f64) -> (usize, usize) {
    let start = coords.partition_point(|&c| c < min);
    let end = coords.partition_point(|&c| c <= max);
    (start, end)
}

fn time_window(times: &[NaiveDate], range: &DateRange) -> (usize, usize) {
    let start = times.partition_point(|&t| t < range.start);
    let end = times.partition_point(|&t| t <= range.end);
    (start, end)
}

/// Extract the subset of `cube` covered by `range` and `bbox`.
///
/// Grid cells are fixed-resolution, so coordinate matching is exact by
/// construction: a cell is included when its center lies inside the
/// window, never interpolated. Axis order is preserved. Sentinel values
/// in the source become entries in the subset's missing mask.
///
/// A window with zero overlap on any axis is [`SliceError::OutOfBounds`];
/// downstream aggregation never silently averages zero samples.
pub fn slice(
    cube: &DataCube,
    range: &DateRange,
    bbox: &BoundingBox,
) -> Result<SlicedCube, SliceError> {
    let (t0, t1) = time_window(cube.times(), range);
    if t0 == t1 {
        let (start, end) = cube.time_coverage();
        return Err(SliceError::OutOfBounds {
            axis: "time",
            requested: format!("{}..{}", range.start, range.end),
            coverage: format!("{start}..{end}"),
        });
    }

    let (j0, j1) = coord_window(cube.lats(), bbox.min_lat, bbox.max_lat);
    let (i0, i1) = coord_window(cube.lons(), bbox.min_lon, bbox.max_lon);
    if j0 == j1 || i0 == i1 {
        let (min_lon, min_lat, max_lon, max_lat) = cube.coverage();
        return Err(SliceError::OutOfBounds {
            axis: if j0 == j1 { "latitude" } else { "longitude" },
            requested: format!(
                "({},{})..({},{})",
                bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
            ),
            coverage: format!("({min_lon},{min_lat})..({max_lon},{max_lat})"),
        });
    }

    let lats = cube.lats()[j0..j1].to_vec();
    let lons = cube.lons()[i0..i1].to_vec();
    let times = cube.times()[t0..t1].to_vec();

    let mut values = Vec::with_capacity(times.len() * lats.len() * lons.len());
    let mut missing = Vec::with_capacity(values.capacity());

    for t in t0..t1 {
        for j in j0..j1 {
            for i in i0..i1 {
                values.push(cube.value(t, j, i));
                missing.push(cube.is_missing(t, j, i));
            }
        }
    }

    debug!(
        variable = cube.variable(),
        times = times.len(),
        lats = lats.len(),
        lons = lons.len(),
        "Sliced cube"
    );

    Ok(SlicedCube::new(
        cube.variable(),
        cube.units(),
        lats,
        lons,
        times,
        values,
        missing,
    )?)
}

/// Time series for a single grid cell.
#[derive(Debug, Clone)]
pub struct PointSeries {
    /// Center coordinates of the selected cell.
    pub lat: f64,
    pub lon: f64,
    pub times: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub missing: Vec<bool>,
}

/// Select the grid cell nearest to (lat, lon) and return its series over
/// `range`.
pub fn nearest_cell(
    cube: &DataCube,
    lat: f64,
    lon: f64,
    range: &DateRange,
) -> Result<PointSeries, SliceError> {
    let (t0, t1) = time_window(cube.times(), range);
    if t0 == t1 {
        let (start, end) = cube.time_coverage();
        return Err(SliceError::OutOfBounds {
            axis: "time",
            requested: format!("{}..{}", range.start, range.end),
            coverage: format!("{start}..{end}"),
        });
    }

    let j = nearest_index(cube.lats(), lat);
    let i = nearest_index(cube.lons(), lon);

    let times = cube.times()[t0..t1].to_vec();
    let mut values = Vec::with_capacity(times.len());
    let mut missing = Vec::with_capacity(times.len());
    for t in t0..t1 {
        values.push(cube.value(t, j, i));
        missing.push(cube.is_missing(t, j, i));
    }

    Ok(PointSeries {
        lat: cube.lats()[j],
        lon: cube.lons()[i],
        times,
        values,
        missing,
    })
}

fn nearest_index(coords: &[f64], target: f64) -> usize {
    // Ascending axis: the nearest coordinate neighbors the insertion point.
    let after = coords.partition_point(|&c| c < target);
    if after == 0 {
        return 0;
    }
    if after == coords.len() {
        return coords.len() - 1;
    }
    if (coords[after] - target).abs() < (target - coords[after - 1]).abs() {
        after
    } else {
        after - 1
    }
}
