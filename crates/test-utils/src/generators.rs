//! Synthetic cube generators with predictable, verifiable values.

use power_common::{cube::POWER_FILL_VALUE, BoundingBox, DataCube, DateRange};

/// Build an ascending coordinate axis covering [min, max] at `step`
/// degrees, endpoints included.
pub fn lat_lon_axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    let count = ((max - min) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|k| min + k as f64 * step).collect()
}

/// A cube holding `value` at every grid cell and time sample.
pub fn constant_cube(
    variable: &str,
    value: f64,
    bbox: &BoundingBox,
    range: &DateRange,
    step: f64,
) -> DataCube {
    let lats = lat_lon_axis(bbox.min_lat, bbox.max_lat, step);
    let lons = lat_lon_axis(bbox.min_lon, bbox.max_lon, step);
    let times: Vec<_> = range.iter_days().collect();
    let values = vec![value; times.len() * lats.len() * lons.len()];

    DataCube::new(
        variable,
        "W/m^2",
        lats,
        lons,
        times,
        values,
        POWER_FILL_VALUE,
    )
    .expect("generated axes are ordered and shape matches")
}

/// Like [`constant_cube`], but every odd time index is the archive
/// sentinel at every cell, so half of each cell's series (rounding up
/// for odd lengths) is valid.
pub fn half_missing_cube(
    variable: &str,
    value: f64,
    bbox: &BoundingBox,
    range: &DateRange,
    step: f64,
) -> DataCube {
    let lats = lat_lon_axis(bbox.min_lat, bbox.max_lat, step);
    let lons = lat_lon_axis(bbox.min_lon, bbox.max_lon, step);
    let times: Vec<_> = range.iter_days().collect();

    let cells = lats.len() * lons.len();
    let mut values = Vec::with_capacity(times.len() * cells);
    for t in 0..times.len() {
        let sample = if t % 2 == 1 { POWER_FILL_VALUE } else { value };
        values.extend(std::iter::repeat(sample).take(cells));
    }

    DataCube::new(
        variable,
        "W/m^2",
        lats,
        lons,
        times,
        values,
        POWER_FILL_VALUE,
    )
    .expect("generated axes are ordered and shape matches")
}

/// A cube whose value at each cell is `base + lat + lon`, constant over
/// time. Lets tests verify that slicing picked the right cells.
pub fn gradient_cube(
    variable: &str,
    base: f64,
    bbox: &BoundingBox,
    range: &DateRange,
    step: f64,
) -> DataCube {
    let lats = lat_lon_axis(bbox.min_lat, bbox.max_lat, step);
    let lons = lat_lon_axis(bbox.min_lon, bbox.max_lon, step);
    let times: Vec<_> = range.iter_days().collect();

    let mut values = Vec::with_capacity(times.len() * lats.len() * lons.len());
    for _ in 0..times.len() {
        for &lat in &lats {
            for &lon in &lons {
                values.push(base + lat + lon);
            }
        }
    }

    DataCube::new(
        variable,
        "W/m^2",
        lats,
        lons,
        times,
        values,
        POWER_FILL_VALUE,
    )
    .expect("generated axes are ordered and shape matches")
}
