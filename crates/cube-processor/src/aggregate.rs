//! Temporal reduction of sliced cubes into regional mean grids.

use power_common::{RegionalMeanGrid, SlicedCube};
use rayon::prelude::*;
use tracing::debug;

/// Grids below this cell count aggregate on the calling thread; the
/// rayon fan-out costs more than it saves for small regions.
const PARALLEL_CELL_THRESHOLD: usize = 4096;

/// Neumaier-compensated accumulator.
///
/// Plain f64 accumulation is usually adequate for a few thousand daily
/// samples, but compensation keeps the error bounded for multi-decade
/// series and costs one extra add per sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Compute the per-cell temporal mean of all valid samples.
///
/// Cells with zero valid samples are no-data in the output; the count
/// vector records how many samples back each mean. The reduction never
/// reads masked values, so sentinel magnitudes cannot leak into means.
pub fn aggregate(cube: &SlicedCube) -> RegionalMeanGrid {
    let nlon = cube.lons().len();
    let ncells = cube.num_cells();
    let ntimes = cube.times().len();

    let cell_mean = |cell: usize| -> (f64, u32) {
        let j = cell / nlon;
        let i = cell % nlon;

        let mut sum = CompensatedSum::default();
        let mut count = 0u32;
        for t in 0..ntimes {
            if !cube.is_missing(t, j, i) {
                sum.add(cube.value(t, j, i));
                count += 1;
            }
        }

        if count == 0 {
            // Placeholder value; RegionalMeanGrid hides it behind the count.
            (0.0, 0)
        } else {
            (sum.total() / count as f64, count)
        }
    };

    let results: Vec<(f64, u32)> = if ncells >= PARALLEL_CELL_THRESHOLD {
        (0..ncells).into_par_iter().map(cell_mean).collect()
    } else {
        (0..ncells).map(cell_mean).collect()
    };

    let (means, counts): (Vec<f64>, Vec<u32>) = results.into_iter().unzip();

    debug!(
        variable = cube.variable(),
        cells = ncells,
        samples = ntimes,
        "Aggregated cube"
    );

    RegionalMeanGrid::new(
        cube.variable(),
        cube.units(),
        cube.lats().to_vec(),
        cube.lons().to_vec(),
        means,
        counts,
    )
    .expect("output shape mirrors the input cube")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use power_common::cube::POWER_FILL_VALUE;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sliced(values: Vec<f64>, ntimes: usize) -> SlicedCube {
        let missing = values
            .iter()
            .map(|&v| v == POWER_FILL_VALUE || !v.is_finite())
            .collect();
        let times: Vec<_> = (0..ntimes)
            .map(|k| d("2024-01-01") + chrono::Duration::days(k as i64))
            .collect();
        SlicedCube::new(
            "ALLSKY_SFC_LW_DWN",
            "W/m^2",
            vec![35.0],
            vec![-85.0, -84.0],
            times,
            values,
            missing,
        )
        .unwrap()
    }

    #[test]
    fn test_mean_over_valid_only() {
        // Cell 0: 300, 310 -> 305. Cell 1: 200, missing -> 200 with count 1.
        let cube = sliced(vec![300.0, 200.0, 310.0, POWER_FILL_VALUE], 2);
        let grid = aggregate(&cube);

        assert_eq!(grid.mean_at(0, 0), Some(305.0));
        assert_eq!(grid.valid_count_at(0, 0), 2);
        assert_eq!(grid.mean_at(0, 1), Some(200.0));
        assert_eq!(grid.valid_count_at(0, 1), 1);
    }

    #[test]
    fn test_all_missing_cell_is_no_data() {
        let cube = sliced(vec![POWER_FILL_VALUE, 250.0, POWER_FILL_VALUE, 260.0], 2);
        let grid = aggregate(&cube);

        assert_eq!(grid.mean_at(0, 0), None);
        assert_eq!(grid.valid_count_at(0, 0), 0);
        assert_eq!(grid.mean_at(0, 1), Some(255.0));
    }

    #[test]
    fn test_entirely_missing_cube_never_yields_zeros() {
        let cube = sliced(vec![POWER_FILL_VALUE; 4], 2);
        let grid = aggregate(&cube);

        assert_eq!(grid.missing_cells(), 2);
        assert_eq!(grid.region_mean(), None);
        for i in 0..2 {
            assert_eq!(grid.mean_at(0, i), None);
        }
    }

    #[test]
    fn test_compensated_sum_catastrophic_cancellation() {
        // Naive summation loses the 1.0 entirely here.
        let mut naive = 0.0f64;
        let mut compensated = CompensatedSum::default();
        for v in [1e16, 1.0, -1e16] {
            naive += v;
            compensated.add(v);
        }
        assert_eq!(naive, 0.0);
        assert_eq!(compensated.total(), 1.0);
    }

    #[test]
    fn test_long_daily_series_mean_is_exact() {
        // Ten years of daily samples at a value with no short binary
        // representation; the compensated mean must stay at the input.
        let ntimes = 3650;
        let values = vec![300.1; ntimes];
        let missing = vec![false; ntimes];
        let times: Vec<_> = (0..ntimes)
            .map(|k| d("2015-01-01") + chrono::Duration::days(k as i64))
            .collect();
        let cube = SlicedCube::new(
            "X",
            "",
            vec![35.0],
            vec![-85.0],
            times,
            values,
            missing,
        )
        .unwrap();

        let grid = aggregate(&cube);
        let mean = grid.mean_at(0, 0).unwrap();
        assert!((mean - 300.1).abs() < 1e-12, "mean drifted: {mean}");
        assert_eq!(grid.valid_count_at(0, 0), 3650);
    }
}
