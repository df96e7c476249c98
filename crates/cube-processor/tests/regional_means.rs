//! End-to-end slice + aggregate behavior over synthetic regional data.

use cube_processor::{aggregate, slice, SliceError};
use power_common::{BoundingBox, DateRange};
use test_utils::{constant_cube, half_missing_cube};

fn appalachia() -> BoundingBox {
    BoundingBox::new(-85.0, 35.0, -75.0, 45.0).unwrap()
}

fn one_year() -> DateRange {
    DateRange::parse("2024-10-19", "2025-10-19").unwrap()
}

#[test]
fn constant_field_yields_uniform_means() {
    let cube = constant_cube("ALLSKY_SFC_LW_DWN", 300.0, &appalachia(), &one_year(), 1.0);
    let sliced = slice(&cube, &one_year(), &appalachia()).unwrap();
    let grid = aggregate(&sliced);

    assert_eq!(grid.missing_cells(), 0);
    let expected_samples = one_year().num_days() as u32;
    for j in 0..grid.height() {
        for i in 0..grid.width() {
            assert_eq!(grid.mean_at(j, i), Some(300.0));
            assert_eq!(grid.valid_count_at(j, i), expected_samples);
        }
    }
    assert_eq!(grid.region_mean(), Some(300.0));
}

#[test]
fn all_valid_input_has_no_missing_cells() {
    let bbox = appalachia();
    let range = DateRange::parse("2024-01-01", "2024-03-31").unwrap();
    let cube = constant_cube("ALLSKY_SFC_SW_DWN", 185.5, &bbox, &range, 0.5);

    let grid = aggregate(&slice(&cube, &range, &bbox).unwrap());
    assert_eq!(grid.missing_cells(), 0);
}

#[test]
fn half_missing_samples_counted_per_cell() {
    let bbox = appalachia();
    let range = DateRange::parse("2024-01-01", "2024-12-30").unwrap(); // 365 days
    let cube = half_missing_cube("ALLSKY_SFC_LW_DWN", 300.0, &bbox, &range, 1.0);

    let grid = aggregate(&slice(&cube, &range, &bbox).unwrap());

    // Even time indices are valid: 183 of 365
    for j in 0..grid.height() {
        for i in 0..grid.width() {
            assert_eq!(grid.mean_at(j, i), Some(300.0));
            assert_eq!(grid.valid_count_at(j, i), 183);
        }
    }
}

#[test]
fn narrower_slice_window_reduces_counts() {
    let bbox = appalachia();
    let full = one_year();
    let cube = constant_cube("ALLSKY_SFC_LW_DWN", 300.0, &bbox, &full, 1.0);

    let window = DateRange::parse("2025-01-01", "2025-01-31").unwrap();
    let grid = aggregate(&slice(&cube, &window, &bbox).unwrap());

    assert_eq!(grid.valid_count_at(0, 0), 31);
}

#[test]
fn disjoint_date_range_fails_not_empty() {
    let cube = constant_cube("ALLSKY_SFC_LW_DWN", 300.0, &appalachia(), &one_year(), 1.0);
    let disjoint = DateRange::parse("2030-01-01", "2030-12-31").unwrap();

    let err = slice(&cube, &disjoint, &appalachia()).unwrap_err();
    assert!(matches!(err, SliceError::OutOfBounds { axis: "time", .. }));
}

#[test]
fn disjoint_bbox_fails_not_empty() {
    let cube = constant_cube("ALLSKY_SFC_LW_DWN", 300.0, &appalachia(), &one_year(), 1.0);
    let elsewhere = BoundingBox::new(100.0, -45.0, 110.0, -35.0).unwrap();

    assert!(matches!(
        slice(&cube, &one_year(), &elsewhere),
        Err(SliceError::OutOfBounds { .. })
    ));
}
