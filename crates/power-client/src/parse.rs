//! Decoding of POWER regional API responses.
//!
//! The regional daily endpoint returns a GeoJSON-style feature
//! collection: one point feature per grid cell, with per-date values
//! nested under `properties.parameter.<ID>.<YYYYMMDD>`. Features arrive
//! in no guaranteed order and cells may be absent entirely; the decoder
//! reassembles a dense cube, leaving the archive sentinel in any slot the
//! response did not cover.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use power_common::{cube::POWER_FILL_VALUE, lookup_parameter, DataCube};
use serde::Deserialize;

use crate::error::SourceError;

#[derive(Debug, Deserialize)]
struct RegionalResponse {
    features: Vec<Feature>,
    #[serde(default)]
    parameters: HashMap<String, ParameterMeta>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[lon, lat]` or `[lon, lat, elevation]`.
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    parameter: HashMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct ParameterMeta {
    units: Option<String>,
}

/// Coordinates are quantized to 1e-4 degrees when deduplicating axis
/// values, absorbing float noise across features.
fn quantize(coord: f64) -> i64 {
    (coord * 10_000.0).round() as i64
}

/// Decode a regional response body into a dense cube for `variable`.
pub fn decode_regional(body: &str, variable: &str) -> Result<DataCube, SourceError> {
    let response: RegionalResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;

    if response.features.is_empty() {
        return Err(SourceError::Decode("response contains no features".into()));
    }

    // First pass: collect the coordinate axes.
    let mut lat_keys: Vec<i64> = Vec::new();
    let mut lon_keys: Vec<i64> = Vec::new();
    let mut date_keys: Vec<NaiveDate> = Vec::new();

    for feature in &response.features {
        let coords = &feature.geometry.coordinates;
        if coords.len() < 2 {
            return Err(SourceError::Decode(format!(
                "feature has {} coordinates, expected at least [lon, lat]",
                coords.len()
            )));
        }
        lon_keys.push(quantize(coords[0]));
        lat_keys.push(quantize(coords[1]));

        if let Some(series) = feature.properties.parameter.get(variable) {
            for date_str in series.keys() {
                let date = NaiveDate::parse_from_str(date_str, "%Y%m%d")
                    .map_err(|_| SourceError::Decode(format!("invalid date key: {date_str}")))?;
                date_keys.push(date);
            }
        }
    }

    lat_keys.sort_unstable();
    lat_keys.dedup();
    lon_keys.sort_unstable();
    lon_keys.dedup();
    date_keys.sort_unstable();
    date_keys.dedup();

    if date_keys.is_empty() {
        return Err(SourceError::Decode(format!(
            "no '{variable}' series in any feature"
        )));
    }

    let lats: Vec<f64> = lat_keys.iter().map(|&k| k as f64 / 10_000.0).collect();
    let lons: Vec<f64> = lon_keys.iter().map(|&k| k as f64 / 10_000.0).collect();

    let date_index: HashMap<NaiveDate, usize> = date_keys
        .iter()
        .enumerate()
        .map(|(idx, &d)| (d, idx))
        .collect();

    // Second pass: scatter values into the dense buffer. Slots no
    // feature covered keep the sentinel and surface as missing.
    let mut values = vec![POWER_FILL_VALUE; date_keys.len() * lats.len() * lons.len()];

    for feature in &response.features {
        let coords = &feature.geometry.coordinates;
        let i = lon_keys
            .binary_search(&quantize(coords[0]))
            .expect("lon key collected in first pass");
        let j = lat_keys
            .binary_search(&quantize(coords[1]))
            .expect("lat key collected in first pass");

        if let Some(series) = feature.properties.parameter.get(variable) {
            for (date_str, &value) in series {
                let date = NaiveDate::parse_from_str(date_str, "%Y%m%d")
                    .map_err(|_| SourceError::Decode(format!("invalid date key: {date_str}")))?;
                let t = date_index[&date];
                values[(t * lats.len() + j) * lons.len() + i] = value;
            }
        }
    }

    let units = response
        .parameters
        .get(variable)
        .and_then(|m| m.units.clone())
        .or_else(|| lookup_parameter(variable).map(|p| p.units.to_string()))
        .unwrap_or_default();

    DataCube::new(
        variable,
        units,
        lats,
        lons,
        date_keys,
        values,
        POWER_FILL_VALUE,
    )
    .map_err(|e| SourceError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_json(lon: f64, lat: f64, values: &[(&str, f64)]) -> String {
        let series: Vec<String> = values
            .iter()
            .map(|(date, v)| format!("\"{date}\": {v}"))
            .collect();
        format!(
            r#"{{
                "geometry": {{"type": "Point", "coordinates": [{lon}, {lat}, 120.5]}},
                "properties": {{"parameter": {{"ALLSKY_SFC_LW_DWN": {{{}}}}}}}
            }}"#,
            series.join(", ")
        )
    }

    fn response_json(features: &[String]) -> String {
        format!(
            r#"{{
                "type": "FeatureCollection",
                "features": [{}],
                "parameters": {{"ALLSKY_SFC_LW_DWN": {{"units": "W/m^2", "longname": "Longwave"}}}}
            }}"#,
            features.join(",")
        )
    }

    #[test]
    fn test_decode_assembles_sorted_axes() {
        // Features deliberately out of coordinate order
        let body = response_json(&[
            feature_json(-84.0, 36.0, &[("20240101", 310.0), ("20240102", 311.0)]),
            feature_json(-85.0, 35.0, &[("20240101", 300.0), ("20240102", 301.0)]),
            feature_json(-84.0, 35.0, &[("20240101", 305.0), ("20240102", 306.0)]),
            feature_json(-85.0, 36.0, &[("20240101", 308.0), ("20240102", 309.0)]),
        ]);

        let cube = decode_regional(&body, "ALLSKY_SFC_LW_DWN").unwrap();
        assert_eq!(cube.lats(), &[35.0, 36.0]);
        assert_eq!(cube.lons(), &[-85.0, -84.0]);
        assert_eq!(cube.times().len(), 2);
        assert_eq!(cube.units(), "W/m^2");

        // (t=0, lat=35, lon=-85) = 300, (t=1, lat=36, lon=-84) = 311
        assert_eq!(cube.value(0, 0, 0), 300.0);
        assert_eq!(cube.value(1, 1, 1), 311.0);
    }

    #[test]
    fn test_decode_absent_cell_is_missing() {
        // 2x2 coordinate lattice but only 3 features: one cell never arrives
        let body = response_json(&[
            feature_json(-85.0, 35.0, &[("20240101", 300.0)]),
            feature_json(-84.0, 35.0, &[("20240101", 305.0)]),
            feature_json(-85.0, 36.0, &[("20240101", 308.0)]),
        ]);

        let cube = decode_regional(&body, "ALLSKY_SFC_LW_DWN").unwrap();
        assert!(cube.is_missing(0, 1, 1));
        assert!(!cube.is_missing(0, 0, 0));
    }

    #[test]
    fn test_decode_sentinel_preserved() {
        let body = response_json(&[feature_json(
            -85.0,
            35.0,
            &[("20240101", -999.0), ("20240102", 301.0)],
        )]);

        let cube = decode_regional(&body, "ALLSKY_SFC_LW_DWN").unwrap();
        assert!(cube.is_missing(0, 0, 0));
        assert!(!cube.is_missing(1, 0, 0));
    }

    #[test]
    fn test_decode_wrong_variable() {
        let body = response_json(&[feature_json(-85.0, 35.0, &[("20240101", 300.0)])]);
        let err = decode_regional(&body, "ALLSKY_SFC_SW_DWN").unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_decode_empty_features() {
        let body = r#"{"type": "FeatureCollection", "features": []}"#;
        let err = decode_regional(body, "ALLSKY_SFC_LW_DWN").unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_decode_not_json() {
        let err = decode_regional("<html>503</html>", "ALLSKY_SFC_LW_DWN").unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }
}
