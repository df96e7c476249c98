//! Geographic bounding box for region-of-interest requests.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 degrees.
///
/// Invariants (enforced by [`BoundingBox::new`]): `min_lat < max_lat`,
/// `min_lon < max_lon`, latitudes within [-90, 90], longitudes within
/// [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, BboxError> {
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(BboxError::LatitudeOutOfRange { min_lat, max_lat });
        }
        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(BboxError::LongitudeOutOfRange { min_lon, max_lon });
        }
        if min_lat >= max_lat || min_lon >= max_lon {
            return Err(BboxError::Degenerate {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Parse a CLI/config string: "min_lon,min_lat,max_lon,max_lat".
    pub fn from_arg_string(s: &str) -> Result<Self, BboxError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse()
                .map_err(|_| BboxError::InvalidNumber(part.trim().to_string()))?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Check if this bbox overlaps another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_lon < other.min_lon
            || self.min_lon > other.max_lon
            || self.max_lat < other.min_lat
            || self.min_lat > other.max_lat)
    }

    /// Check if a point falls within this bbox (inclusive edges).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Cache key fragment, quantized to avoid floating point drift.
    pub fn cache_key(&self) -> String {
        format!(
            "{:.4}_{:.4}_{:.4}_{:.4}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxError {
    #[error("invalid bbox format: {0}. Expected 'min_lon,min_lat,max_lon,max_lat'")]
    InvalidFormat(String),

    #[error("invalid number in bbox: {0}")]
    InvalidNumber(String),

    #[error("latitudes must be within [-90, 90], got {min_lat}..{max_lat}")]
    LatitudeOutOfRange { min_lat: f64, max_lat: f64 },

    #[error("longitudes must be within [-180, 180], got {min_lon}..{max_lon}")]
    LongitudeOutOfRange { min_lon: f64, max_lon: f64 },

    #[error("bbox must have min < max on both axes, got ({min_lon},{min_lat})..({max_lon},{max_lat})")]
    Degenerate {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_string() {
        let bbox = BoundingBox::from_arg_string("-85.0,35.0,-75.0,45.0").unwrap();
        assert_eq!(bbox.min_lon, -85.0);
        assert_eq!(bbox.min_lat, 35.0);
        assert_eq!(bbox.max_lon, -75.0);
        assert_eq!(bbox.max_lat, 45.0);
    }

    #[test]
    fn test_rejects_inverted_axes() {
        assert!(matches!(
            BoundingBox::new(-75.0, 35.0, -85.0, 45.0),
            Err(BboxError::Degenerate { .. })
        ));
        assert!(matches!(
            BoundingBox::new(-85.0, 45.0, -75.0, 35.0),
            Err(BboxError::Degenerate { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            BoundingBox::new(-85.0, -95.0, -75.0, 45.0),
            Err(BboxError::LatitudeOutOfRange { .. })
        ));
        assert!(matches!(
            BoundingBox::new(-185.0, 35.0, -75.0, 45.0),
            Err(BboxError::LongitudeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0).unwrap();
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0).unwrap();

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_cache_key_stable() {
        let a = BoundingBox::new(-85.0, 35.0, -75.0, 45.0).unwrap();
        let b = BoundingBox::new(-85.00001, 35.0, -75.0, 45.0).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
