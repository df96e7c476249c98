//! Calendar date ranges for temporal queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An inclusive calendar date range.
///
/// Invariant: `start <= end`, enforced by [`DateRange::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a validated date range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse two ISO-8601 dates (YYYY-MM-DD) into a range.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|_| DateRangeError::InvalidDate(start.to_string()))?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .map_err(|_| DateRangeError::InvalidDate(end.to_string()))?;
        Self::new(start, end)
    }

    /// Number of days covered, inclusive of both endpoints.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Check if this range overlaps another inclusive range.
    pub fn intersects(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Iterate the days of the range in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.num_days() as usize)
    }

    /// Cache key fragment.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.start.format("%Y%m%d"), self.end.format("%Y%m%d"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DateRangeError {
    #[error("invalid date: {0}. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("date range start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse() {
        let range = DateRange::parse("2024-10-19", "2025-10-19").unwrap();
        assert_eq!(range.start, d("2024-10-19"));
        assert_eq!(range.end, d("2025-10-19"));
        assert_eq!(range.num_days(), 366);
    }

    #[test]
    fn test_rejects_inverted() {
        assert!(matches!(
            DateRange::parse("2025-01-01", "2024-01-01"),
            Err(DateRangeError::Inverted { .. })
        ));
    }

    #[test]
    fn test_single_day_is_valid() {
        let range = DateRange::parse("2024-06-01", "2024-06-01").unwrap();
        assert_eq!(range.num_days(), 1);
        assert!(range.contains(d("2024-06-01")));
    }

    #[test]
    fn test_intersects() {
        let a = DateRange::parse("2024-01-01", "2024-06-30").unwrap();
        let b = DateRange::parse("2024-06-01", "2024-12-31").unwrap();
        let c = DateRange::parse("2025-01-01", "2025-12-31").unwrap();

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_iter_days() {
        let range = DateRange::parse("2024-02-27", "2024-03-01").unwrap();
        let days: Vec<_> = range.iter_days().collect();
        // 2024 is a leap year
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], d("2024-02-29"));
    }
}
