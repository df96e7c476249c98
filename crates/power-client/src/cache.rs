//! Checksum-verified disk cache for fetched cubes.
//!
//! Each entry is one file: a single-line JSON header carrying a CRC32 of
//! the body and the storage timestamp, then the JSON-serialized cube.
//! Reads verify the checksum and the TTL before the entry is trusted;
//! anything corrupt or stale is deleted and treated as a miss. Writes go
//! to a sibling temp path and are renamed into place so a crash never
//! leaves a partial entry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use power_common::{BoundingBox, DataCube, DateRange};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SourceError;

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    checksum: u32,
    stored_at: DateTime<Utc>,
}

/// On-disk cube cache keyed by (variable, date range, bounding box).
pub struct DiskCache {
    root: PathBuf,
    /// Entries older than this are stale. `None` disables expiry.
    ttl: Option<Duration>,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>, ttl: Option<Duration>) -> Result<Self, SourceError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| SourceError::Cache(format!("create {}: {e}", root.display())))?;
        Ok(Self { root, ttl })
    }

    /// Stable file name for a fetch key.
    pub fn entry_path(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
    ) -> PathBuf {
        let region = bbox.map_or_else(|| "global".to_string(), |b| b.cache_key());
        self.root
            .join(format!("{}_{}_{}.json", variable, range.cache_key(), region))
    }

    /// Load a cube if a fresh, intact entry exists for the key.
    pub fn load(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
    ) -> Option<DataCube> {
        let path = self.entry_path(variable, range, bbox);
        let content = std::fs::read_to_string(&path).ok()?;

        let (header_line, body) = content.split_once('\n')?;
        let header: EntryHeader = match serde_json::from_str(header_line) {
            Ok(h) => h,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache header, discarding");
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        if crc32fast::hash(body.as_bytes()) != header.checksum {
            warn!(path = %path.display(), "Cache checksum mismatch, discarding");
            let _ = std::fs::remove_file(&path);
            return None;
        }

        if let Some(ttl) = self.ttl {
            let age = Utc::now().signed_duration_since(header.stored_at);
            if age.num_seconds() < 0 || age.num_seconds() as u64 >= ttl.as_secs() {
                debug!(path = %path.display(), "Cache entry expired");
                let _ = std::fs::remove_file(&path);
                return None;
            }
        }

        match serde_json::from_str(body) {
            Ok(cube) => {
                debug!(path = %path.display(), "Cache hit");
                Some(cube)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Undecodable cache body, discarding");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    /// Persist a cube for the key.
    pub fn store(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
        cube: &DataCube,
    ) -> Result<(), SourceError> {
        let path = self.entry_path(variable, range, bbox);
        let body =
            serde_json::to_string(cube).map_err(|e| SourceError::Cache(e.to_string()))?;
        let header = EntryHeader {
            checksum: crc32fast::hash(body.as_bytes()),
            stored_at: Utc::now(),
        };
        let header_line =
            serde_json::to_string(&header).map_err(|e| SourceError::Cache(e.to_string()))?;

        let tmp_path = temp_sibling(&path);
        std::fs::write(&tmp_path, format!("{header_line}\n{body}"))
            .map_err(|e| SourceError::Cache(format!("write {}: {e}", tmp_path.display())))?;
        std::fs::rename(&tmp_path, &path)
            .map_err(|e| SourceError::Cache(format!("rename {}: {e}", path.display())))?;

        debug!(path = %path.display(), "Cached cube");
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::constant_cube;

    fn fixtures() -> (DataCube, DateRange, BoundingBox) {
        let range = DateRange::parse("2024-01-01", "2024-01-10").unwrap();
        let bbox = BoundingBox::new(-85.0, 35.0, -75.0, 45.0).unwrap();
        let cube = constant_cube("ALLSKY_SFC_LW_DWN", 300.0, &bbox, &range, 1.0);
        (cube, range, bbox)
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), None).unwrap();
        let (cube, range, bbox) = fixtures();

        assert!(cache.load("ALLSKY_SFC_LW_DWN", &range, Some(&bbox)).is_none());

        cache
            .store("ALLSKY_SFC_LW_DWN", &range, Some(&bbox), &cube)
            .unwrap();

        let loaded = cache
            .load("ALLSKY_SFC_LW_DWN", &range, Some(&bbox))
            .expect("entry should be fresh and intact");
        assert_eq!(loaded.variable(), cube.variable());
        assert_eq!(loaded.times().len(), cube.times().len());
        assert_eq!(loaded.value(0, 0, 0), 300.0);
    }

    #[test]
    fn test_corrupt_entry_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), None).unwrap();
        let (cube, range, bbox) = fixtures();

        cache
            .store("ALLSKY_SFC_LW_DWN", &range, Some(&bbox), &cube)
            .unwrap();

        // Flip bytes in the body without updating the checksum
        let path = cache.entry_path("ALLSKY_SFC_LW_DWN", &range, Some(&bbox));
        let mut content = std::fs::read_to_string(&path).unwrap();
        content = content.replace("300", "999");
        std::fs::write(&path, content).unwrap();

        assert!(cache.load("ALLSKY_SFC_LW_DWN", &range, Some(&bbox)).is_none());
        // The corrupt file was deleted, not left behind
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_ttl_entry_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), Some(Duration::from_secs(0))).unwrap();
        let (cube, range, bbox) = fixtures();

        cache
            .store("ALLSKY_SFC_LW_DWN", &range, Some(&bbox), &cube)
            .unwrap();
        assert!(cache.load("ALLSKY_SFC_LW_DWN", &range, Some(&bbox)).is_none());
    }

    #[test]
    fn test_keys_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path(), None).unwrap();
        let (cube, range, bbox) = fixtures();

        cache
            .store("ALLSKY_SFC_LW_DWN", &range, Some(&bbox), &cube)
            .unwrap();

        // Same variable, different region and different range both miss
        assert!(cache.load("ALLSKY_SFC_LW_DWN", &range, None).is_none());
        let other_range = DateRange::parse("2024-02-01", "2024-02-10").unwrap();
        assert!(cache
            .load("ALLSKY_SFC_LW_DWN", &other_range, Some(&bbox))
            .is_none());
    }
}
