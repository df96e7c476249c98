//! Caching and fetch-deduplication decorator for any [`DataSource`].

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use power_common::{BoundingBox, DataCube, DateRange};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::DiskCache;
use crate::error::SourceResult;
use crate::source::DataSource;

/// Hit/miss counters for the decorated source.
#[derive(Debug, Default, Clone)]
pub struct SourceCacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
}

/// Wraps a [`DataSource`] with an in-memory LRU of decoded cubes, an
/// optional checksum-verified disk cache, and single-flight keyed
/// deduplication: concurrent fetches for the same (variable, range,
/// bbox) share one underlying fetch.
///
/// The per-key lock map lives for the lifetime of the source. Keys are
/// bounded by the distinct fetches of a pipeline run, so no eviction is
/// needed for the one-shot report workload.
pub struct CachedSource<S> {
    inner: S,
    disk: Option<DiskCache>,
    memory: RwLock<LruCache<String, DataCube>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    stats: RwLock<SourceCacheStats>,
}

impl<S: DataSource> CachedSource<S> {
    /// `capacity` bounds the in-memory cube count; `disk` is optional.
    pub fn new(inner: S, capacity: usize, disk: Option<DiskCache>) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner,
            disk,
            memory: RwLock::new(LruCache::new(capacity)),
            inflight: Mutex::new(HashMap::new()),
            stats: RwLock::new(SourceCacheStats::default()),
        }
    }

    pub async fn stats(&self) -> SourceCacheStats {
        self.stats.read().await.clone()
    }

    fn fetch_key(variable: &str, range: &DateRange, bbox: Option<&BoundingBox>) -> String {
        let region = bbox.map_or_else(|| "global".to_string(), |b| b.cache_key());
        format!("{}/{}/{}", variable, range.cache_key(), region)
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl<S: DataSource> DataSource for CachedSource<S> {
    async fn fetch(
        &self,
        variable: &str,
        range: &DateRange,
        bbox: Option<&BoundingBox>,
    ) -> SourceResult<DataCube> {
        let key = Self::fetch_key(variable, range, bbox);

        // Serialize all work for this key: the first caller fetches,
        // later callers find the caches populated.
        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        if let Some(cube) = self.memory.write().await.get(&key) {
            self.stats.write().await.memory_hits += 1;
            debug!(key = %key, "Memory cache hit");
            return Ok(cube.clone());
        }

        if let Some(disk) = &self.disk {
            if let Some(cube) = disk.load(variable, range, bbox) {
                self.stats.write().await.disk_hits += 1;
                self.memory.write().await.put(key, cube.clone());
                return Ok(cube);
            }
        }

        let cube = self.inner.fetch(variable, range, bbox).await?;
        self.stats.write().await.misses += 1;

        if let Some(disk) = &self.disk {
            // A failed cache write is not a fetch failure.
            if let Err(e) = disk.store(variable, range, bbox, &cube) {
                warn!(key = %key, error = %e, "Failed to persist cache entry");
            }
        }
        self.memory.write().await.put(key, cube.clone());

        Ok(cube)
    }
}
