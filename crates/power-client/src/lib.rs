//! NASA POWER archive access.
//!
//! The [`DataSource`] trait is the pipeline's only view of data
//! retrieval; callers never see the underlying transport. The concrete
//! [`PowerArchiveClient`] speaks the POWER regional daily API over HTTP
//! with capped exponential backoff, and [`CachedSource`] layers a
//! checksum-verified disk cache, an in-memory LRU, and single-flight
//! fetch deduplication on top of any source.

pub mod cache;
pub mod cached;
pub mod client;
pub mod error;
pub mod parse;
pub mod source;

pub use cache::DiskCache;
pub use cached::{CachedSource, SourceCacheStats};
pub use client::{PowerArchiveClient, PowerClientConfig};
pub use error::SourceError;
pub use source::DataSource;
