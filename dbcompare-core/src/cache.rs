//! Metadata cache shared by the comparators of one service.
//!
//! The content comparator needs a table's primary key and the structure
//! comparator needs its columns, so both go through the cache and the
//! catalog is read once per side and table. The cache is injected into
//! [`ComparisonService`](crate::compare::ComparisonService); tests substitute
//! [`NoopMetadataCache`] to force every lookup through to the connection.

use crate::adapters::DatabaseConnection;
use crate::models::TableMetadata;
use crate::Result;
use serde::{Deserialize, Serialize};
use moka::sync::Cache;
use std::time::Duration;

/// Which side of the comparison a cached entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonSide {
    /// Migration source
    Source,
    /// Migration target
    Target,
}

impl std::fmt::Display for ComparisonSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonSide::Source => write!(f, "source"),
            ComparisonSide::Target => write!(f, "target"),
        }
    }
}

/// Cache key: side plus lower-cased table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Comparison side
    pub side: ComparisonSide,
    /// Lower-cased table name
    pub table: String,
}

impl CacheKey {
    /// Creates a key, folding the table name to lower case.
    pub fn new(side: ComparisonSide, table: &str) -> Self {
        Self {
            side,
            table: table.to_ascii_lowercase(),
        }
    }
}

/// Storage for table metadata snapshots.
pub trait MetadataCache: Send + Sync {
    /// Returns a live entry, if any.
    fn get(&self, key: &CacheKey) -> Option<TableMetadata>;

    /// Stores an entry, evicting as needed.
    fn insert(&self, key: CacheKey, metadata: TableMetadata);

    /// Drops every entry.
    fn clear(&self);
}

/// Bounded cache whose entries expire after a fixed time to live.
///
/// Backed by [`moka::sync::Cache`], which handles admission and eviction once
/// `max_entries` is reached.
pub struct TtlMetadataCache {
    entries: Cache<CacheKey, TableMetadata>,
    max_entries: u64,
    ttl: Duration,
}

impl std::fmt::Debug for TtlMetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlMetadataCache")
            .field("len", &self.entries.entry_count())
            .field("max_entries", &self.max_entries)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Default for TtlMetadataCache {
    fn default() -> Self {
        Self::new(256, Duration::from_secs(60))
    }
}

impl TtlMetadataCache {
    /// Creates a cache holding at most `max_entries` (minimum 1) for `ttl` each.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .time_to_live(ttl)
                .build(),
            max_entries,
            ttl,
        }
    }

    /// Number of live entries after pending evictions are applied.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataCache for TtlMetadataCache {
    fn get(&self, key: &CacheKey) -> Option<TableMetadata> {
        self.entries.get(key)
    }

    fn insert(&self, key: CacheKey, metadata: TableMetadata) {
        self.entries.insert(key, metadata);
    }

    fn clear(&self) {
        self.entries.invalidate_all();
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetadataCache;

impl MetadataCache for NoopMetadataCache {
    fn get(&self, _key: &CacheKey) -> Option<TableMetadata> {
        None
    }

    fn insert(&self, _key: CacheKey, _metadata: TableMetadata) {}

    fn clear(&self) {}
}

/// Reads table metadata through the cache.
pub async fn cached_metadata(
    cache: &dyn MetadataCache,
    side: ComparisonSide,
    conn: &dyn DatabaseConnection,
    table: &str,
) -> Result<TableMetadata> {
    let key = CacheKey::new(side, table);
    if let Some(metadata) = cache.get(&key) {
        tracing::trace!("Metadata cache hit for {} {}", side, table);
        return Ok(metadata);
    }

    let metadata = conn.get_metadata(table).await?;
    cache.insert(key, metadata.clone());
    Ok(metadata)
}
