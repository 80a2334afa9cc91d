use std::hash::Hash;
use std::time::Duration;

/// Retention policy for a cache namespace
///
/// Schema entries use [`CachePolicy::permanent`]: they live until explicitly
/// invalidated. Query results use [`CachePolicy::bounded`]: they expire after
/// `ttl` and the namespace never holds more than `max_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Option<Duration>,
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    pub fn permanent() -> Self {
        Self {
            ttl: None,
            max_entries: None,
        }
    }

    pub fn bounded(max_entries: usize, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            max_entries: Some(max_entries),
        }
    }

    /// Entries strictly older than the TTL are stale
    pub fn is_expired(&self, age: Duration) -> bool {
        self.ttl.map_or(false, |ttl| age > ttl)
    }

    /// Whether one more insert requires an eviction first
    pub fn is_full(&self, len: usize) -> bool {
        self.max_entries.map_or(false, |max| len >= max)
    }

    /// Concurrent cache honoring this policy's TTL and capacity
    pub fn build_async<K, V>(&self) -> moka::future::Cache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut builder = moka::future::Cache::builder();
        if let Some(max) = self.max_entries {
            builder = builder.max_capacity(max as u64);
        }
        if let Some(ttl) = self.ttl {
            builder = builder.time_to_live(ttl);
        }
        builder.build()
    }
}
