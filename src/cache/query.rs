//! Query result caching
//!
//! Entries expire `ttl` after insertion and the cache holds at most
//! `max_entries`. When full, the oldest *inserted* entry is evicted: this is
//! FIFO, not LRU. Reads never refresh an entry's position or age.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::policy::CachePolicy;
use crate::data::Row;

pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// A cached row set and when it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Arc<Vec<Row>>,
    pub inserted_at: Instant,
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<String, CacheEntry>,
    /// Keys from oldest to newest insertion
    order: VecDeque<String>,
}

impl Entries {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.map.remove(key)?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        Some(entry)
    }
}

/// Bounded TTL cache of filter query results
pub struct QueryCache {
    entries: Mutex<Entries>,
    policy: CachePolicy,
    max_entries: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Create a cache with default settings (100 entries, one hour)
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    /// Create a cache with custom configuration
    pub fn with_config(max_entries: usize, ttl: Duration) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: Mutex::new(Entries::default()),
            policy: CachePolicy::bounded(max_entries, ttl),
            max_entries,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached result that has not outlived the TTL
    pub fn get(&self, key: &str) -> Option<Arc<Vec<Row>>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<Arc<Vec<Row>>> {
        let found = {
            let entries = self.entries.lock();
            entries
                .map
                .get(key)
                .filter(|e| !self.policy.is_expired(now.saturating_duration_since(e.inserted_at)))
                .map(|e| Arc::clone(&e.data))
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store a result, evicting the oldest insertion when full
    pub fn put(&self, key: &str, rows: impl Into<Arc<Vec<Row>>>) {
        self.put_at(key, rows, Instant::now());
    }

    pub(crate) fn put_at(&self, key: &str, rows: impl Into<Arc<Vec<Row>>>, now: Instant) {
        let entry = CacheEntry {
            data: rows.into(),
            inserted_at: now,
        };

        let mut entries = self.entries.lock();
        // An overwrite replaces in place and moves to the newest position
        if entries.remove(key).is_none() && self.policy.is_full(entries.map.len()) {
            if let Some(oldest) = entries.order.pop_front() {
                entries.map.remove(&oldest);
                tracing::debug!(key = %oldest, "Evicted oldest query cache entry");
            }
        }
        entries.order.push_back(key.to_string());
        entries.map.insert(key.to_string(), entry);
    }

    /// Remove one entry; returns whether it existed
    pub fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Remove every entry and reset the hit/miss counters
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.map.clear();
        entries.order.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Remove every expired entry; counters are left alone
    pub fn clean_expired(&self) -> usize {
        self.clean_expired_at(Instant::now())
    }

    pub(crate) fn clean_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let Entries { map, order } = &mut *entries;

        let before = map.len();
        map.retain(|_, e| !self.policy.is_expired(now.saturating_duration_since(e.inserted_at)));
        order.retain(|k| map.contains_key(k));
        before - map.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            size: self.len(),
            max_size: self.max_entries,
            hits,
            misses,
            hit_rate: format!("{:.2}", hit_rate),
            ttl_ms: self.ttl.as_millis() as u64,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of entries in cache
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Percentage with two decimals, e.g. "40.00"
    pub hit_rate: String,
    /// TTL in milliseconds
    #[serde(rename = "ttl")]
    pub ttl_ms: u64,
}
