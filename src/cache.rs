// TTL response cache keyed by request fingerprint

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
    pub expired_count: AtomicUsize,
    pub eviction_count: AtomicUsize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStatsReport {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub expired_count: usize,
    pub eviction_count: usize,
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// Bounded TTL cache in front of the booking API. Entries expire lazily on
/// lookup; when the map is full the least-recently-used entry is evicted.
///
/// Concurrent misses for the same fingerprint may fetch twice; the last
/// successful fetch wins. Correctness over single-flight.
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    max_entries: usize,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            max_entries: max_entries.max(1),
            stats: CacheStats::default(),
        }
    }

    /// Return the cached value for `fingerprint` if still fresh, otherwise run
    /// `fetch` (the real, rate-limited call), store its result and return it.
    /// `ttl` of `None` uses the cache-wide default.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        fingerprint: &str,
        ttl: Option<Duration>,
        fetch: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Some(value) = self.lookup(fingerprint) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.store(fingerprint, value.clone(), ttl);
        Ok(value)
    }

    fn lookup(&self, fingerprint: &str) -> Option<Value> {
        if let Some(mut entry) = self.entries.get_mut(fingerprint) {
            if entry.is_expired() {
                drop(entry);
                self.entries.remove(fingerprint);
                self.stats.expired_count.fetch_add(1, Ordering::Relaxed);
                self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            entry.last_accessed = Instant::now();
            self.stats.hit_count.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(fingerprint, "cache hit");
            return Some(entry.value.clone());
        }
        self.stats.miss_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn store(&self, fingerprint: &str, value: Value, ttl: Option<Duration>) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(fingerprint) {
            self.evict_least_recently_used();
        }

        self.entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
                last_accessed: Instant::now(),
            },
        );
    }

    fn evict_least_recently_used(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_accessed)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest_key {
            self.entries.remove(&key);
            self.stats.eviction_count.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(fingerprint = %key, "evicted least-recently-used cache entry");
        }
    }

    pub fn stats(&self) -> CacheStatsReport {
        CacheStatsReport {
            items_count: self.entries.len(),
            hit_count: self.stats.hit_count.load(Ordering::Relaxed),
            miss_count: self.stats.miss_count.load(Ordering::Relaxed),
            expired_count: self.stats.expired_count.load(Ordering::Relaxed),
            eviction_count: self.stats.eviction_count.load(Ordering::Relaxed),
        }
    }
}
