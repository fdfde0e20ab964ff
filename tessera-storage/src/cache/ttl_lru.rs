//! Bounded in-memory cache with per-entry TTL and LRU eviction.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use super::traits::{CacheStats, ResponseCache};

/// Default maximum number of entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 5000;

/// Configuration for [`TtlLruCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before the least-recently-accessed one is
    /// evicted. Zero is treated as one.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Set the capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

struct Inner<V> {
    entries: LruCache<String, Entry<V>>,
    stats: CacheStats,
}

/// TTL + LRU cache.
///
/// Expiry is lazy: an elapsed entry is dropped on the next `get` that sees
/// it. Capacity eviction ignores remaining TTL and always removes the least
/// recently accessed entry. The mutex is only held across synchronous
/// bookkeeping, never across an await.
pub struct TtlLruCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> TtlLruCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(CacheConfig::default().with_capacity(capacity))
    }

    pub fn capacity(&self) -> usize {
        self.lock().entries.cap().get()
    }

    /// Entries physically held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        // A panic mid-update leaves at worst a stale entry behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V> ResponseCache<V> for TtlLruCache<V>
where
    V: Clone + Send,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.lock();
        let inner = &mut *guard;

        let live = inner
            .entries
            .get(key)
            .map(|entry| {
                let live = entry.expires_at.map_or(true, |at| now < at);
                live.then(|| entry.value.clone())
            });

        match live {
            None => {
                inner.stats.misses += 1;
                None
            }
            Some(Some(value)) => {
                inner.stats.hits += 1;
                Some(value)
            }
            Some(None) => {
                inner.entries.pop(key);
                inner.stats.misses += 1;
                inner.stats.expirations += 1;
                None
            }
        }
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        let mut guard = self.lock();
        if let Some((evicted, _)) = guard.entries.push(key.to_string(), entry) {
            // push hands back either the replaced entry for this key or the
            // evicted LRU entry.
            if evicted != key {
                guard.stats.evictions += 1;
                tracing::trace!(evicted = %evicted, "Cache evicted least recently used entry");
            }
        }
    }

    fn stats(&self) -> CacheStats {
        let guard = self.lock();
        CacheStats {
            entry_count: guard.entries.len() as u64,
            ..guard.stats.clone()
        }
    }
}
