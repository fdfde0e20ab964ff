//! Cache that never stores anything.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::traits::{CacheStats, ResponseCache};

/// Always-miss cache, used when caching is switched off.
#[derive(Debug, Default)]
pub struct NoopCache {
    misses: AtomicU64,
}

impl NoopCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V> ResponseCache<V> for NoopCache {
    fn get(&self, _key: &str) -> Option<V> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn set(&self, _key: &str, _value: V, _ttl: Duration) {}

    fn stats(&self) -> CacheStats {
        CacheStats {
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}
