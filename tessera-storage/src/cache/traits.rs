//! Response cache trait and statistics.

use std::time::Duration;

/// Shared, process-wide cache of derived response objects.
///
/// Implementations are shared across every concurrently executing request.
/// Writes are last-write-wins; there is no read-then-write transaction.
/// That is sound only because cached values are re-derivable projections of
/// upstream state and are never mutated locally.
pub trait ResponseCache<V>: Send + Sync {
    /// Get a live value. Entries whose TTL has elapsed are absent even if
    /// they have not been physically evicted yet.
    fn get(&self, key: &str) -> Option<V>;

    /// Insert or replace a value that expires `ttl` from now.
    fn set(&self, key: &str, value: V, ttl: Duration);

    /// Snapshot of usage counters.
    fn stats(&self) -> CacheStats;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired reads included.
    pub misses: u64,
    /// Number of reads that found an expired entry.
    pub expirations: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries currently held, expired ones included.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
