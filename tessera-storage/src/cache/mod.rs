//! Shared response cache.
//!
//! One instance is created at process start and handed to every request
//! context by handle. It holds graph-shaped entities keyed by
//! `"{kind}:{id}"`, each with its own TTL, bounded by an LRU capacity.
//!
//! # Example
//!
//! ```ignore
//! let cache: Arc<dyn ResponseCache<Customer>> = Arc::new(TtlLruCache::new(CacheConfig::default()));
//! cache.set("customer:c-001", customer, Duration::from_secs(30));
//! let hit = cache.get("customer:c-001");
//! ```

pub mod noop;
pub mod traits;
pub mod ttl_lru;

pub use noop::NoopCache;
pub use traits::{CacheStats, ResponseCache};
pub use ttl_lru::{CacheConfig, TtlLruCache, DEFAULT_CACHE_CAPACITY};
