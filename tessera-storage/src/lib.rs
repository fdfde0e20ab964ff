//! Tessera Storage - Caching and Batched Loading
//!
//! The two pieces of request-serving state that sit between the resolvers
//! and the upstream client: the process-wide TTL/LRU response cache and the
//! request-scoped batching loader.

pub mod cache;
pub mod loader;

pub use cache::{
    CacheConfig, CacheStats, NoopCache, ResponseCache, TtlLruCache, DEFAULT_CACHE_CAPACITY,
};
pub use loader::{
    BatchFn, BatchLoader, KeyFailurePolicy, KeyOutcome, LoadError, LoadResult, LoaderStats,
};
