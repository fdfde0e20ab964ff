//! Per-request dependency wiring.
//!
//! A [`ContextBuilder`] holds the process-wide pieces (connection pool,
//! response cache, cache TTL) and stamps out one [`RequestContext`] per
//! inbound query. Loaders are never shared between contexts.

use std::sync::Arc;
use std::time::Duration;

use tessera_core::Customer;
use tessera_storage::{CacheConfig, NoopCache, ResponseCache, TtlLruCache};

use crate::config::GatewayConfig;
use crate::error::ApiResult;
use crate::loaders::Loaders;
use crate::upstream::LegacyClient;

/// Shared response cache of mapped root customers.
pub type SharedCache = Arc<dyn ResponseCache<Customer>>;

/// Everything a query's resolvers need. Created fresh for each query and
/// dropped when it completes.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub credential: Option<String>,
    /// Upstream handle bound to `credential`.
    pub client: LegacyClient,
    pub cache: SharedCache,
    pub cache_ttl: Duration,
    pub loaders: Loaders,
}

#[derive(Clone)]
pub struct ContextBuilder {
    client: LegacyClient,
    cache: SharedCache,
    cache_ttl: Duration,
}

impl ContextBuilder {
    pub fn new(client: LegacyClient, cache: SharedCache, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache,
            cache_ttl,
        }
    }

    /// Build the shared client and cache described by `config`.
    pub fn from_config(config: &GatewayConfig) -> ApiResult<Self> {
        let client = LegacyClient::new(&config.legacy_base_url, config.retry_policy())?;
        let cache: SharedCache = if config.cache_enabled {
            Arc::new(TtlLruCache::new(
                CacheConfig::default().with_capacity(config.cache_capacity),
            ))
        } else {
            tracing::warn!("Response cache disabled, every root lookup goes upstream");
            Arc::new(NoopCache::new())
        };
        Ok(Self::new(client, cache, config.cache_ttl))
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// The shared client, carrying no credential.
    pub fn client(&self) -> &LegacyClient {
        &self.client
    }

    pub fn build(&self, request_id: impl Into<String>, credential: Option<&str>) -> RequestContext {
        let client = self.client.with_credential(credential);
        let loaders = Loaders::new(&client);

        RequestContext {
            request_id: request_id.into(),
            credential: credential.map(str::to_string),
            client,
            cache: Arc::clone(&self.cache),
            cache_ttl: self.cache_ttl,
            loaders,
        }
    }
}
