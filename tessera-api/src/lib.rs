//! Tessera API - GraphQL aggregation gateway
//!
//! Serves a small graph (customers and their orders) on top of the legacy
//! record service. Each query gets its own batching loaders and a handle to
//! the upstream client bound to the caller's credential; root customer
//! lookups share one process-wide TTL/LRU cache.

pub mod config;
pub mod context;
pub mod error;
pub mod loaders;
pub mod middleware;
pub mod resolvers;
pub mod retry;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export commonly used types
pub use config::GatewayConfig;
pub use context::{ContextBuilder, RequestContext, SharedCache};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use loaders::{CustomerLoader, Loaders, OrderLoader};
pub use middleware::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use retry::{with_retry, RetryPolicy};
pub use routes::{create_router, create_schema, GatewaySchema};
pub use state::AppState;
pub use upstream::LegacyClient;
