//! HTTP Routes Module
//!
//! Includes:
//! - GraphQL endpoint and GraphiQL playground
//! - Health check endpoints
//! - Prometheus metrics
//! - CORS support for browser-based clients

pub mod graphql;
pub mod health;

use axum::{
    http::{header, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::middleware::{request_id_middleware, REQUEST_ID_HEADER};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use graphql::{create_schema, GatewaySchema, QueryRoot};

// ============================================================================
// CORS LAYER
// ============================================================================

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            REQUEST_ID_HEADER.clone(),
        ])
        .expose_headers([REQUEST_ID_HEADER.clone()])
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete gateway router:
/// - GraphQL at /graphql (POST executes, GET serves GraphiQL)
/// - Health checks at /health and /health/ready
/// - Metrics at /metrics
///
/// Execution order: CORS -> request id -> observability -> handler.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(graphql::create_router())
        .merge(health::create_router())
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(build_cors_layer())
        .with_state(state)
}
