//! Shared application state for Axum routers.

use crate::config::GatewayConfig;
use crate::context::ContextBuilder;
use crate::error::ApiResult;
use crate::routes::graphql::{create_schema, GatewaySchema};

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub schema: GatewaySchema,
    /// Process-wide client and cache; stamps out one context per query.
    pub contexts: ContextBuilder,
}

impl AppState {
    pub fn new(contexts: ContextBuilder) -> Self {
        Self {
            schema: create_schema(),
            contexts,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> ApiResult<Self> {
        Ok(Self::new(ContextBuilder::from_config(config)?))
    }
}
