//! Router-level helpers: a gateway wired to a mock legacy service, driven
//! through `tower::ServiceExt::oneshot` without binding a socket.

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tessera_api::{create_router, ApiResult, AppState, GatewayConfig};
use tessera_test_utils::MockLegacy;
use tower::ServiceExt;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Gateway config pointing at `mock` with a fast backoff.
pub fn test_config(mock: &MockLegacy) -> GatewayConfig {
    GatewayConfig {
        legacy_base_url: mock.base_url(),
        backoff_base: Duration::from_millis(1),
        ..GatewayConfig::default()
    }
}

pub fn gateway_with(config: &GatewayConfig) -> ApiResult<Router> {
    Ok(create_router(AppState::from_config(config)?))
}

pub fn gateway(mock: &MockLegacy) -> ApiResult<Router> {
    gateway_with(&test_config(mock))
}

/// Response parts worth asserting on.
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn errors(&self) -> &[Value] {
        self.body["errors"].as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Result<Reply, Box<dyn std::error::Error>> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok(Reply {
        status,
        headers,
        body,
    })
}

/// POST a GraphQL query with optional extra headers.
pub async fn graphql(
    app: &Router,
    query: &str,
    extra_headers: &[(&str, &str)],
) -> Result<Reply, Box<dyn std::error::Error>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json");
    for (name, value) in extra_headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(json!({ "query": query }).to_string()))?;
    send(app, request).await
}

pub async fn get(app: &Router, uri: &str) -> Result<Reply, Box<dyn std::error::Error>> {
    send(app, Request::builder().uri(uri).body(Body::empty())?).await
}
