//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Provides automatic instrumentation of all HTTP requests with:
//! - Distributed tracing spans (W3C traceparent propagation)
//! - Prometheus metrics collection
//! - Completion logging tagged with the request id

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use opentelemetry::{
    global,
    trace::{Span, SpanKind, Status, Tracer},
    Context, KeyValue,
};
use opentelemetry_http::HeaderExtractor;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::METRICS;
use crate::middleware::RequestId;

static UUID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}").ok()
});

static ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Extract trace context from incoming request headers.
fn extract_trace_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Normalize path for metrics/spans (replace UUIDs and numeric IDs with
/// placeholders) to keep Prometheus label cardinality bounded.
fn normalize_path(path: &str) -> String {
    let mut result = path.to_string();
    if let Some(pattern) = UUID_PATTERN.as_ref() {
        result = pattern.replace_all(&result, "{id}").into_owned();
    }
    if let Some(pattern) = ID_PATTERN.as_ref() {
        result = pattern.replace_all(&result, "/{id}$1").into_owned();
    }
    result
}

/// Observability middleware for Axum.
///
/// Wraps every request with an OpenTelemetry server span, an
/// `http_request` tracing span carrying the request id, and Prometheus
/// request metrics. Must run inside the request-id middleware.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();

    let parent_context = extract_trace_context(request.headers());
    let tracer = global::tracer("tessera-api");
    let mut span = tracer
        .span_builder(format!("{} {}", method, normalized_path))
        .with_kind(SpanKind::Server)
        .with_attributes(vec![
            KeyValue::new("http.method", method.to_string()),
            KeyValue::new("http.target", path.clone()),
            KeyValue::new("http.route", normalized_path.clone()),
            KeyValue::new("request.id", request_id.clone()),
        ])
        .start_with_context(&tracer, &parent_context);

    let tracing_span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
        request_id = %request_id,
        otel.kind = "server",
    );

    let response = next.run(request).instrument(tracing_span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Ok(metrics) = METRICS.as_ref() {
        metrics.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    span.set_attribute(KeyValue::new("http.status_code", i64::from(status.as_u16())));
    if status.is_server_error() {
        span.set_status(Status::error("Server error"));
    } else if status.is_client_error() {
        span.set_status(Status::error("Client error"));
    } else {
        span.set_status(Status::Ok);
    }
    span.end();

    tracing::info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/graphql/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/graphql/{id}");
    }

    #[test]
    fn test_normalize_path_numeric_id() {
        assert_eq!(normalize_path("/items/12345"), "/items/{id}");
        assert_eq!(normalize_path("/items/12345/parts/7"), "/items/{id}/parts/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/graphql"), "/graphql");
        assert_eq!(normalize_path("/health"), "/health");
    }
}
