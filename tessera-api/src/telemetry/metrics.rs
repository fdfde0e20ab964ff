//! Prometheus Metrics Definitions
//!
//! Defines all Tessera gateway metrics with appropriate labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};
use tessera_storage::CacheStats;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Distinct keys per loader dispatch.
const BATCH_SIZE_BUCKETS: &[f64] = &[1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<TesseraMetrics>> = Lazy::new(TesseraMetrics::new);

/// Container for all gateway metrics.
#[derive(Clone)]
pub struct TesseraMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Upstream attempt counter - labels: operation, outcome
    /// (success, not_found, transient, permanent)
    pub upstream_attempts_total: CounterVec,

    /// Upstream retry counter - labels: operation
    pub upstream_retries_total: CounterVec,

    /// Root cache lookups - labels: result (hit, miss)
    pub cache_lookups_total: CounterVec,

    /// Entries held by the response cache, sampled on scrape
    pub cache_entries: IntGauge,

    /// Capacity evictions since start, sampled on scrape
    pub cache_evictions: IntGauge,

    /// Keys per loader dispatch - labels: loader
    pub loader_batch_size: HistogramVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl TesseraMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "tessera_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "tessera_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            upstream_attempts_total: register_counter_vec!(
                "tessera_upstream_attempts_total",
                "Upstream call attempts by outcome",
                &["operation", "outcome"]
            )
            .map_err(|e| registration_error("upstream_attempts_total", e))?,

            upstream_retries_total: register_counter_vec!(
                "tessera_upstream_retries_total",
                "Upstream retries after a transient failure",
                &["operation"]
            )
            .map_err(|e| registration_error("upstream_retries_total", e))?,

            cache_lookups_total: register_counter_vec!(
                "tessera_cache_lookups_total",
                "Response cache lookups",
                &["result"]
            )
            .map_err(|e| registration_error("cache_lookups_total", e))?,

            cache_entries: register_int_gauge!(
                "tessera_cache_entries",
                "Entries held by the response cache"
            )
            .map_err(|e| registration_error("cache_entries", e))?,

            cache_evictions: register_int_gauge!(
                "tessera_cache_evictions",
                "Response cache capacity evictions"
            )
            .map_err(|e| registration_error("cache_evictions", e))?,

            loader_batch_size: register_histogram_vec!(
                "tessera_loader_batch_size",
                "Distinct keys per loader dispatch",
                &["loader"],
                BATCH_SIZE_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("loader_batch_size", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_upstream_attempt(&self, operation: &str, outcome: &str) {
        self.upstream_attempts_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn record_upstream_retry(&self, operation: &str) {
        self.upstream_retries_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn record_cache_lookup(&self, hit: bool) {
        let result = if hit { "hit" } else { "miss" };
        self.cache_lookups_total.with_label_values(&[result]).inc();
    }

    pub fn record_loader_batch(&self, loader: &str, size: usize) {
        self.loader_batch_size
            .with_label_values(&[loader])
            .observe(size as f64);
    }

    /// Copy point-in-time cache counters into their gauges.
    pub fn observe_cache(&self, stats: &CacheStats) {
        self.cache_entries
            .set(i64::try_from(stats.entry_count).unwrap_or(i64::MAX));
        self.cache_evictions
            .set(i64::try_from(stats.evictions).unwrap_or(i64::MAX));
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.observe_cache(&state.contexts.cache().stats());
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
