//! Health Check Endpoints
//!
//! - /health - Liveness, always `{"ok": true}` while the process serves
//! - /health/ready - Readiness, also reaches the legacy service
//!
//! No authentication required for health endpoints.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Liveness payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub ok: bool,
}

/// Readiness payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ok: bool,
    pub legacy: ComponentHealth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { ok: true })
}

/// GET /health/ready
///
/// 503 when the legacy service cannot be reached with a single attempt.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let result = state.contexts.client().ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ok: true,
                legacy: ComponentHealth {
                    reachable: true,
                    latency_ms,
                    error: None,
                },
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, latency_ms, "Legacy service not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ok: false,
                    legacy: ComponentHealth {
                        reachable: false,
                        latency_ms,
                        error: Some(e.to_string()),
                    },
                }),
            )
        }
    }
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(liveness))
        .route("/health/ready", get(readiness))
}
