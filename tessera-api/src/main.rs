//! Tessera Gateway Server Entry Point
//!
//! Bootstraps telemetry and configuration, then serves the Axum router on a
//! single-threaded runtime until Ctrl-C.

use tessera_api::{create_router, ApiError, ApiResult, AppState, GatewayConfig};

use tessera_api::telemetry::{init_tracer, shutdown_tracer, TelemetryConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let config = GatewayConfig::from_env();
    config.validate()?;

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr = config.bind_addr()?;
    tracing::info!(
        %addr,
        legacy_base_url = %config.legacy_base_url,
        cache_enabled = config.cache_enabled,
        max_retries = config.max_retries,
        "Starting Tessera gateway"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    shutdown_tracer();
    Ok(())
}
