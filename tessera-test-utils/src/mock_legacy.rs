//! In-process mock of the legacy record service.
//!
//! Serves the same four read endpoints as the real service on an ephemeral
//! localhost port, plus call accounting (hits per path, forwarded
//! `authorization` headers, batch id lists) and fault injection (forced
//! statuses and per-path delays) for retry and tolerance tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tessera_core::{LegacyCustomer, LegacyOrder};
use tokio::task::JoinHandle;

use crate::fixtures;

/// Forced response for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub status: u16,
    /// Calls left before the fault clears. `None` never clears.
    pub remaining: Option<u32>,
}

#[derive(Default)]
struct Recorded {
    hits: HashMap<String, u32>,
    authorizations: Vec<Option<String>>,
    batch_requests: Vec<Vec<String>>,
}

struct MockState {
    customers: Vec<LegacyCustomer>,
    orders: Vec<LegacyOrder>,
    latency: Duration,
    faults: Mutex<HashMap<String, Fault>>,
    delays: Mutex<HashMap<String, Duration>>,
    recorded: Mutex<Recorded>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    /// Consume one use of the fault registered for `path`, if any.
    fn take_fault(&self, path: &str) -> Option<u16> {
        let mut faults = lock(&self.faults);
        let fault = *faults.get(path)?;
        match fault.remaining {
            None => Some(fault.status),
            Some(n) if n <= 1 => {
                faults.remove(path);
                (n == 1).then_some(fault.status)
            }
            Some(n) => {
                faults.insert(
                    path.to_string(),
                    Fault {
                        remaining: Some(n - 1),
                        ..fault
                    },
                );
                Some(fault.status)
            }
        }
    }
}

/// Handle to a running mock legacy service. The server stops on drop.
pub struct MockLegacy {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockLegacy {
    /// Start with the demo data set and no artificial latency.
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(
            fixtures::legacy_customers(),
            fixtures::legacy_orders(),
            Duration::ZERO,
        )
        .await
    }

    /// Start with explicit records and a latency applied to every record
    /// endpoint.
    pub async fn start_with(
        customers: Vec<LegacyCustomer>,
        orders: Vec<LegacyOrder>,
        latency: Duration,
    ) -> std::io::Result<Self> {
        let state = Arc::new(MockState {
            customers,
            orders,
            latency,
            faults: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/health", get(health))
            .route("/customers", get(list_customers))
            .route("/customers/:id", get(get_customer))
            .route("/customers/:id/orders", get(customer_orders))
            .route("/orders/:id", get(get_order))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&state),
                record_and_inject,
            ))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock legacy service stopped");
            }
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL suitable for the gateway's upstream configuration.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Respond to the next `times` calls on `path` with `status`.
    pub fn fail_times(&self, path: &str, status: u16, times: u32) {
        lock(&self.state.faults).insert(
            path.to_string(),
            Fault {
                status,
                remaining: Some(times),
            },
        );
    }

    /// Respond to every call on `path` with `status`.
    pub fn fail_always(&self, path: &str, status: u16) {
        lock(&self.state.faults).insert(
            path.to_string(),
            Fault {
                status,
                remaining: None,
            },
        );
    }

    /// Delay every call on `path` by `delay` before responding.
    pub fn delay(&self, path: &str, delay: Duration) {
        lock(&self.state.delays).insert(path.to_string(), delay);
    }

    /// Number of requests received on `path` (exact match, query excluded).
    pub fn hits(&self, path: &str) -> u32 {
        lock(&self.state.recorded)
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Number of requests received on any record endpoint.
    pub fn total_hits(&self) -> u32 {
        lock(&self.state.recorded).hits.values().sum()
    }

    /// `authorization` header of every request, in arrival order.
    pub fn authorizations(&self) -> Vec<Option<String>> {
        lock(&self.state.recorded).authorizations.clone()
    }

    /// Id lists received by the batch endpoint, in arrival order.
    pub fn batch_requests(&self) -> Vec<Vec<String>> {
        lock(&self.state.recorded).batch_requests.clone()
    }

    /// Forget recorded calls; faults and delays stay.
    pub fn reset_recorded(&self) {
        *lock(&self.state.recorded) = Recorded::default();
    }
}

impl Drop for MockLegacy {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

async fn record_and_inject(
    State(state): State<Arc<MockState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);
    let auth_seen = if authorization.is_some() { "1" } else { "0" };

    {
        let mut recorded = lock(&state.recorded);
        *recorded.hits.entry(path.clone()).or_insert(0) += 1;
        recorded.authorizations.push(authorization);
    }

    let delay = lock(&state.delays).get(&path).copied().unwrap_or(state.latency);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut response = match state.take_fault(&path) {
        Some(status) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "error": "injected_fault" }))).into_response()
        }
        None => next.run(request).await,
    };
    response
        .headers_mut()
        .insert("x-legacy-auth-seen", HeaderValue::from_static(auth_seen));
    response
}

// ============================================================================
// HANDLERS
// ============================================================================

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

async fn get_customer(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    match state.customers.iter().find(|c| c.customer_id == id) {
        Some(customer) => Json(customer.clone()).into_response(),
        None => not_found(),
    }
}

async fn list_customers(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let ids: Vec<String> = params
        .get("ids")
        .map(|raw| {
            raw.split(',')
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    lock(&state.recorded).batch_requests.push(ids.clone());

    // Rows come back in storage order, not request order.
    let rows: Vec<&LegacyCustomer> = state
        .customers
        .iter()
        .filter(|c| ids.contains(&c.customer_id))
        .collect();
    Json(json!({ "rows": rows })).into_response()
}

async fn customer_orders(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    let orders: Vec<_> = state
        .orders
        .iter()
        .filter(|o| o.customer_id == id)
        .map(|o| json!({ "order_id": o.order_id, "status": o.status }))
        .collect();
    Json(json!({ "customer_id": id, "orders": orders })).into_response()
}

async fn get_order(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    match state.orders.iter().find(|o| o.order_id == id) {
        Some(order) => Json(order.clone()).into_response(),
        None => not_found(),
    }
}
