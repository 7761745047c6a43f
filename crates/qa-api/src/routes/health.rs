//! Health check endpoints.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::time::Instant;

use crate::dto::{DatabaseHealth, HealthResponse};
use crate::state::AppState;

/// Start time for uptime calculation.
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time.
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

/// Creates health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

/// Health check endpoint.
///
/// Returns overall system health status.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse),
        (status = 503, description = "System is unhealthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_healthy = state.db.is_healthy().await;
    let uptime = START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);

    let (status, http_status) = if db_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: DatabaseHealth {
                connected: db_healthy,
                pool_size: state.db.pool_size(),
                idle_connections: state.db.idle_connections(),
            },
            uptime_seconds: uptime,
        }),
    )
}

/// Readiness probe.
///
/// Returns 200 if the database is reachable.
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready"),
        (status = 503, description = "Service is not ready")
    ),
    tag = "Health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    if state.db.is_healthy().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = "Health"
)]
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
