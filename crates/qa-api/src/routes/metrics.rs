//! Prometheus metrics endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use qa_observability::record_db_pool;

use crate::state::AppState;

/// Creates metrics routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(prometheus_metrics))
}

/// Prometheus metrics endpoint.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain"),
        (status = 503, description = "Metrics recorder not installed")
    ),
    tag = "Metrics"
)]
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.prometheus_handle {
        Some(handle) => {
            record_db_pool(state.db.pool_size(), state.db.idle_connections());
            (
                StatusCode::OK,
                [(
                    header::CONTENT_TYPE,
                    "text/plain; version=0.0.4; charset=utf-8",
                )],
                handle.render(),
            )
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Prometheus metrics not initialized".to_string(),
        ),
    }
}
