//! Health and metrics endpoint tests.

use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;
use qa_api::dto::HealthResponse;
use qa_api::routes;

use super::common::{create_test_app, get_request, send_request, send_request_raw};

#[tokio::test]
async fn test_health_check_reports_database() {
    let test = create_test_app().await;

    let (status, body): (_, HealthResponse) =
        send_request(test.app(), get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "healthy");
    assert!(body.database.connected);
    assert!(!body.version.is_empty());
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let test = create_test_app().await;

    let (status, _) = send_request_raw(test.app(), get_request("/live")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_request_raw(test.app(), get_request("/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_unavailable_without_recorder() {
    let test = create_test_app().await;

    let (status, body) = send_request_raw(test.app(), get_request("/metrics")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("not initialized"));
}

#[tokio::test]
async fn test_metrics_rendered_with_handle() {
    let test = create_test_app().await;
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let router = routes::create_router(test.state.clone().with_prometheus_handle(handle));

    let (status, _) = send_request_raw(router, get_request("/metrics")).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let test = create_test_app().await;

    let (status, _) = send_request_raw(test.app(), get_request("/api/nope")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
