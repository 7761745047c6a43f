//! QR generation endpoint tests.

use axum::http::StatusCode;
use serde_json::json;

use qa_api::dto::{AssetResponse, QrReportResponse};
use qa_api::error::ErrorResponse;

use super::common::{create_test_app, get_request, post_json_request, send_request, FILES_URL};

#[tokio::test]
async fn test_generate_missing_stores_svg_and_links_assets() {
    let test = create_test_app().await;
    test.seed_asset("01", "006/EQP2/1").await;
    test.seed_asset("01", "006/EQP2/2").await;

    let (status, report): (_, QrReportResponse) = send_request(
        test.app(),
        post_json_request("/api/qr/generate-missing", ""),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report.generated.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(
        report.generated[0].qr_url_attachment,
        format!("{}/AssetQrCode/01_006_EQP2_1.svg", FILES_URL)
    );

    let svg = std::fs::read_to_string(test.files.path().join("AssetQrCode/01_006_EQP2_1.svg"))
        .unwrap();
    assert!(svg.contains("<svg"));

    let (_, without): (_, Vec<AssetResponse>) =
        send_request(test.app(), get_request("/api/assets/without-qr")).await;
    assert!(without.is_empty());

    let (status, error): (_, ErrorResponse) = send_request(
        test.app(),
        post_json_request("/api/qr/generate-missing", ""),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error.code, "NOT_FOUND");
}

#[tokio::test]
async fn test_generate_for_keys_ignores_unknown_assets() {
    let test = create_test_app().await;
    test.seed_asset("01", "A1").await;

    let body = json!([
        { "entity_cd": "01", "reg_id": "A1" },
        { "entity_cd": "01", "reg_id": "UNKNOWN" }
    ]);
    let (status, report): (_, QrReportResponse) = send_request(
        test.app(),
        post_json_request("/api/qr/generate", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report.generated.len(), 1);
    assert_eq!(report.generated[0].reg_id, "A1");

    let (_, with): (_, Vec<AssetResponse>) =
        send_request(test.app(), get_request("/api/assets/with-qr")).await;
    assert_eq!(
        with[0].qr_url_attachment.as_deref(),
        Some(format!("{}/AssetQrCode/01_A1.svg", FILES_URL).as_str())
    );
}

#[tokio::test]
async fn test_generate_for_only_unknown_keys_is_not_found() {
    let test = create_test_app().await;

    let body = json!({ "entity_cd": "01", "reg_id": "UNKNOWN" });
    let (status, _): (_, ErrorResponse) = send_request(
        test.app(),
        post_json_request("/api/qr/generate", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
