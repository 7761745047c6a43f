//! Asset register and asset update endpoint tests.

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::json;
use std::sync::Arc;

use qa_core::db::mocks::{MockAssetRepository, MockHistoryRepository};
use qa_core::{AssetKey, AssetLedger, DEFAULT_ACTOR};

use qa_api::dto::{AssetResponse, HistoryEntryResponse, PrintResponse, UpdateResponse};
use qa_api::error::ErrorResponse;
use qa_api::routes::create_router;

use super::common::{
    create_test_app, get_request, post_json_request, put_json_request, send_request, TestApp,
    FILES_URL, PIXEL,
};

const REG: &str = "006/EQP2/1";

fn key_body(reg_id: &str) -> String {
    json!({ "entity_cd": "01", "reg_id": reg_id }).to_string()
}

fn photo() -> serde_json::Value {
    json!({ "file_data": format!("data:image/png;base64,{}", PIXEL) })
}

#[tokio::test]
async fn test_update_uploads_photo_and_appends_history() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let body = json!({
        "entity_cd": "01",
        "reg_id": REG,
        "status_review": "R2",
        "notes": "checked on site",
        "audit_status": "Y",
        "files": [photo()]
    });
    let (status, response): (_, UpdateResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert!(result.inserted);
    assert_eq!(result.uploaded.len(), 1);
    let url = &result.uploaded[0];
    assert!(url.starts_with(&format!(
        "{}/FAAssetUpload/AssetPicture/Asset_01_006_EQP2_1_",
        FILES_URL
    )));
    assert!(url.ends_with("_0.png"));

    let file_name = url.rsplit('/').next().unwrap();
    let stored = std::fs::read(
        test.files
            .path()
            .join("FAAssetUpload/AssetPicture")
            .join(file_name),
    )
    .unwrap();
    assert_eq!(stored, BASE64.decode(PIXEL).unwrap());

    let (_, assets): (_, Vec<AssetResponse>) = send_request(
        test.app(),
        post_json_request("/api/assets/lookup", &key_body(REG)),
    )
    .await;
    assert_eq!(assets[0].status_review.as_deref(), Some("R2"));
    assert_eq!(assets[0].location_map.as_deref(), Some("-6.2,106.8"));
    assert_eq!(assets[0].url_file_attachment2.as_deref(), Some(url.as_str()));
    assert!(assets[0].url_file_attachment.is_none());

    let (status, history): (_, Vec<HistoryEntryResponse>) = send_request(
        test.app(),
        post_json_request("/api/assets/history", &key_body(REG)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.len(), 1);
    assert!(history[0].old_status_review.is_none());
    assert_eq!(history[0].new_status_review.as_deref(), Some("R2"));
    assert_eq!(history[0].note.as_deref(), Some("checked on site"));
    assert_eq!(history[0].audit_status.as_deref(), Some("Y"));
    assert_eq!(history[0].url_file_attachment2.as_deref(), Some(url.as_str()));
    assert_eq!(history[0].audit_user, "WEBAPI");
}

#[tokio::test]
async fn test_note_only_update_patches_latest_entry() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let first = json!({ "entity_cd": "01", "reg_id": REG, "status_review": "R2" });
    let (status, _): (_, UpdateResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &first.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let second = json!({ "entity_cd": "01", "reg_id": REG, "notes": "label replaced", "audit_status": "" });
    let (status, response): (_, UpdateResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &second.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!response.results[0].inserted);
    assert!(response.results[0].patched_note);
    assert!(!response.results[0].patched_audit_status);

    let (_, history): (_, Vec<HistoryEntryResponse>) = send_request(
        test.app(),
        post_json_request("/api/assets/history", &key_body(REG)),
    )
    .await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].note.as_deref(), Some("label replaced"));
    assert_eq!(history[0].audit_status.as_deref(), Some("N"));
}

#[tokio::test]
async fn test_batch_update_processes_items_in_order() {
    let test = create_test_app().await;
    test.seed_asset("01", "A1").await;
    test.seed_asset("01", "A2").await;

    let body = json!([
        { "entity_cd": "01", "reg_id": "A1", "location_map": "-6.3,106.9" },
        { "entity_cd": "01", "reg_id": "A2", "status_review": "R3" }
    ]);
    let (status, response): (_, UpdateResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let regs: Vec<&str> = response.results.iter().map(|r| r.reg_id.as_str()).collect();
    assert_eq!(regs, vec!["A1", "A2"]);
    assert!(response.results.iter().all(|r| r.inserted));
}

#[tokio::test]
async fn test_update_unknown_asset_is_not_found() {
    let test = create_test_app().await;

    let body = json!({ "entity_cd": "01", "reg_id": "MISSING", "files": [photo()] });
    let (status, error): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error.code, "NOT_FOUND");
    assert!(!test.files.path().join("FAAssetUpload").exists());
}

#[tokio::test]
async fn test_update_with_four_files_is_rejected() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let body = json!({
        "entity_cd": "01",
        "reg_id": REG,
        "files": [photo(), photo(), photo(), photo()]
    });
    let (status, error): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error.code, "VALIDATION_ERROR");
    assert!(error.details.unwrap().get("[0].files").is_some());
}

#[tokio::test]
async fn test_update_with_bad_file_data_writes_nothing() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let body = json!({
        "entity_cd": "01",
        "reg_id": REG,
        "status_review": "R2",
        "files": [photo(), { "file_data": "data:image/png;base64,@@@" }]
    });
    let (status, _): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, history): (_, Vec<HistoryEntryResponse>) = send_request(
        test.app(),
        post_json_request("/api/assets/history", &key_body(REG)),
    )
    .await;
    assert!(history.is_empty());
    assert!(!test.files.path().join("FAAssetUpload").exists());
}

fn stored_pictures(test: &TestApp) -> usize {
    std::fs::read_dir(test.files.path().join("FAAssetUpload/AssetPicture"))
        .map(|dir| dir.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_failed_record_write_removes_uploaded_files() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let record = test
        .state
        .assets
        .get(&AssetKey::new("01", REG))
        .await
        .unwrap()
        .unwrap();
    let assets = Arc::new(MockAssetRepository::with_assets(vec![record]));
    assets.fail_updates(true);
    let mut state = test.state.clone();
    state.ledger = Arc::new(AssetLedger::new(
        assets,
        test.state.history.clone(),
        DEFAULT_ACTOR,
    ));

    let body = json!({ "entity_cd": "01", "reg_id": REG, "files": [photo()] });
    let (status, error): (_, ErrorResponse) = send_request(
        create_router(state),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error.code, "DATABASE_ERROR");
    assert_eq!(stored_pictures(&test), 0);
}

#[tokio::test]
async fn test_failed_history_write_keeps_files_the_record_points_at() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let history = Arc::new(MockHistoryRepository::new());
    history.fail_writes(true);
    let mut state = test.state.clone();
    state.ledger = Arc::new(AssetLedger::new(
        test.state.assets.clone(),
        history,
        DEFAULT_ACTOR,
    ));

    let body = json!({ "entity_cd": "01", "reg_id": REG, "files": [photo()] });
    let (status, _): (_, ErrorResponse) = send_request(
        create_router(state),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let record = test
        .state
        .assets
        .get(&AssetKey::new("01", REG))
        .await
        .unwrap()
        .unwrap();
    let url = record.attachments.slot2.expect("record keeps the new photo");
    assert!(url.starts_with(FILES_URL));
    assert_eq!(stored_pictures(&test), 1);
}

#[tokio::test]
async fn test_update_rejects_bad_audit_flag() {
    let test = create_test_app().await;
    test.seed_asset("01", REG).await;

    let body = json!({ "entity_cd": "01", "reg_id": REG, "audit_status": "X" });
    let (status, error): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/update", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error.details.unwrap().get("[0].audit_status").is_some());
}

#[tokio::test]
async fn test_lookup_returns_assets_in_request_order() {
    let test = create_test_app().await;
    test.seed_asset("01", "A1").await;
    test.seed_asset("01", "A2").await;

    let body = json!([
        { "entity_cd": "01", "reg_id": "A2" },
        { "entity_cd": "01", "reg_id": "NOPE" },
        { "entity_cd": " 01 ", "reg_id": " A1 " }
    ]);
    let (status, assets): (_, Vec<AssetResponse>) = send_request(
        test.app(),
        post_json_request("/api/assets/lookup", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let regs: Vec<&str> = assets.iter().map(|a| a.reg_id.as_str()).collect();
    assert_eq!(regs, vec!["A2", "A1"]);
    assert_eq!(assets[0].descs.as_deref(), Some("Laptop"));
}

#[tokio::test]
async fn test_lookup_errors() {
    let test = create_test_app().await;

    let (status, _): (_, ErrorResponse) = send_request(
        test.app(),
        post_json_request("/api/assets/lookup", &key_body("NOPE")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, error): (_, ErrorResponse) = send_request(
        test.app(),
        post_json_request("/api/assets/lookup", &key_body("  ")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error.details.unwrap().get("[0].reg_id").is_some());
}

#[tokio::test]
async fn test_qr_lists_split_assets() {
    let test = create_test_app().await;
    test.seed_asset("01", "A1").await;
    test.seed_asset("01", "A2").await;
    sqlx::query("UPDATE assets SET qr_url_attachment = 'http://files.test/q.svg' WHERE reg_id = 'A2'")
        .execute(test.sqlite())
        .await
        .unwrap();

    let (_, without): (_, Vec<AssetResponse>) =
        send_request(test.app(), get_request("/api/assets/without-qr")).await;
    let (_, with): (_, Vec<AssetResponse>) =
        send_request(test.app(), get_request("/api/assets/with-qr")).await;

    assert_eq!(without.len(), 1);
    assert_eq!(without[0].reg_id, "A1");
    assert_eq!(with.len(), 1);
    assert_eq!(with[0].reg_id, "A2");
}

#[tokio::test]
async fn test_mark_printed() {
    let test = create_test_app().await;
    test.seed_asset("01", "A1").await;
    test.seed_asset("01", "A2").await;

    let body = json!([
        { "entity_cd": "01", "reg_id": "A1" },
        { "entity_cd": "01", "reg_id": "A2" }
    ]);
    let (status, response): (_, PrintResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/print", &body.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.updated, 2);

    let (_, assets): (_, Vec<AssetResponse>) = send_request(
        test.app(),
        post_json_request("/api/assets/lookup", &key_body("A1")),
    )
    .await;
    assert!(assets[0].is_printed);

    let (status, _): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/assets/print", &key_body("NOPE")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
