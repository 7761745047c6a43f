//! Staff and organisation endpoint tests.

use axum::http::StatusCode;
use serde_json::json;

use qa_api::dto::{AssetResponse, DivisionResponse, StaffResponse};
use qa_api::error::ErrorResponse;

use super::common::{create_test_app, get_request, put_json_request, send_request};

#[tokio::test]
async fn test_staff_lookups() {
    let test = create_test_app().await;
    test.seed_staff("S002", "Budi", "budi@example.com").await;
    test.seed_staff("S001", "Andi", "Andi@Example.com").await;

    let (status, staff): (_, Vec<StaffResponse>) =
        send_request(test.app(), get_request("/api/staff")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = staff.iter().map(|s| s.staff_name.as_str()).collect();
    assert_eq!(names, vec!["Andi", "Budi"]);

    let (status, one): (_, StaffResponse) =
        send_request(test.app(), get_request("/api/staff/S002")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one.staff_name, "Budi");

    let (status, by_email): (_, StaffResponse) = send_request(
        test.app(),
        get_request("/api/staff/by-email/andi@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_email.staff_id, "S001");

    let (status, _): (_, ErrorResponse) =
        send_request(test.app(), get_request("/api/staff/S999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_assign_staff_to_asset() {
    let test = create_test_app().await;
    test.seed_asset("01", "A1").await;

    let body = json!({
        "entity_cd": "01",
        "reg_id": "A1",
        "staff_id": "S001",
        "div_cd": "D1",
        "dept_cd": "P1"
    });
    let (status, asset): (_, AssetResponse) = send_request(
        test.app(),
        put_json_request("/api/staff/assign", &body.to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(asset.staff_id.as_deref(), Some("S001"));
    assert_eq!(asset.div_cd.as_deref(), Some("D1"));
    assert_eq!(asset.dept_cd.as_deref(), Some("P1"));
}

#[tokio::test]
async fn test_assign_staff_errors() {
    let test = create_test_app().await;

    let missing_asset = json!({
        "entity_cd": "01",
        "reg_id": "NOPE",
        "staff_id": "S001",
        "div_cd": "D1",
        "dept_cd": "P1"
    });
    let (status, _): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/staff/assign", &missing_asset.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let blank = json!({
        "entity_cd": "01",
        "reg_id": "A1",
        "staff_id": "",
        "div_cd": "D1",
        "dept_cd": "P1"
    });
    let (status, error): (_, ErrorResponse) = send_request(
        test.app(),
        put_json_request("/api/staff/assign", &blank.to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(error.details.unwrap().get("staff_id").is_some());
}

#[tokio::test]
async fn test_divisions_and_departments() {
    let test = create_test_app().await;
    sqlx::query("INSERT INTO divisions (div_cd, descs) VALUES ('D2', 'Finance'), ('D1', 'IT')")
        .execute(test.sqlite())
        .await
        .unwrap();

    let (status, divisions): (_, Vec<DivisionResponse>) =
        send_request(test.app(), get_request("/api/divisions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(divisions.len(), 2);
    assert_eq!(divisions[0].div_cd, "D1");

    let (status, departments): (_, Vec<serde_json::Value>) =
        send_request(test.app(), get_request("/api/departments")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(departments.is_empty());
}
