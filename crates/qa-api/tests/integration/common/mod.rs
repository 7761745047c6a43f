//! Common test utilities for integration tests.

use axum::{
    body::Body,
    http::{Method, StatusCode},
    Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use qa_api::{routes, state::AppState, StorageLayout};
use qa_core::db::{create_pool, run_migrations, DbPool};
use qa_core::LocalFileStore;

/// Public base URL the test file store hands out.
pub const FILES_URL: &str = "http://files.test";

/// A 1x1 PNG.
pub const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// Router plus everything it needs to stay alive.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: DbPool,
    pub files: TempDir,
}

impl TestApp {
    /// Returns a fresh router over the same state.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn sqlite(&self) -> &sqlx::SqlitePool {
        match &self.pool {
            DbPool::Sqlite(pool) => pool,
            DbPool::Postgres(_) => panic!("expected sqlite pool"),
        }
    }

    /// Inserts a bare asset with a location and status.
    pub async fn seed_asset(&self, entity_cd: &str, reg_id: &str) {
        sqlx::query(
            "INSERT INTO assets (entity_cd, reg_id, descs, location_map, status_review, is_printed) \
             VALUES (?, ?, 'Laptop', '-6.2,106.8', 'R1', 0)",
        )
        .bind(entity_cd)
        .bind(reg_id)
        .execute(self.sqlite())
        .await
        .expect("Failed to seed asset");
    }

    pub async fn seed_staff(&self, staff_id: &str, name: &str, email: &str) {
        sqlx::query(
            "INSERT INTO staff (staff_id, staff_name, email_add, div_cd, dept_cd) \
             VALUES (?, ?, ?, 'D1', 'P1')",
        )
        .bind(staff_id)
        .bind(name)
        .bind(email)
        .execute(self.sqlite())
        .await
        .expect("Failed to seed staff");
    }
}

/// Creates an app over a migrated in-memory database.
pub async fn create_test_app() -> TestApp {
    let pool = create_pool("sqlite::memory:")
        .await
        .expect("Failed to create SQLite pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let files = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(LocalFileStore::new(files.path(), FILES_URL));
    let state = AppState::new(pool.clone(), store, StorageLayout::default());
    let router = routes::create_router(state.clone());

    TestApp {
        router,
        state,
        pool,
        files,
    }
}

/// Helper to make GET requests.
pub fn get_request(uri: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to make POST requests with JSON body.
pub fn post_json_request(uri: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make PUT requests with JSON body.
pub fn put_json_request(uri: &str, body: &str) -> axum::extract::Request<Body> {
    axum::extract::Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Sends request and parses JSON response.
pub async fn send_request<T: DeserializeOwned>(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, T) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: T = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Failed to parse response: {} - Body: {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, parsed)
}

/// Sends request and returns raw response body.
pub async fn send_request_raw(
    app: Router,
    request: axum::extract::Request<Body>,
) -> (StatusCode, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).to_string())
}
