//! Division and department lookups.

use axum::{extract::State, routing::get, Json, Router};

use crate::dto::{DepartmentResponse, DivisionResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Creates organisation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/divisions", get(list_divisions))
        .route("/departments", get(list_departments))
}

#[utoipa::path(
    get,
    path = "/api/divisions",
    responses(
        (status = 200, description = "All divisions", body = Vec<DivisionResponse>)
    ),
    tag = "Organisation"
)]
pub async fn list_divisions(
    State(state): State<AppState>,
) -> Result<Json<Vec<DivisionResponse>>, ApiError> {
    let divisions = state.org.list_divisions().await?;
    Ok(Json(divisions.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "All departments", body = Vec<DepartmentResponse>)
    ),
    tag = "Organisation"
)]
pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<Vec<DepartmentResponse>>, ApiError> {
    let departments = state.org.list_departments().await?;
    Ok(Json(departments.into_iter().map(Into::into).collect()))
}
