//! Staff lookup and assignment endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::info;
use validator::Validate;

use crate::dto::{AssignStaffRequest, AssetResponse, StaffResponse};
use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Creates staff routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_staff))
        .route("/assign", put(assign_staff))
        .route("/by-email/:email", get(get_staff_by_email))
        .route("/:staff_id", get(get_staff))
}

/// Lists all staff ordered by name.
#[utoipa::path(
    get,
    path = "/api/staff",
    responses(
        (status = 200, description = "All staff", body = Vec<StaffResponse>)
    ),
    tag = "Staff"
)]
pub async fn list_staff(
    State(state): State<AppState>,
) -> Result<Json<Vec<StaffResponse>>, ApiError> {
    let staff = state.staff.list().await?;
    Ok(Json(staff.into_iter().map(Into::into).collect()))
}

/// Fetches one member of staff.
#[utoipa::path(
    get,
    path = "/api/staff/{staff_id}",
    params(("staff_id" = String, Path, description = "Staff ID")),
    responses(
        (status = 200, description = "Staff found", body = StaffResponse),
        (status = 404, description = "Staff not found", body = ErrorResponse)
    ),
    tag = "Staff"
)]
pub async fn get_staff(
    State(state): State<AppState>,
    Path(staff_id): Path<String>,
) -> Result<Json<StaffResponse>, ApiError> {
    let staff = state
        .staff
        .get(&staff_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Staff {} not found", staff_id)))?;
    Ok(Json(staff.into()))
}

/// Fetches a member of staff by email, ignoring case.
#[utoipa::path(
    get,
    path = "/api/staff/by-email/{email}",
    params(("email" = String, Path, description = "Email address")),
    responses(
        (status = 200, description = "Staff found", body = StaffResponse),
        (status = 404, description = "Staff not found", body = ErrorResponse)
    ),
    tag = "Staff"
)]
pub async fn get_staff_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<StaffResponse>, ApiError> {
    let staff = state
        .staff
        .get_by_email(email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Staff with email {} not found", email)))?;
    Ok(Json(staff.into()))
}

/// Assigns an asset to a member of staff and their division and department.
#[utoipa::path(
    put,
    path = "/api/staff/assign",
    request_body = AssignStaffRequest,
    responses(
        (status = 200, description = "Asset assigned", body = AssetResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
        (status = 422, description = "Missing fields", body = ErrorResponse)
    ),
    tag = "Staff"
)]
pub async fn assign_staff(
    State(state): State<AppState>,
    Json(request): Json<AssignStaffRequest>,
) -> Result<Json<AssetResponse>, ApiError> {
    request.validate()?;

    let key = request.to_key();
    let assignment = request.to_assignment();
    if !state.assets.assign_staff(&key, &assignment).await? {
        return Err(ApiError::NotFound(format!("Asset {} not found", key)));
    }
    info!(asset = %key, staff_id = %assignment.staff_id, "Asset assigned to staff");

    let record = state
        .assets
        .get(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Asset {} not found", key)))?;
    Ok(Json(record.into()))
}
