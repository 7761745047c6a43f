//! QR code generation endpoints.

use axum::{extract::State, routing::post, Json, Router};

use super::validated_keys;
use crate::dto::{AssetKeyDto, OneOrMany, QrReportResponse};
use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Creates QR routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generate-missing", post(generate_missing))
        .route("/generate", post(generate_for_keys))
}

/// Generates QR codes for every asset that has none.
#[utoipa::path(
    post,
    path = "/api/qr/generate-missing",
    responses(
        (status = 200, description = "QR codes generated", body = QrReportResponse),
        (status = 404, description = "No asset needs a QR code", body = ErrorResponse),
        (status = 502, description = "File storage failed", body = ErrorResponse)
    ),
    tag = "QR"
)]
pub async fn generate_missing(
    State(state): State<AppState>,
) -> Result<Json<QrReportResponse>, ApiError> {
    let report = state.qr.generate_missing().await?;
    Ok(Json(report.into()))
}

/// Generates QR codes for the given assets, replacing any existing ones.
#[utoipa::path(
    post,
    path = "/api/qr/generate",
    request_body = Vec<AssetKeyDto>,
    responses(
        (status = 200, description = "QR codes generated", body = QrReportResponse),
        (status = 404, description = "No asset matched", body = ErrorResponse),
        (status = 422, description = "Blank key fields", body = ErrorResponse)
    ),
    tag = "QR"
)]
pub async fn generate_for_keys(
    State(state): State<AppState>,
    Json(body): Json<OneOrMany<AssetKeyDto>>,
) -> Result<Json<QrReportResponse>, ApiError> {
    let keys = validated_keys(body)?;
    let report = state.qr.generate_for(&keys).await?;
    Ok(Json(report.into()))
}
