//! Asset register endpoints.

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use tracing::{debug, instrument, warn, Instrument};
use validator::Validate;

use qa_core::{AssetKey, ProposedUpdate};
use qa_observability::asset_span;

use super::validated_keys;
use crate::dto::{
    non_empty, AssetKeyDto, AssetResponse, HistoryEntryResponse, OneOrMany, PrintResponse,
    UpdateAssetItem, UpdateResponse, UpdateResultItem,
};
use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Creates asset routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/without-qr", get(list_without_qr))
        .route("/with-qr", get(list_with_qr))
        .route("/lookup", post(lookup_assets))
        .route("/history", post(asset_history))
        .route("/print", put(mark_printed))
        .route("/update", put(update_assets))
}

/// Lists assets that have no QR code yet.
#[utoipa::path(
    get,
    path = "/api/assets/without-qr",
    responses(
        (status = 200, description = "Assets without a QR code", body = Vec<AssetResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Assets"
)]
pub async fn list_without_qr(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssetResponse>>, ApiError> {
    let assets = state.assets.list_without_qr().await?;
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

/// Lists assets that already have a QR code.
#[utoipa::path(
    get,
    path = "/api/assets/with-qr",
    responses(
        (status = 200, description = "Assets with a QR code", body = Vec<AssetResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Assets"
)]
pub async fn list_with_qr(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssetResponse>>, ApiError> {
    let assets = state.assets.list_with_qr().await?;
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

/// Fetches one or more assets by key.
#[utoipa::path(
    post,
    path = "/api/assets/lookup",
    request_body = Vec<AssetKeyDto>,
    responses(
        (status = 200, description = "Matching assets", body = Vec<AssetResponse>),
        (status = 404, description = "No asset matched", body = ErrorResponse),
        (status = 422, description = "Blank key fields", body = ErrorResponse)
    ),
    tag = "Assets"
)]
pub async fn lookup_assets(
    State(state): State<AppState>,
    Json(body): Json<OneOrMany<AssetKeyDto>>,
) -> Result<Json<Vec<AssetResponse>>, ApiError> {
    let keys = validated_keys(body)?;
    let assets = state.assets.get_many(&keys).await?;
    if assets.is_empty() {
        return Err(ApiError::NotFound("No matching assets".to_string()));
    }
    Ok(Json(assets.into_iter().map(Into::into).collect()))
}

/// Returns the transaction history of one or more assets, newest first.
#[utoipa::path(
    post,
    path = "/api/assets/history",
    request_body = Vec<AssetKeyDto>,
    responses(
        (status = 200, description = "History entries", body = Vec<HistoryEntryResponse>),
        (status = 422, description = "Blank key fields", body = ErrorResponse)
    ),
    tag = "Assets"
)]
pub async fn asset_history(
    State(state): State<AppState>,
    Json(body): Json<OneOrMany<AssetKeyDto>>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let keys = validated_keys(body)?;
    let mut entries = Vec::new();
    for key in &keys {
        entries.extend(state.history.list_for(key).await?);
    }
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Marks the QR labels of the given assets as printed.
#[utoipa::path(
    put,
    path = "/api/assets/print",
    request_body = Vec<AssetKeyDto>,
    responses(
        (status = 200, description = "Assets marked printed", body = PrintResponse),
        (status = 404, description = "No asset matched", body = ErrorResponse),
        (status = 422, description = "Blank key fields", body = ErrorResponse)
    ),
    tag = "Assets"
)]
pub async fn mark_printed(
    State(state): State<AppState>,
    Json(body): Json<OneOrMany<AssetKeyDto>>,
) -> Result<Json<PrintResponse>, ApiError> {
    let keys = validated_keys(body)?;
    let updated = state.assets.mark_printed(&keys).await?;
    if updated == 0 {
        return Err(ApiError::NotFound("No matching assets".to_string()));
    }
    Ok(Json(PrintResponse { updated }))
}

/// Applies one or more asset updates.
///
/// Items are processed in order and processing stops at the first failure;
/// items before it stay applied.
#[utoipa::path(
    put,
    path = "/api/assets/update",
    request_body = Vec<UpdateAssetItem>,
    responses(
        (status = 200, description = "Updates reconciled", body = UpdateResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
        (status = 422, description = "Invalid item", body = ErrorResponse),
        (status = 502, description = "File storage failed", body = ErrorResponse)
    ),
    tag = "Assets"
)]
#[instrument(skip_all)]
pub async fn update_assets(
    State(state): State<AppState>,
    Json(body): Json<OneOrMany<UpdateAssetItem>>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let items = body.into_vec();
    if items.is_empty() {
        return Err(ApiError::validation_field(
            "items",
            "required",
            "At least one update is required",
        ));
    }
    for (index, item) in items.iter().enumerate() {
        item.validate()
            .map_err(|e| ApiError::item_validation(index, e))?;
    }

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let span = asset_span!(item.to_key());
        results.push(update_one(&state, item).instrument(span).await?);
    }

    Ok(Json(UpdateResponse { results }))
}

/// Uploads the files of one item and reconciles it.
///
/// When reconciliation fails, stored files that the asset record does not
/// point at are removed again.
async fn update_one(state: &AppState, item: UpdateAssetItem) -> Result<UpdateResultItem, ApiError> {
    let key = item.to_key();
    if state.assets.get(&key).await?.is_none() {
        return Err(ApiError::NotFound(format!("Asset {} not found", key)));
    }

    let files: Vec<String> = item.files.into_iter().map(|f| f.file_data).collect();
    let uploaded = state.uploader.upload_all(&key, &files, Utc::now()).await?;
    debug!(uploaded = uploaded.len(), "Files stored");

    let update = ProposedUpdate {
        location: non_empty(item.location_map),
        status: non_empty(item.status_review),
        note: non_empty(item.notes),
        audit_status: non_empty(item.audit_status).map(|s| s.trim().to_string()),
        new_files: uploaded.clone(),
    };
    match state.ledger.reconcile_asset_update(&key, update).await {
        Ok(outcome) => Ok(UpdateResultItem::new(key, outcome, uploaded)),
        Err(e) => {
            discard_unreferenced(state, &key, uploaded).await;
            Err(e.into())
        }
    }
}

async fn discard_unreferenced(state: &AppState, key: &AssetKey, uploaded: Vec<String>) {
    if uploaded.is_empty() {
        return;
    }
    match state.assets.get(key).await {
        Ok(record) => {
            let orphans: Vec<String> = uploaded
                .into_iter()
                .filter(|url| {
                    record
                        .as_ref()
                        .map_or(true, |r| !r.attachments.contains(url))
                })
                .collect();
            state.uploader.discard(&orphans).await;
        }
        Err(e) => warn!(error = %e, "Keeping uploaded files, asset record unreadable"),
    }
}
