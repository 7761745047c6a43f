//! API routes.

pub mod assets;
pub mod health;
pub mod metrics;
pub mod org;
pub mod qr;
pub mod staff;

use axum::Router;
use validator::Validate;

use qa_core::AssetKey;

use crate::dto::{AssetKeyDto, OneOrMany};
use crate::error::ApiError;
use crate::state::AppState;

/// Creates the main API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .merge(health::routes())
        .merge(metrics::routes())
        .with_state(state)
}

/// API routes under /api prefix.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/assets", assets::routes())
        .nest("/qr", qr::routes())
        .nest("/staff", staff::routes())
        .merge(org::routes())
}

/// Validates a key body and returns the trimmed keys in request order.
pub(crate) fn validated_keys(body: OneOrMany<AssetKeyDto>) -> Result<Vec<AssetKey>, ApiError> {
    let items = body.into_vec();
    if items.is_empty() {
        return Err(ApiError::validation_field(
            "keys",
            "required",
            "At least one asset key is required",
        ));
    }
    items
        .iter()
        .enumerate()
        .map(|(index, dto)| {
            dto.validate()
                .map_err(|e| ApiError::item_validation(index, e))?;
            Ok(dto.to_key())
        })
        .collect()
}
