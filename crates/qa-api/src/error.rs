//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use qa_core::db::DbError;
use qa_core::{LedgerError, QrError, UploadError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (malformed input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unprocessable entity (semantic errors).
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// Validation error with field-level details.
    #[error("Validation failed")]
    ValidationError(ValidationErrorDetails),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// File storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Service unavailable (e.g., metrics not initialized).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Details for field-level validation errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetails {
    /// Overall validation error message.
    pub message: String,
    /// Field-specific errors.
    pub fields: HashMap<String, Vec<FieldError>>,
}

/// A single field validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code (e.g., "required", "length", "audit_status").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error parameters (e.g., max length).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl ValidationErrorDetails {
    /// Creates a new validation error with a single field error.
    pub fn field(field: &str, code: &str, message: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(
            field.to_string(),
            vec![FieldError {
                code: code.to_string(),
                message: message.to_string(),
                params: None,
            }],
        );
        Self {
            message: format!("Validation failed for field '{}'", field),
            fields,
        }
    }

    /// Creates a validation error from multiple field errors.
    pub fn from_fields(errors: HashMap<String, Vec<FieldError>>) -> Self {
        let message = match errors.keys().next() {
            Some(field) if errors.len() == 1 => {
                format!("Validation failed for field '{}'", field)
            }
            _ => format!("Validation failed for {} fields", errors.len()),
        };
        Self {
            message,
            fields: errors,
        }
    }

    /// Prefixes every field name with the position of the item it belongs to.
    pub fn at_index(self, index: usize) -> Self {
        let fields: HashMap<String, Vec<FieldError>> = self
            .fields
            .into_iter()
            .map(|(field, errors)| (format!("[{}].{}", index, field), errors))
            .collect();
        Self::from_fields(fields)
    }
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Request ID for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Creates a validation error for a single field.
    pub fn validation_field(field: &str, code: &str, message: &str) -> Self {
        ApiError::ValidationError(ValidationErrorDetails::field(field, code, message))
    }

    /// Converts validation errors of the `index`-th item of a batch request.
    pub fn item_validation(index: usize, errors: validator::ValidationErrors) -> Self {
        match ApiError::from(errors) {
            ApiError::ValidationError(details) => {
                ApiError::ValidationError(details.at_index(index))
            }
            other => other,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let (message, details) = match &self {
            ApiError::ValidationError(details) => (
                details.message.clone(),
                Some(serde_json::to_value(&details.fields).unwrap_or_default()),
            ),
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details,
            request_id: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DbError::InvalidColumn { .. } => ApiError::Internal(err.to_string()),
            err => ApiError::Database(err.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AssetNotFound(key) => ApiError::NotFound(format!("Asset {} not found", key)),
            LedgerError::InvalidSlotCount(count) => ApiError::validation_field(
                "files",
                "length",
                &format!("At most 3 files can be attached, got {}", count),
            ),
            LedgerError::StorageRead(err) | LedgerError::StorageWrite(err) => err.into(),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidData(msg) => {
                ApiError::validation_field("files", "file_data", &msg)
            }
            err @ (UploadError::InvalidPath(_) | UploadError::Storage(_)) => {
                ApiError::Storage(err.to_string())
            }
        }
    }
}

impl From<QrError> for ApiError {
    fn from(err: QrError) -> Self {
        match err {
            QrError::NothingToGenerate => ApiError::NotFound(err.to_string()),
            QrError::Storage(err) => err.into(),
            QrError::Upload(err) => ApiError::Storage(err.to_string()),
            QrError::Encode(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: HashMap<String, Vec<FieldError>> = HashMap::new();

        for (field_name, field_errors) in err.field_errors() {
            let errors: Vec<FieldError> = field_errors
                .iter()
                .map(|e| {
                    let code = e.code.to_string();
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| {
                        format!("Field '{}' failed validation: {}", field_name, code)
                    });
                    let params = if e.params.is_empty() {
                        None
                    } else {
                        Some(serde_json::to_value(&e.params).unwrap_or_default())
                    };
                    FieldError {
                        code,
                        message,
                        params,
                    }
                })
                .collect();
            fields.insert(field_name.to_string(), errors);
        }

        ApiError::ValidationError(ValidationErrorDetails::from_fields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::db::MissingRecord;
    use qa_core::AssetKey;

    #[test]
    fn test_ledger_errors_map_to_status_codes() {
        let not_found: ApiError = LedgerError::AssetNotFound(AssetKey::new("01", "A1")).into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let too_many: ApiError = LedgerError::InvalidSlotCount(4).into();
        assert_eq!(too_many.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let write: ApiError = LedgerError::StorageWrite(DbError::PoolExhausted).into();
        assert_eq!(write.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(write.error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_missing_history_entry_is_not_found() {
        let id = uuid::Uuid::nil();
        let err: ApiError = DbError::NotFound(MissingRecord::HistoryEntry(id)).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), format!("Not found: history entry {} not found", id));

        let corrupt: ApiError = DbError::invalid_column("trx_date", "bad timestamp").into();
        assert_eq!(corrupt.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upload_errors_map_to_status_codes() {
        let bad: ApiError = UploadError::InvalidData("empty payload".to_string()).into();
        assert_eq!(bad.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let io: ApiError =
            UploadError::Storage(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
                .into();
        assert_eq!(io.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_item_validation_prefixes_field_names() {
        let details = ValidationErrorDetails::field("reg_id", "required", "reg_id is required");
        let ApiError::ValidationError(details) =
            ApiError::ValidationError(details.at_index(2))
        else {
            panic!("expected validation error");
        };
        assert!(details.fields.contains_key("[2].reg_id"));
    }
}
