//! Data Transfer Objects (DTOs) for API requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use qa_core::{
    AssetHistoryEntry, AssetKey, AssetRecord, Department, Division, GeneratedQr, QrReport,
    ReconcileOutcome, Staff, StaffAssignment,
};

/// Request body that accepts either a single object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn audit_flag(value: &str) -> Result<(), ValidationError> {
    match value.trim() {
        "" | "Y" | "N" => Ok(()),
        _ => {
            let mut err = ValidationError::new("audit_status");
            err.message = Some("must be 'Y' or 'N'".into());
            Err(err)
        }
    }
}

/// Treats empty or whitespace-only strings as absent.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Asset DTOs
// ============================================================================

/// Identifies one asset.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssetKeyDto {
    #[validate(custom(function = "not_blank"))]
    pub entity_cd: String,
    #[validate(custom(function = "not_blank"))]
    pub reg_id: String,
}

impl AssetKeyDto {
    pub fn to_key(&self) -> AssetKey {
        AssetKey::new(self.entity_cd.trim(), self.reg_id.trim())
    }
}

impl From<AssetKey> for AssetKeyDto {
    fn from(key: AssetKey) -> Self {
        Self {
            entity_cd: key.entity_cd,
            reg_id: key.reg_id,
        }
    }
}

/// Current state of an asset.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssetResponse {
    pub entity_cd: String,
    pub reg_id: String,
    pub descs: Option<String>,
    pub location_map: Option<String>,
    pub status_review: Option<String>,
    pub url_file_attachment: Option<String>,
    pub url_file_attachment2: Option<String>,
    pub url_file_attachment3: Option<String>,
    pub qr_url_attachment: Option<String>,
    pub is_printed: bool,
    pub staff_id: Option<String>,
    pub div_cd: Option<String>,
    pub dept_cd: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<AssetRecord> for AssetResponse {
    fn from(record: AssetRecord) -> Self {
        Self {
            entity_cd: record.key.entity_cd,
            reg_id: record.key.reg_id,
            descs: record.description,
            location_map: record.location_map,
            status_review: record.status_review,
            url_file_attachment: record.attachments.slot1,
            url_file_attachment2: record.attachments.slot2,
            url_file_attachment3: record.attachments.slot3,
            qr_url_attachment: record.qr_url,
            is_printed: record.printed,
            staff_id: record.staff_id,
            div_cd: record.div_cd,
            dept_cd: record.dept_cd,
            updated_at: record.updated_at,
        }
    }
}

/// One row of an asset's transaction history.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    pub entity_cd: String,
    pub reg_id: String,
    pub trx_date: DateTime<Utc>,
    pub old_location_map: Option<String>,
    pub new_location_map: Option<String>,
    pub old_status_review: Option<String>,
    pub new_status_review: Option<String>,
    pub note: Option<String>,
    pub audit_status: Option<String>,
    pub url_file_attachment: Option<String>,
    pub url_file_attachment2: Option<String>,
    pub url_file_attachment3: Option<String>,
    pub audit_user: String,
}

impl From<AssetHistoryEntry> for HistoryEntryResponse {
    fn from(entry: AssetHistoryEntry) -> Self {
        Self {
            id: entry.id,
            entity_cd: entry.key.entity_cd,
            reg_id: entry.key.reg_id,
            trx_date: entry.timestamp,
            old_location_map: entry.old_location,
            new_location_map: entry.new_location,
            old_status_review: entry.old_status,
            new_status_review: entry.new_status,
            note: entry.note,
            audit_status: entry.audit_status,
            url_file_attachment: entry.attachments.slot1,
            url_file_attachment2: entry.attachments.slot2,
            url_file_attachment3: entry.attachments.slot3,
            audit_user: entry.actor,
        }
    }
}

/// A base64 encoded file, usually a `data:image/...;base64,` URL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileAttachment {
    pub file_data: String,
}

/// One asset update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAssetItem {
    #[validate(custom(function = "not_blank"))]
    pub entity_cd: String,
    #[validate(custom(function = "not_blank"))]
    pub reg_id: String,
    pub location_map: Option<String>,
    pub status_review: Option<String>,
    pub notes: Option<String>,
    /// Audit flag, `Y` or `N`.
    #[validate(custom(function = "audit_flag"))]
    pub audit_status: Option<String>,
    /// Up to three new photos.
    #[serde(default)]
    #[validate(length(max = 3))]
    pub files: Vec<FileAttachment>,
}

impl UpdateAssetItem {
    pub fn to_key(&self) -> AssetKey {
        AssetKey::new(self.entity_cd.trim(), self.reg_id.trim())
    }
}

/// Result of one reconciled update.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateResultItem {
    pub entity_cd: String,
    pub reg_id: String,
    /// A new history entry was appended.
    pub inserted: bool,
    /// The latest entry's note was rewritten.
    pub patched_note: bool,
    /// The latest entry's audit flag was rewritten.
    pub patched_audit_status: bool,
    /// Public URLs of the files uploaded for this item.
    pub uploaded: Vec<String>,
}

impl UpdateResultItem {
    pub fn new(key: AssetKey, outcome: ReconcileOutcome, uploaded: Vec<String>) -> Self {
        Self {
            entity_cd: key.entity_cd,
            reg_id: key.reg_id,
            inserted: outcome.inserted,
            patched_note: outcome.patched_note,
            patched_audit_status: outcome.patched_audit_status,
            uploaded,
        }
    }
}

/// Response for a batch of asset updates.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateResponse {
    pub results: Vec<UpdateResultItem>,
}

/// Response for marking assets printed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrintResponse {
    /// Number of assets marked printed.
    pub updated: u64,
}

// ============================================================================
// QR DTOs
// ============================================================================

/// A QR code stored for one asset.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GeneratedQrResponse {
    pub entity_cd: String,
    pub reg_id: String,
    pub qr_url_attachment: String,
}

impl From<GeneratedQr> for GeneratedQrResponse {
    fn from(generated: GeneratedQr) -> Self {
        Self {
            entity_cd: generated.key.entity_cd,
            reg_id: generated.key.reg_id,
            qr_url_attachment: generated.url,
        }
    }
}

/// Outcome of a QR generation run.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QrReportResponse {
    pub generated: Vec<GeneratedQrResponse>,
    pub failed: Vec<AssetKeyDto>,
}

impl From<QrReport> for QrReportResponse {
    fn from(report: QrReport) -> Self {
        Self {
            generated: report.generated.into_iter().map(Into::into).collect(),
            failed: report.failed.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================================
// Staff and organisation DTOs
// ============================================================================

/// A member of staff.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StaffResponse {
    pub staff_id: String,
    pub staff_name: String,
    pub email_add: Option<String>,
    pub div_cd: Option<String>,
    pub dept_cd: Option<String>,
}

impl From<Staff> for StaffResponse {
    fn from(staff: Staff) -> Self {
        Self {
            staff_id: staff.staff_id,
            staff_name: staff.name,
            email_add: staff.email,
            div_cd: staff.div_cd,
            dept_cd: staff.dept_cd,
        }
    }
}

/// Assigns an asset to a member of staff.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignStaffRequest {
    #[validate(custom(function = "not_blank"))]
    pub entity_cd: String,
    #[validate(custom(function = "not_blank"))]
    pub reg_id: String,
    #[validate(custom(function = "not_blank"))]
    pub staff_id: String,
    #[validate(custom(function = "not_blank"))]
    pub div_cd: String,
    #[validate(custom(function = "not_blank"))]
    pub dept_cd: String,
}

impl AssignStaffRequest {
    pub fn to_key(&self) -> AssetKey {
        AssetKey::new(self.entity_cd.trim(), self.reg_id.trim())
    }

    pub fn to_assignment(&self) -> StaffAssignment {
        StaffAssignment {
            staff_id: self.staff_id.trim().to_string(),
            div_cd: self.div_cd.trim().to_string(),
            dept_cd: self.dept_cd.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DivisionResponse {
    pub div_cd: String,
    pub descs: String,
}

impl From<Division> for DivisionResponse {
    fn from(division: Division) -> Self {
        Self {
            div_cd: division.div_cd,
            descs: division.descs,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DepartmentResponse {
    pub dept_cd: String,
    pub descs: String,
}

impl From<Department> for DepartmentResponse {
    fn from(department: Department) -> Self {
        Self {
            dept_cd: department.dept_cd,
            descs: department.descs,
        }
    }
}

// ============================================================================
// Health DTOs
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: DatabaseHealth,
    pub uptime_seconds: u64,
}

/// Database health status.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub pool_size: u32,
    pub idle_connections: usize,
}
