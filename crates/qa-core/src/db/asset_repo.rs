//! Asset register repository for database operations.

use super::{DbError, DbPool};
use crate::asset::{AssetFieldUpdate, AssetKey, AssetRecord, AttachmentSlotSet, StaffAssignment};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;

const ASSET_COLUMNS: &str = "entity_cd, reg_id, descs, location_map, status_review, \
     url_file_attachment, url_file_attachment2, url_file_attachment3, \
     qr_url_attachment, is_printed, staff_id, div_cd, dept_cd, updated_at";

/// Repository trait for the asset register.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Gets an asset by key.
    async fn get(&self, key: &AssetKey) -> Result<Option<AssetRecord>, DbError>;

    /// Gets every asset matching one of `keys`, in request order. Keys
    /// without a matching asset are skipped.
    async fn get_many(&self, keys: &[AssetKey]) -> Result<Vec<AssetRecord>, DbError>;

    /// Lists assets that have no QR code URL yet.
    async fn list_without_qr(&self) -> Result<Vec<AssetRecord>, DbError>;

    /// Lists assets that already have a QR code URL.
    async fn list_with_qr(&self) -> Result<Vec<AssetRecord>, DbError>;

    /// Writes reconciled location, status and attachment slots.
    ///
    /// Returns false if the asset does not exist.
    async fn apply_update(&self, key: &AssetKey, update: &AssetFieldUpdate)
        -> Result<bool, DbError>;

    /// Stores QR code URLs for several assets in a single transaction.
    ///
    /// Returns the number of assets updated.
    async fn set_qr_urls(&self, urls: &[(AssetKey, String)]) -> Result<u64, DbError>;

    /// Marks several assets as printed in a single transaction.
    ///
    /// Returns the number of assets updated.
    async fn mark_printed(&self, keys: &[AssetKey]) -> Result<u64, DbError>;

    /// Assigns staff, division and department to an asset.
    ///
    /// Returns false if the asset does not exist.
    async fn assign_staff(
        &self,
        key: &AssetKey,
        assignment: &StaffAssignment,
    ) -> Result<bool, DbError>;

    /// Inserts or replaces an asset record.
    ///
    /// Assets are registered by the upstream fixed-asset system; this is the
    /// import and seeding path, not part of the update flow.
    async fn upsert(&self, record: &AssetRecord) -> Result<(), DbError>;
}

/// SQLite implementation of AssetRepository.
pub struct SqliteAssetRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteAssetRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl AssetRepository for SqliteAssetRepository {
    async fn get(&self, key: &AssetKey) -> Result<Option<AssetRecord>, DbError> {
        let row: Option<SqliteAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets WHERE entity_cd = ? AND reg_id = ?",
            ASSET_COLUMNS
        ))
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn get_many(&self, keys: &[AssetKey]) -> Result<Vec<AssetRecord>, DbError> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.get(key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn list_without_qr(&self) -> Result<Vec<AssetRecord>, DbError> {
        let rows: Vec<SqliteAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets \
             WHERE qr_url_attachment IS NULL OR qr_url_attachment = '' \
             ORDER BY entity_cd, reg_id",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn list_with_qr(&self) -> Result<Vec<AssetRecord>, DbError> {
        let rows: Vec<SqliteAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets \
             WHERE qr_url_attachment IS NOT NULL AND qr_url_attachment <> '' \
             ORDER BY entity_cd, reg_id",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn apply_update(
        &self,
        key: &AssetKey,
        update: &AssetFieldUpdate,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET location_map = ?, status_review = ?,
                url_file_attachment = ?, url_file_attachment2 = ?, url_file_attachment3 = ?,
                updated_at = ?
            WHERE entity_cd = ? AND reg_id = ?
            "#,
        )
        .bind(&update.location_map)
        .bind(&update.status_review)
        .bind(&update.attachments.slot1)
        .bind(&update.attachments.slot2)
        .bind(&update.attachments.slot3)
        .bind(now_text())
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_qr_urls(&self, urls: &[(AssetKey, String)]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let updated_at = now_text();
        let mut updated = 0;

        for (key, url) in urls {
            let result = sqlx::query(
                "UPDATE assets SET qr_url_attachment = ?, updated_at = ? \
                 WHERE entity_cd = ? AND reg_id = ?",
            )
            .bind(url)
            .bind(&updated_at)
            .bind(&key.entity_cd)
            .bind(&key.reg_id)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn mark_printed(&self, keys: &[AssetKey]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let updated_at = now_text();
        let mut updated = 0;

        for key in keys {
            let result = sqlx::query(
                "UPDATE assets SET is_printed = 1, updated_at = ? \
                 WHERE entity_cd = ? AND reg_id = ?",
            )
            .bind(&updated_at)
            .bind(&key.entity_cd)
            .bind(&key.reg_id)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn assign_staff(
        &self,
        key: &AssetKey,
        assignment: &StaffAssignment,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE assets SET staff_id = ?, div_cd = ?, dept_cd = ?, updated_at = ? \
             WHERE entity_cd = ? AND reg_id = ?",
        )
        .bind(&assignment.staff_id)
        .bind(&assignment.div_cd)
        .bind(&assignment.dept_cd)
        .bind(now_text())
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert(&self, record: &AssetRecord) -> Result<(), DbError> {
        let updated_at = record
            .updated_at
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true));

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO assets (
                entity_cd, reg_id, descs, location_map, status_review,
                url_file_attachment, url_file_attachment2, url_file_attachment3,
                qr_url_attachment, is_printed, staff_id, div_cd, dept_cd, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.key.entity_cd)
        .bind(&record.key.reg_id)
        .bind(&record.description)
        .bind(&record.location_map)
        .bind(&record.status_review)
        .bind(&record.attachments.slot1)
        .bind(&record.attachments.slot2)
        .bind(&record.attachments.slot3)
        .bind(&record.qr_url)
        .bind(record.printed)
        .bind(&record.staff_id)
        .bind(&record.div_cd)
        .bind(&record.dept_cd)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL implementation of AssetRepository.
pub struct PgAssetRepository {
    pool: sqlx::PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetRepository for PgAssetRepository {
    async fn get(&self, key: &AssetKey) -> Result<Option<AssetRecord>, DbError> {
        let row: Option<PgAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets WHERE entity_cd = $1 AND reg_id = $2",
            ASSET_COLUMNS
        ))
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_many(&self, keys: &[AssetKey]) -> Result<Vec<AssetRecord>, DbError> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.get(key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn list_without_qr(&self) -> Result<Vec<AssetRecord>, DbError> {
        let rows: Vec<PgAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets \
             WHERE qr_url_attachment IS NULL OR qr_url_attachment = '' \
             ORDER BY entity_cd, reg_id",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_with_qr(&self) -> Result<Vec<AssetRecord>, DbError> {
        let rows: Vec<PgAssetRow> = sqlx::query_as(&format!(
            "SELECT {} FROM assets \
             WHERE qr_url_attachment IS NOT NULL AND qr_url_attachment <> '' \
             ORDER BY entity_cd, reg_id",
            ASSET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_update(
        &self,
        key: &AssetKey,
        update: &AssetFieldUpdate,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET location_map = $1, status_review = $2,
                url_file_attachment = $3, url_file_attachment2 = $4, url_file_attachment3 = $5,
                updated_at = $6
            WHERE entity_cd = $7 AND reg_id = $8
            "#,
        )
        .bind(&update.location_map)
        .bind(&update.status_review)
        .bind(&update.attachments.slot1)
        .bind(&update.attachments.slot2)
        .bind(&update.attachments.slot3)
        .bind(Utc::now())
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_qr_urls(&self, urls: &[(AssetKey, String)]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let updated_at = Utc::now();
        let mut updated = 0;

        for (key, url) in urls {
            let result = sqlx::query(
                "UPDATE assets SET qr_url_attachment = $1, updated_at = $2 \
                 WHERE entity_cd = $3 AND reg_id = $4",
            )
            .bind(url)
            .bind(updated_at)
            .bind(&key.entity_cd)
            .bind(&key.reg_id)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn mark_printed(&self, keys: &[AssetKey]) -> Result<u64, DbError> {
        let mut tx = self.pool.begin().await?;
        let updated_at = Utc::now();
        let mut updated = 0;

        for key in keys {
            let result = sqlx::query(
                "UPDATE assets SET is_printed = TRUE, updated_at = $1 \
                 WHERE entity_cd = $2 AND reg_id = $3",
            )
            .bind(updated_at)
            .bind(&key.entity_cd)
            .bind(&key.reg_id)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn assign_staff(
        &self,
        key: &AssetKey,
        assignment: &StaffAssignment,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE assets SET staff_id = $1, div_cd = $2, dept_cd = $3, updated_at = $4 \
             WHERE entity_cd = $5 AND reg_id = $6",
        )
        .bind(&assignment.staff_id)
        .bind(&assignment.div_cd)
        .bind(&assignment.dept_cd)
        .bind(Utc::now())
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert(&self, record: &AssetRecord) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO assets (
                entity_cd, reg_id, descs, location_map, status_review,
                url_file_attachment, url_file_attachment2, url_file_attachment3,
                qr_url_attachment, is_printed, staff_id, div_cd, dept_cd, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (entity_cd, reg_id) DO UPDATE SET
                descs = EXCLUDED.descs,
                location_map = EXCLUDED.location_map,
                status_review = EXCLUDED.status_review,
                url_file_attachment = EXCLUDED.url_file_attachment,
                url_file_attachment2 = EXCLUDED.url_file_attachment2,
                url_file_attachment3 = EXCLUDED.url_file_attachment3,
                qr_url_attachment = EXCLUDED.qr_url_attachment,
                is_printed = EXCLUDED.is_printed,
                staff_id = EXCLUDED.staff_id,
                div_cd = EXCLUDED.div_cd,
                dept_cd = EXCLUDED.dept_cd,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.key.entity_cd)
        .bind(&record.key.reg_id)
        .bind(&record.description)
        .bind(&record.location_map)
        .bind(&record.status_review)
        .bind(&record.attachments.slot1)
        .bind(&record.attachments.slot2)
        .bind(&record.attachments.slot3)
        .bind(&record.qr_url)
        .bind(record.printed)
        .bind(&record.staff_id)
        .bind(&record.div_cd)
        .bind(&record.dept_cd)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Factory function to create the appropriate repository based on pool type.
pub fn create_asset_repository(pool: &DbPool) -> Arc<dyn AssetRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteAssetRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgAssetRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[derive(sqlx::FromRow)]
struct SqliteAssetRow {
    entity_cd: String,
    reg_id: String,
    descs: Option<String>,
    location_map: Option<String>,
    status_review: Option<String>,
    url_file_attachment: Option<String>,
    url_file_attachment2: Option<String>,
    url_file_attachment3: Option<String>,
    qr_url_attachment: Option<String>,
    is_printed: bool,
    staff_id: Option<String>,
    div_cd: Option<String>,
    dept_cd: Option<String>,
    updated_at: Option<String>,
}

impl TryFrom<SqliteAssetRow> for AssetRecord {
    type Error = DbError;

    fn try_from(row: SqliteAssetRow) -> Result<Self, Self::Error> {
        let updated_at = row
            .updated_at
            .as_deref()
            .map(DateTime::parse_from_rfc3339)
            .transpose()
            .map_err(|e| DbError::invalid_column("updated_at", e))?
            .map(|t| t.with_timezone(&Utc));

        Ok(AssetRecord {
            key: AssetKey::new(row.entity_cd, row.reg_id),
            description: row.descs,
            location_map: row.location_map,
            status_review: row.status_review,
            attachments: AttachmentSlotSet::new(
                row.url_file_attachment,
                row.url_file_attachment2,
                row.url_file_attachment3,
            ),
            qr_url: row.qr_url_attachment,
            printed: row.is_printed,
            staff_id: row.staff_id,
            div_cd: row.div_cd,
            dept_cd: row.dept_cd,
            updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PgAssetRow {
    entity_cd: String,
    reg_id: String,
    descs: Option<String>,
    location_map: Option<String>,
    status_review: Option<String>,
    url_file_attachment: Option<String>,
    url_file_attachment2: Option<String>,
    url_file_attachment3: Option<String>,
    qr_url_attachment: Option<String>,
    is_printed: bool,
    staff_id: Option<String>,
    div_cd: Option<String>,
    dept_cd: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<PgAssetRow> for AssetRecord {
    fn from(row: PgAssetRow) -> Self {
        AssetRecord {
            key: AssetKey::new(row.entity_cd, row.reg_id),
            description: row.descs,
            location_map: row.location_map,
            status_review: row.status_review,
            attachments: AttachmentSlotSet::new(
                row.url_file_attachment,
                row.url_file_attachment2,
                row.url_file_attachment3,
            ),
            qr_url: row.qr_url_attachment,
            printed: row.is_printed,
            staff_id: row.staff_id,
            div_cd: row.div_cd,
            dept_cd: row.dept_cd,
            updated_at: row.updated_at,
        }
    }
}
