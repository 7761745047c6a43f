//! Asset transaction history repository.
//!
//! History rows are append-only. The only in-place edit is the note and
//! audit flag of one row, applied together with any insert in a single
//! transaction by [`HistoryRepository::record`].

use super::{DbError, DbPool, MissingRecord};
use crate::asset::{AssetHistoryEntry, AssetKey, AttachmentSlotSet};
use crate::ledger::{HistoryPatch, HistoryPlan};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use uuid::Uuid;

const HISTORY_COLUMNS: &str = "id, entity_cd, reg_id, trx_date, \
     old_location_map, new_location_map, old_status_review, new_status_review, \
     note, audit_status, url_file_attachment, url_file_attachment2, url_file_attachment3, \
     audit_user";

/// Repository trait for asset history persistence.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Gets the most recent entry for an asset.
    ///
    /// Ties on the timestamp are broken by the highest id so exactly one
    /// row is returned.
    async fn latest_for(&self, key: &AssetKey) -> Result<Option<AssetHistoryEntry>, DbError>;

    /// Lists all entries for an asset, newest first.
    async fn list_for(&self, key: &AssetKey) -> Result<Vec<AssetHistoryEntry>, DbError>;

    /// Applies an insert and/or patch atomically.
    async fn record(&self, key: &AssetKey, plan: &HistoryPlan) -> Result<(), DbError>;
}

/// SQLite implementation of HistoryRepository.
pub struct SqliteHistoryRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteHistoryRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl HistoryRepository for SqliteHistoryRepository {
    async fn latest_for(&self, key: &AssetKey) -> Result<Option<AssetHistoryEntry>, DbError> {
        let row: Option<SqliteHistoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM asset_history WHERE entity_cd = ? AND reg_id = ? \
             ORDER BY trx_date DESC, id DESC LIMIT 1",
            HISTORY_COLUMNS
        ))
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn list_for(&self, key: &AssetKey) -> Result<Vec<AssetHistoryEntry>, DbError> {
        let rows: Vec<SqliteHistoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM asset_history WHERE entity_cd = ? AND reg_id = ? \
             ORDER BY trx_date DESC, id DESC",
            HISTORY_COLUMNS
        ))
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn record(&self, key: &AssetKey, plan: &HistoryPlan) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let audit_date = timestamp_text(Utc::now());

        if let Some(entry) = &plan.insert {
            sqlx::query(
                r#"
                INSERT INTO asset_history (
                    id, entity_cd, reg_id, trx_date,
                    old_location_map, new_location_map, old_status_review, new_status_review,
                    note, audit_status,
                    url_file_attachment, url_file_attachment2, url_file_attachment3,
                    audit_user, audit_date
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(entry.id.to_string())
            .bind(&key.entity_cd)
            .bind(&key.reg_id)
            .bind(timestamp_text(entry.timestamp))
            .bind(&entry.old_location)
            .bind(&entry.new_location)
            .bind(&entry.old_status)
            .bind(&entry.new_status)
            .bind(&entry.note)
            .bind(&entry.audit_status)
            .bind(&entry.attachments.slot1)
            .bind(&entry.attachments.slot2)
            .bind(&entry.attachments.slot3)
            .bind(&entry.actor)
            .bind(&audit_date)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(HistoryPatch {
            target,
            note,
            audit_status,
        }) = &plan.patch
        {
            let result = sqlx::query(
                r#"
                UPDATE asset_history
                SET note = COALESCE(?, note),
                    audit_status = COALESCE(?, audit_status),
                    audit_date = ?
                WHERE id = ?
                "#,
            )
            .bind(note)
            .bind(audit_status)
            .bind(&audit_date)
            .bind(target.to_string())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFound(MissingRecord::HistoryEntry(*target)));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// PostgreSQL implementation of HistoryRepository.
pub struct PgHistoryRepository {
    pool: sqlx::PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn latest_for(&self, key: &AssetKey) -> Result<Option<AssetHistoryEntry>, DbError> {
        let row: Option<PgHistoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM asset_history WHERE entity_cd = $1 AND reg_id = $2 \
             ORDER BY trx_date DESC, id DESC LIMIT 1",
            HISTORY_COLUMNS
        ))
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_for(&self, key: &AssetKey) -> Result<Vec<AssetHistoryEntry>, DbError> {
        let rows: Vec<PgHistoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM asset_history WHERE entity_cd = $1 AND reg_id = $2 \
             ORDER BY trx_date DESC, id DESC",
            HISTORY_COLUMNS
        ))
        .bind(&key.entity_cd)
        .bind(&key.reg_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record(&self, key: &AssetKey, plan: &HistoryPlan) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let audit_date = Utc::now();

        if let Some(entry) = &plan.insert {
            sqlx::query(
                r#"
                INSERT INTO asset_history (
                    id, entity_cd, reg_id, trx_date,
                    old_location_map, new_location_map, old_status_review, new_status_review,
                    note, audit_status,
                    url_file_attachment, url_file_attachment2, url_file_attachment3,
                    audit_user, audit_date
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                "#,
            )
            .bind(entry.id)
            .bind(&key.entity_cd)
            .bind(&key.reg_id)
            .bind(entry.timestamp)
            .bind(&entry.old_location)
            .bind(&entry.new_location)
            .bind(&entry.old_status)
            .bind(&entry.new_status)
            .bind(&entry.note)
            .bind(&entry.audit_status)
            .bind(&entry.attachments.slot1)
            .bind(&entry.attachments.slot2)
            .bind(&entry.attachments.slot3)
            .bind(&entry.actor)
            .bind(audit_date)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(patch) = &plan.patch {
            let result = sqlx::query(
                r#"
                UPDATE asset_history
                SET note = COALESCE($1, note),
                    audit_status = COALESCE($2, audit_status),
                    audit_date = $3
                WHERE id = $4
                "#,
            )
            .bind(&patch.note)
            .bind(&patch.audit_status)
            .bind(audit_date)
            .bind(patch.target)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(DbError::NotFound(MissingRecord::HistoryEntry(patch.target)));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Factory function to create the appropriate repository based on pool type.
pub fn create_history_repository(pool: &DbPool) -> Arc<dyn HistoryRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteHistoryRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgHistoryRepository::new(pool.clone())),
    }
}

// Helper structs for SQLx row mapping

#[derive(sqlx::FromRow)]
struct SqliteHistoryRow {
    id: String,
    entity_cd: String,
    reg_id: String,
    trx_date: String,
    old_location_map: Option<String>,
    new_location_map: Option<String>,
    old_status_review: Option<String>,
    new_status_review: Option<String>,
    note: Option<String>,
    audit_status: Option<String>,
    url_file_attachment: Option<String>,
    url_file_attachment2: Option<String>,
    url_file_attachment3: Option<String>,
    audit_user: String,
}

impl TryFrom<SqliteHistoryRow> for AssetHistoryEntry {
    type Error = DbError;

    fn try_from(row: SqliteHistoryRow) -> Result<Self, Self::Error> {
        Ok(AssetHistoryEntry {
            id: Uuid::parse_str(&row.id).map_err(|e| DbError::invalid_column("id", e))?,
            key: AssetKey::new(row.entity_cd, row.reg_id),
            timestamp: DateTime::parse_from_rfc3339(&row.trx_date)
                .map_err(|e| DbError::invalid_column("trx_date", e))?
                .with_timezone(&Utc),
            old_location: row.old_location_map,
            new_location: row.new_location_map,
            old_status: row.old_status_review,
            new_status: row.new_status_review,
            note: row.note,
            audit_status: row.audit_status,
            attachments: AttachmentSlotSet::new(
                row.url_file_attachment,
                row.url_file_attachment2,
                row.url_file_attachment3,
            ),
            actor: row.audit_user,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PgHistoryRow {
    id: Uuid,
    entity_cd: String,
    reg_id: String,
    trx_date: DateTime<Utc>,
    old_location_map: Option<String>,
    new_location_map: Option<String>,
    old_status_review: Option<String>,
    new_status_review: Option<String>,
    note: Option<String>,
    audit_status: Option<String>,
    url_file_attachment: Option<String>,
    url_file_attachment2: Option<String>,
    url_file_attachment3: Option<String>,
    audit_user: String,
}

impl From<PgHistoryRow> for AssetHistoryEntry {
    fn from(row: PgHistoryRow) -> Self {
        AssetHistoryEntry {
            id: row.id,
            key: AssetKey::new(row.entity_cd, row.reg_id),
            timestamp: row.trx_date,
            old_location: row.old_location_map,
            new_location: row.new_location_map,
            old_status: row.old_status_review,
            new_status: row.new_status_review,
            note: row.note,
            audit_status: row.audit_status,
            attachments: AttachmentSlotSet::new(
                row.url_file_attachment,
                row.url_file_attachment2,
                row.url_file_attachment3,
            ),
            actor: row.audit_user,
        }
    }
}
