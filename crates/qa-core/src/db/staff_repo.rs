//! Staff directory repository (read-only).

use super::{DbError, DbPool};
use crate::asset::Staff;
use async_trait::async_trait;
use std::sync::Arc;

/// Repository trait for staff lookups.
#[async_trait]
pub trait StaffRepository: Send + Sync {
    /// Lists all staff ordered by name.
    async fn list(&self) -> Result<Vec<Staff>, DbError>;

    /// Gets a staff member by id.
    async fn get(&self, staff_id: &str) -> Result<Option<Staff>, DbError>;

    /// Gets a staff member by email, ignoring case.
    async fn get_by_email(&self, email: &str) -> Result<Option<Staff>, DbError>;
}

/// SQLite implementation of StaffRepository.
pub struct SqliteStaffRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteStaffRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffRepository for SqliteStaffRepository {
    async fn list(&self) -> Result<Vec<Staff>, DbError> {
        let rows: Vec<StaffRow> = sqlx::query_as(
            "SELECT staff_id, staff_name, email_add, div_cd, dept_cd FROM staff ORDER BY staff_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, staff_id: &str) -> Result<Option<Staff>, DbError> {
        let row: Option<StaffRow> = sqlx::query_as(
            "SELECT staff_id, staff_name, email_add, div_cd, dept_cd FROM staff WHERE staff_id = ?",
        )
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Staff>, DbError> {
        let row: Option<StaffRow> = sqlx::query_as(
            "SELECT staff_id, staff_name, email_add, div_cd, dept_cd FROM staff \
             WHERE LOWER(email_add) = LOWER(?) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

/// PostgreSQL implementation of StaffRepository.
pub struct PgStaffRepository {
    pool: sqlx::PgPool,
}

impl PgStaffRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffRepository for PgStaffRepository {
    async fn list(&self) -> Result<Vec<Staff>, DbError> {
        let rows: Vec<StaffRow> = sqlx::query_as(
            "SELECT staff_id, staff_name, email_add, div_cd, dept_cd FROM staff ORDER BY staff_name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, staff_id: &str) -> Result<Option<Staff>, DbError> {
        let row: Option<StaffRow> = sqlx::query_as(
            "SELECT staff_id, staff_name, email_add, div_cd, dept_cd FROM staff WHERE staff_id = $1",
        )
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Staff>, DbError> {
        let row: Option<StaffRow> = sqlx::query_as(
            "SELECT staff_id, staff_name, email_add, div_cd, dept_cd FROM staff \
             WHERE LOWER(email_add) = LOWER($1) LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

/// Factory function to create the appropriate repository based on pool type.
pub fn create_staff_repository(pool: &DbPool) -> Arc<dyn StaffRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteStaffRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgStaffRepository::new(pool.clone())),
    }
}

#[derive(sqlx::FromRow)]
struct StaffRow {
    staff_id: String,
    staff_name: String,
    email_add: Option<String>,
    div_cd: Option<String>,
    dept_cd: Option<String>,
}

impl From<StaffRow> for Staff {
    fn from(row: StaffRow) -> Self {
        Staff {
            staff_id: row.staff_id,
            name: row.staff_name,
            email: row.email_add,
            div_cd: row.div_cd,
            dept_cd: row.dept_cd,
        }
    }
}
