//! Division and department lookups (read-only).

use super::{DbError, DbPool};
use crate::asset::{Department, Division};
use async_trait::async_trait;
use std::sync::Arc;

/// Repository trait for organisation lookups.
#[async_trait]
pub trait OrgRepository: Send + Sync {
    /// Lists all divisions ordered by code.
    async fn list_divisions(&self) -> Result<Vec<Division>, DbError>;

    /// Lists all departments ordered by code.
    async fn list_departments(&self) -> Result<Vec<Department>, DbError>;
}

/// SQLite implementation of OrgRepository.
pub struct SqliteOrgRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteOrgRepository {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrgRepository for SqliteOrgRepository {
    async fn list_divisions(&self) -> Result<Vec<Division>, DbError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT div_cd, descs FROM divisions ORDER BY div_cd")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(div_cd, descs)| Division { div_cd, descs })
            .collect())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, DbError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT dept_cd, descs FROM departments ORDER BY dept_cd")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(dept_cd, descs)| Department { dept_cd, descs })
            .collect())
    }
}

/// PostgreSQL implementation of OrgRepository.
pub struct PgOrgRepository {
    pool: sqlx::PgPool,
}

impl PgOrgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrgRepository for PgOrgRepository {
    async fn list_divisions(&self) -> Result<Vec<Division>, DbError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT div_cd, descs FROM divisions ORDER BY div_cd")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(div_cd, descs)| Division { div_cd, descs })
            .collect())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, DbError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT dept_cd, descs FROM departments ORDER BY dept_cd")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(dept_cd, descs)| Department { dept_cd, descs })
            .collect())
    }
}

/// Factory function to create the appropriate repository based on pool type.
pub fn create_org_repository(pool: &DbPool) -> Arc<dyn OrgRepository> {
    match pool {
        DbPool::Sqlite(pool) => Arc::new(SqliteOrgRepository::new(pool.clone())),
        DbPool::Postgres(pool) => Arc::new(PgOrgRepository::new(pool.clone())),
    }
}
