//! Database layer for the QR asset service.
//!
//! Persistence for the asset register, its transaction history and the
//! staff/organisation directory, using SQLx with support for both SQLite
//! (development) and PostgreSQL (production).

mod error;
pub mod mocks;
mod pool;
pub mod retry;
mod schema;

pub mod asset_repo;
pub mod history_repo;
pub mod org_repo;
pub mod staff_repo;

pub use error::{DbError, MissingRecord};
pub use pool::{create_pool, create_pool_with_options, DbPool, PoolOptions};
pub use retry::{connect_with_retry, is_transient_error, with_retry, RetryConfig};
pub use schema::run_migrations;

// Re-export repository traits
pub use asset_repo::AssetRepository;
pub use history_repo::HistoryRepository;
pub use org_repo::OrgRepository;
pub use staff_repo::StaffRepository;

// Re-export factory functions
pub use asset_repo::create_asset_repository;
pub use history_repo::create_history_repository;
pub use org_repo::create_org_repository;
pub use staff_repo::create_staff_repository;
