//! Mock implementations of repository traits for testing.
//!
//! These mocks use in-memory storage and do not require a database connection.
//! They back the ledger unit tests and any service that only needs asset and
//! history storage.

mod asset_repo;
mod history_repo;

pub use asset_repo::MockAssetRepository;
pub use history_repo::MockHistoryRepository;
