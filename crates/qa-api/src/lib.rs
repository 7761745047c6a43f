//! # qa-api
//!
//! REST API server for the QR asset service.
//!
//! This crate exposes the asset register, asset updates with photo upload,
//! QR code generation and staff lookups over HTTP.

pub mod dto;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use server::{ApiServer, ApiServerConfig};
pub use state::{AppState, StorageLayout};
