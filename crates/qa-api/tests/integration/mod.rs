//! Integration test modules.

pub mod asset_tests;
pub mod common;
pub mod health_tests;
pub mod qr_tests;
pub mod staff_tests;
