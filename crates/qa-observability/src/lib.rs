//! # qa-observability
//!
//! Logging and metrics infrastructure for the QR asset service.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, init_logging_with_config, LogFormat, LoggingConfig};
pub use metrics::{describe_metrics, install_prometheus_recorder, record_db_pool};
