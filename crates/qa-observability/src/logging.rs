//! Logging infrastructure for the QR asset service.
//!
//! This module provides structured logging using the tracing ecosystem.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events pass the default filter.
const CRATES: &[&str] = &["qa_core", "qa_api", "qa_observability", "qrasset"];

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Whether to include span events.
    pub include_spans: bool,
    /// Whether to include file/line info.
    pub include_location: bool,
    /// Whether to include thread IDs.
    pub include_thread_ids: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            include_spans: false,
            include_location: true,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Creates a development configuration with more verbose output.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Text,
            include_spans: true,
            include_location: true,
            include_thread_ids: true,
            include_target: true,
        }
    }

    /// Creates a production configuration with JSON output.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            include_spans: false,
            include_location: false,
            include_thread_ids: false,
            include_target: true,
        }
    }

    /// Sets the level from a name such as `"debug"`, keeping the current
    /// level if the name is not recognised.
    pub fn with_level_name(mut self, name: &str) -> Self {
        if let Ok(level) = Level::from_str(name) {
            self.level = level;
        }
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        let level = self.level.to_string().to_lowercase();
        CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .chain(std::iter::once(format!("tower_http={}", level)))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initializes the logging system with default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes the logging system with the given configuration.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let span_events = if config.include_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_thread_ids(config.include_thread_ids)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Text => {
            let fmt_layer = fmt::layer()
                .with_span_events(span_events)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_thread_ids(config.include_thread_ids)
                .with_target(config.include_target);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();
        }
    }
}

/// Creates a span for work on a single asset.
#[macro_export]
macro_rules! asset_span {
    ($key:expr) => {
        tracing::info_span!("asset", asset = %$key)
    };
    ($key:expr, $($field:tt)*) => {
        tracing::info_span!("asset", asset = %$key, $($field)*)
    };
}
