//! Configuration loading for the qrasset CLI.

use anyhow::{Context, Result};
use qa_observability::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where uploaded photos and QR codes are written.
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Returns a copy with the database password hidden.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        config.database.url = redact_url_password(&config.database.url);
        config
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Serve Swagger UI at `/swagger-ui`.
    #[serde(default = "default_true")]
    pub swagger: bool,

    /// Largest accepted request body in megabytes.
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,

    /// Serve the storage root under `/files`.
    #[serde(default = "default_true")]
    pub serve_files: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_max_body_mb() -> usize {
    25
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            swagger: true,
            max_body_mb: default_max_body_mb(),
            serve_files: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL (`sqlite:` or `postgres://`).
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "sqlite://qrasset.db?mode=rwc".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// File storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Local directory files are written under.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,

    /// URL prefix the stored files are reachable at.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_attachment_folder")]
    pub attachment_folder: String,

    #[serde(default = "default_qr_folder")]
    pub qr_folder: String,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("files")
}

fn default_public_base_url() -> String {
    "http://localhost:8080/files".to_string()
}

fn default_attachment_folder() -> String {
    "FAAssetUpload/AssetPicture".to_string()
}

fn default_qr_folder() -> String {
    "AssetQrCode".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            attachment_folder: default_attachment_folder(),
            qr_folder: default_qr_folder(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

fn redact_url_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.split_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{}://{}:***REDACTED***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.server.swagger);
        assert_eq!(config.storage.attachment_folder, "FAAssetUpload/AssetPicture");
        assert_eq!(config.storage.qr_folder, "AssetQrCode");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9090\nstorage:\n  public_base_url: https://cdn.example.com/assets\nlogging:\n  level: debug\n  format: json"
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.public_base_url, "https://cdn.example.com/assets");
        assert_eq!(config.storage.qr_folder, "AssetQrCode");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.database.url, "sqlite://qrasset.db?mode=rwc");
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(AppConfig::load(Path::new("/nonexistent/qrasset.yaml")).is_err());
    }

    #[test]
    fn test_redact_database_password() {
        let mut config = AppConfig::default();
        config.database.url = "postgres://assets:hunter2@db:5432/assets".to_string();

        let redacted = config.redact_secrets();
        assert_eq!(
            redacted.database.url,
            "postgres://assets:***REDACTED***@db:5432/assets"
        );
        assert_eq!(
            redact_url_password("sqlite://qrasset.db"),
            "sqlite://qrasset.db"
        );
    }
}
