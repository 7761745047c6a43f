//! Serve command - starts the API server.

use anyhow::{Context, Result};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use qa_api::{ApiServer, ApiServerConfig, AppState, StorageLayout};
use qa_core::db::{connect_with_retry, run_migrations, RetryConfig};
use qa_core::LocalFileStore;
use qa_observability::install_prometheus_recorder;

use crate::config::AppConfig;

/// Command-line values that override the loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub database_url: Option<String>,
    pub no_swagger: bool,
    pub storage_root: Option<PathBuf>,
    pub public_url: Option<String>,
}

impl ServeOverrides {
    /// Applies every override that was given.
    pub fn apply(self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if self.no_swagger {
            config.server.swagger = false;
        }
        if let Some(root) = self.storage_root {
            config.storage.root = root;
        }
        if let Some(url) = self.public_url {
            config.storage.public_base_url = url;
        }
    }
}

/// Runs the API server.
pub async fn run_server(config: AppConfig) -> Result<()> {
    println!("{} Starting QR Asset API Server...", "[server]".cyan());

    let display = config.redact_secrets();
    println!("  {} Database: {}", "→".green(), display.database.url);
    let db_pool = connect_with_retry(&config.database.url, RetryConfig::startup())
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    println!("  {} Migrations complete", "✓".green());

    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| {
            format!(
                "Failed to create storage directory: {}",
                config.storage.root.display()
            )
        })?;
    let store = Arc::new(LocalFileStore::new(
        config.storage.root.clone(),
        config.storage.public_base_url.clone(),
    ));

    let layout = StorageLayout {
        attachment_folder: config.storage.attachment_folder.clone(),
        qr_folder: config.storage.qr_folder.clone(),
    };
    let mut state = AppState::new(db_pool, store, layout);
    match install_prometheus_recorder() {
        Ok(handle) => state = state.with_prometheus_handle(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder not installed, /metrics disabled"),
    }

    let bind_address: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    let server_config = ApiServerConfig {
        bind_address,
        enable_swagger: config.server.swagger,
        max_body_bytes: config.server.max_body_mb * 1024 * 1024,
        files_dir: config
            .server
            .serve_files
            .then(|| config.storage.root.clone()),
    };

    println!();
    println!("{}", "QR Asset API Server".bold());
    println!("{}", "═".repeat(40));
    println!("  {} http://{}", "Address:".cyan(), bind_address);
    println!("  {} {}", "Database:".cyan(), display.database.url);
    println!(
        "  {} {} ({})",
        "Files:".cyan(),
        config.storage.root.display(),
        config.storage.public_base_url
    );
    if config.server.swagger {
        println!(
            "  {} http://{}/swagger-ui",
            "Swagger UI:".cyan(),
            bind_address
        );
    }

    println!();
    println!("{}", "Endpoints:".bold());
    println!("  GET  /health                    - Health check");
    println!("  GET  /api/assets/without-qr     - Assets missing a QR code");
    println!("  POST /api/assets/lookup         - Fetch assets by key");
    println!("  POST /api/assets/history        - Asset transaction history");
    println!("  PUT  /api/assets/update         - Update assets and upload photos");
    println!("  PUT  /api/assets/print          - Mark QR labels printed");
    println!("  POST /api/qr/generate-missing   - Generate missing QR codes");
    println!("  POST /api/qr/generate           - Regenerate QR codes");
    println!("  GET  /api/staff                 - List staff");
    println!("  GET  /metrics                   - Prometheus metrics");
    println!();
    println!("Press {} to stop", "Ctrl+C".yellow());
    println!();

    let server = ApiServer::new(state, server_config);
    server.run().await.context("Server error")?;

    println!();
    println!("{} Server stopped", "[server]".cyan());

    Ok(())
}
