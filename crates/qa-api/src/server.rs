//! API server implementation.

use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::dto::*;
use crate::error::ErrorResponse;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::routes;
use crate::state::AppState;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,
    /// Enable Swagger UI.
    pub enable_swagger: bool,
    /// Largest accepted request body; photos arrive base64 encoded in JSON.
    pub max_body_bytes: usize,
    /// Local file store root to serve under `/files`, if any.
    pub files_dir: Option<PathBuf>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_swagger: true,
            max_body_bytes: 25 * 1024 * 1024,
            files_dir: None,
        }
    }
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
        crate::routes::metrics::prometheus_metrics,
        crate::routes::assets::list_without_qr,
        crate::routes::assets::list_with_qr,
        crate::routes::assets::lookup_assets,
        crate::routes::assets::asset_history,
        crate::routes::assets::mark_printed,
        crate::routes::assets::update_assets,
        crate::routes::qr::generate_missing,
        crate::routes::qr::generate_for_keys,
        crate::routes::staff::list_staff,
        crate::routes::staff::get_staff,
        crate::routes::staff::get_staff_by_email,
        crate::routes::staff::assign_staff,
        crate::routes::org::list_divisions,
        crate::routes::org::list_departments,
    ),
    components(
        schemas(
            HealthResponse,
            DatabaseHealth,
            AssetKeyDto,
            AssetResponse,
            HistoryEntryResponse,
            FileAttachment,
            UpdateAssetItem,
            UpdateResultItem,
            UpdateResponse,
            PrintResponse,
            GeneratedQrResponse,
            QrReportResponse,
            StaffResponse,
            AssignStaffRequest,
            DivisionResponse,
            DepartmentResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Assets", description = "Asset register and history"),
        (name = "QR", description = "QR code generation"),
        (name = "Staff", description = "Staff lookup and assignment"),
        (name = "Organisation", description = "Divisions and departments"),
        (name = "Metrics", description = "System metrics"),
    ),
    info(
        title = "QR Asset API",
        version = "0.1.0",
        description = "Fixed asset register with QR labels, photos and an audit trail",
        license(name = "MIT"),
    )
)]
pub struct ApiDoc;

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(state: AppState, config: ApiServerConfig) -> Self {
        Self { config, state }
    }

    /// Creates a new API server with default configuration.
    pub fn with_state(state: AppState) -> Self {
        Self::new(state, ApiServerConfig::default())
    }

    /// Builds the router.
    pub fn router(&self) -> Router {
        routes::health::init_start_time();

        let mut app = routes::create_router(self.state.clone());

        if self.config.enable_swagger {
            app = app.merge(
                SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
            );
        }

        if let Some(dir) = &self.config.files_dir {
            app = app.nest_service("/files", ServeDir::new(dir));
        }

        // Innermost first.
        app.layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(middleware::from_fn(security_headers))
            .layer(middleware::from_fn(request_logging))
            .layer(middleware::from_fn(request_id))
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer())
            .layer(CatchPanicLayer::new())
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    pub async fn run(self) -> Result<(), std::io::Error> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the server with a custom shutdown signal.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let addr = self.config.bind_address;

        info!("Starting API server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Default shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
