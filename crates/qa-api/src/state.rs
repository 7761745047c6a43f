//! Application state shared across handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

use qa_core::db::{
    create_asset_repository, create_history_repository, create_org_repository,
    create_staff_repository, AssetRepository, DbPool, HistoryRepository, OrgRepository,
    StaffRepository,
};
use qa_core::{
    AssetLedger, AttachmentUploader, FileStore, QrService, SvgQrRenderer, DEFAULT_ACTOR,
};

/// Remote folders files are stored under.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Folder for asset photos.
    pub attachment_folder: String,
    /// Folder for QR code images.
    pub qr_folder: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            attachment_folder: "FAAssetUpload/AssetPicture".to_string(),
            qr_folder: "AssetQrCode".to_string(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DbPool>,
    pub assets: Arc<dyn AssetRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub org: Arc<dyn OrgRepository>,
    /// Reconciles asset updates with their history.
    pub ledger: Arc<AssetLedger>,
    /// Stores asset photos.
    pub uploader: Arc<AttachmentUploader>,
    /// Generates and stores QR codes.
    pub qr: Arc<QrService>,
    /// Prometheus metrics handle for rendering metrics.
    pub prometheus_handle: Option<Arc<PrometheusHandle>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(db: DbPool, store: Arc<dyn FileStore>, layout: StorageLayout) -> Self {
        let assets = create_asset_repository(&db);
        let history = create_history_repository(&db);
        let staff = create_staff_repository(&db);
        let org = create_org_repository(&db);

        let ledger = AssetLedger::new(assets.clone(), history.clone(), DEFAULT_ACTOR);
        let uploader = AttachmentUploader::new(store.clone(), layout.attachment_folder.clone());
        let qr = QrService::new(
            assets.clone(),
            Arc::new(SvgQrRenderer),
            store,
            layout.qr_folder.clone(),
        );

        info!(
            db_type = db.db_type(),
            attachment_folder = %layout.attachment_folder,
            qr_folder = %layout.qr_folder,
            "Application state initialized"
        );

        Self {
            db: Arc::new(db),
            assets,
            history,
            staff,
            org,
            ledger: Arc::new(ledger),
            uploader: Arc::new(uploader),
            qr: Arc::new(qr),
            prometheus_handle: None,
        }
    }

    /// Creates a new application state with Prometheus handle.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(Arc::new(handle));
        self
    }
}
