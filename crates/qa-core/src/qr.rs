//! QR code generation for assets.

use qrcode::render::svg;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::asset::AssetKey;
use crate::db::{AssetRepository, DbError};
use crate::upload::{FileStore, UploadError};

/// Minimum rendered width and height in pixels.
const QR_MIN_DIMENSION: u32 = 200;

/// Errors that can occur during QR generation.
#[derive(Error, Debug)]
pub enum QrError {
    /// The payload could not be encoded.
    #[error("QR encoding failed: {0}")]
    Encode(String),

    /// Storing the rendered file failed.
    #[error("QR upload failed: {0}")]
    Upload(#[from] UploadError),

    /// Reading assets or saving URLs failed.
    #[error("QR storage failed: {0}")]
    Storage(#[from] DbError),

    /// No asset matched the request.
    #[error("No asset found for QR code generation")]
    NothingToGenerate,
}

impl From<qrcode::types::QrError> for QrError {
    fn from(err: qrcode::types::QrError) -> Self {
        QrError::Encode(err.to_string())
    }
}

/// Renders a payload string to an SVG document.
pub trait QrRenderer: Send + Sync {
    fn render_svg(&self, payload: &str) -> Result<String, QrError>;
}

/// [`QrRenderer`] backed by the `qrcode` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgQrRenderer;

impl QrRenderer for SvgQrRenderer {
    fn render_svg(&self, payload: &str) -> Result<String, QrError> {
        let code = QrCode::new(payload.as_bytes())?;
        Ok(code
            .render::<svg::Color>()
            .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
            .build())
    }
}

#[derive(Serialize)]
struct QrPayloadItem<'a> {
    entity_cd: &'a str,
    reg_id: &'a str,
}

/// Builds the JSON payload encoded into an asset's QR code.
pub fn qr_payload(key: &AssetKey) -> Result<String, QrError> {
    let item = QrPayloadItem {
        entity_cd: key.entity_cd.trim(),
        reg_id: key.reg_id.trim(),
    };
    serde_json::to_string(&[item]).map_err(|e| QrError::Encode(e.to_string()))
}

/// File name of an asset's QR code image.
pub fn qr_file_name(key: &AssetKey) -> String {
    format!("{}_{}.svg", key.entity_cd, key.reg_id.replace('/', "_"))
}

/// A QR code that was rendered, stored and linked to its asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQr {
    pub key: AssetKey,
    pub url: String,
}

/// Result of a QR generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrReport {
    pub generated: Vec<GeneratedQr>,
    /// Assets whose QR code could not be rendered or stored.
    pub failed: Vec<AssetKey>,
}

/// Renders QR codes, stores them and records their URLs on the assets.
pub struct QrService {
    assets: Arc<dyn AssetRepository>,
    renderer: Arc<dyn QrRenderer>,
    store: Arc<dyn FileStore>,
    folder: String,
}

impl QrService {
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        renderer: Arc<dyn QrRenderer>,
        store: Arc<dyn FileStore>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            assets,
            renderer,
            store,
            folder: folder.into(),
        }
    }

    /// Generates QR codes for every asset that has none.
    ///
    /// Stops at the first failure; URLs are only saved once every code
    /// has been stored.
    pub async fn generate_missing(&self) -> Result<QrReport, QrError> {
        let pending = self.assets.list_without_qr().await?;
        if pending.is_empty() {
            return Err(QrError::NothingToGenerate);
        }

        let mut generated = Vec::with_capacity(pending.len());
        for record in &pending {
            let url = self.render_and_store(&record.key).await?;
            generated.push(GeneratedQr {
                key: record.key.clone(),
                url,
            });
        }

        self.save(&generated).await?;
        Ok(QrReport {
            generated,
            failed: Vec::new(),
        })
    }

    /// Generates QR codes for the given assets, replacing existing ones.
    ///
    /// Keys without an asset are ignored. Per-asset failures are logged
    /// and reported without aborting the rest.
    pub async fn generate_for(&self, keys: &[AssetKey]) -> Result<QrReport, QrError> {
        let records = self.assets.get_many(keys).await?;
        if records.is_empty() {
            return Err(QrError::NothingToGenerate);
        }

        let mut report = QrReport::default();
        for record in &records {
            match self.render_and_store(&record.key).await {
                Ok(url) => report.generated.push(GeneratedQr {
                    key: record.key.clone(),
                    url,
                }),
                Err(e) => {
                    warn!(asset = %record.key, error = %e, "QR generation failed, skipping");
                    report.failed.push(record.key.clone());
                }
            }
        }

        if report.generated.is_empty() {
            warn!("No QR codes generated");
        } else {
            self.save(&report.generated).await?;
        }
        Ok(report)
    }

    async fn render_and_store(&self, key: &AssetKey) -> Result<String, QrError> {
        let svg = self.renderer.render_svg(&qr_payload(key)?)?;
        let url = self
            .store
            .put(&self.folder, &qr_file_name(key), svg.as_bytes())
            .await?;
        metrics::counter!("qr_generated_total").increment(1);
        Ok(url)
    }

    async fn save(&self, generated: &[GeneratedQr]) -> Result<(), QrError> {
        let urls: Vec<(AssetKey, String)> = generated
            .iter()
            .map(|g| (g.key.clone(), g.url.clone()))
            .collect();
        let updated = self.assets.set_qr_urls(&urls).await?;
        info!(count = updated, "QR code URLs saved");
        Ok(())
    }
}
