//! Attachment upload.
//!
//! Decodes base64 data URLs sent by clients and stores them through a
//! [`FileStore`], returning the public URL of every stored file.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::asset::AssetKey;

/// Extension used when a data URL does not name its media type.
pub const DEFAULT_EXTENSION: &str = "png";

/// Errors that can occur while uploading a file.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The payload is not a usable base64 data URL.
    #[error("Invalid file data: {0}")]
    InvalidData(String),

    /// A folder or file name would escape the storage root.
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    /// Writing to the backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// A decoded file ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub extension: String,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:<mime>;base64,<payload>` string.
///
/// A bare base64 payload is accepted as well and treated as PNG.
/// Whitespace inside the payload is ignored.
pub fn decode_data_url(data: &str) -> Result<DecodedFile, UploadError> {
    let data = data.trim();
    let (extension, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| UploadError::InvalidData("missing ',' in data URL".to_string()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| UploadError::InvalidData("data URL is not base64".to_string()))?;
            let extension = mime
                .split_once('/')
                .map(|(_, subtype)| subtype)
                .filter(|subtype| {
                    !subtype.is_empty() && subtype.chars().all(|c| c.is_ascii_alphanumeric())
                })
                .unwrap_or(DEFAULT_EXTENSION);
            (extension.to_ascii_lowercase(), payload)
        }
        None => (DEFAULT_EXTENSION.to_string(), data),
    };

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(UploadError::InvalidData("empty payload".to_string()));
    }
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| UploadError::InvalidData(format!("invalid base64: {}", e)))?;

    Ok(DecodedFile { extension, bytes })
}

/// Replaces path separators so a registration id can be used in a file name.
pub fn sanitize_reg_id(reg_id: &str) -> String {
    reg_id.replace(&['/', '\\'][..], "_")
}

/// Builds the stored file name of the `index`-th attachment of an upload.
///
/// `batch` is unique per upload, so two uploads for one asset within the
/// same second never share a name.
pub fn attachment_file_name(
    key: &AssetKey,
    at: DateTime<Utc>,
    batch: &str,
    index: usize,
    extension: &str,
) -> String {
    format!(
        "Asset_{}_{}_{}_{}_{}.{}",
        key.entity_cd,
        sanitize_reg_id(&key.reg_id),
        at.format("%Y_%m_%dT%H_%M_%S"),
        batch,
        index,
        extension
    )
}

fn batch_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(8);
    token
}

/// Remote storage for uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` as `folder/file_name` and returns its public URL.
    async fn put(&self, folder: &str, file_name: &str, bytes: &[u8])
        -> Result<String, UploadError>;

    /// Removes `folder/file_name`. A file that is already gone is not an error.
    async fn delete(&self, folder: &str, file_name: &str) -> Result<(), UploadError>;
}

/// File store backed by a local directory served under a public base URL.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, folder: &str, file_name: &str) -> Result<PathBuf, UploadError> {
        let relative = Path::new(folder.trim_matches('/')).join(file_name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || file_name.contains(&['/', '\\'][..]) {
            return Err(UploadError::InvalidPath(relative.display().to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(
        &self,
        folder: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let path = self.resolve(folder, file_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "File stored");

        Ok(format!(
            "{}/{}/{}",
            self.public_base_url,
            folder.trim_matches('/'),
            file_name
        ))
    }

    async fn delete(&self, folder: &str, file_name: &str) -> Result<(), UploadError> {
        let path = self.resolve(folder, file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "File removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Uploads the attachments of one asset update.
pub struct AttachmentUploader {
    store: Arc<dyn FileStore>,
    folder: String,
}

impl AttachmentUploader {
    pub fn new(store: Arc<dyn FileStore>, folder: impl Into<String>) -> Self {
        Self {
            store,
            folder: folder.into(),
        }
    }

    /// Decodes and stores every data URL, returning URLs in input order.
    ///
    /// Everything is decoded before the first file is written, so a bad
    /// payload never leaves a partial upload behind.
    pub async fn upload_all(
        &self,
        key: &AssetKey,
        files: &[String],
        at: DateTime<Utc>,
    ) -> Result<Vec<String>, UploadError> {
        let decoded = files
            .iter()
            .map(|data| decode_data_url(data))
            .collect::<Result<Vec<_>, _>>()?;

        let batch = batch_token();
        let mut urls = Vec::with_capacity(decoded.len());
        for (index, file) in decoded.iter().enumerate() {
            let name = attachment_file_name(key, at, &batch, index, &file.extension);
            let url = self.store.put(&self.folder, &name, &file.bytes).await?;
            metrics::counter!("attachment_uploaded_total").increment(1);
            urls.push(url);
        }

        if !urls.is_empty() {
            info!(asset = %key, count = urls.len(), "Attachments uploaded");
        }
        Ok(urls)
    }

    /// Removes files stored by an earlier [`upload_all`](Self::upload_all).
    ///
    /// Used when the update they belong to is not recorded. Failures are
    /// logged and skipped.
    pub async fn discard(&self, urls: &[String]) {
        for url in urls {
            let Some(name) = url.rsplit('/').next().filter(|n| !n.is_empty()) else {
                continue;
            };
            match self.store.delete(&self.folder, name).await {
                Ok(()) => metrics::counter!("attachment_discarded_total").increment(1),
                Err(e) => warn!(url = %url, error = %e, "Failed to discard attachment"),
            }
        }
    }
}
