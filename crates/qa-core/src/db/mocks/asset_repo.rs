//! Mock implementation of AssetRepository for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::asset::{AssetFieldUpdate, AssetKey, AssetRecord, StaffAssignment};
use crate::db::{AssetRepository, DbError};

/// Mock implementation of AssetRepository using in-memory storage.
pub struct MockAssetRepository {
    assets: Arc<RwLock<HashMap<AssetKey, AssetRecord>>>,
    fail_updates: AtomicBool,
}

impl Default for MockAssetRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssetRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self {
            assets: Arc::new(RwLock::new(HashMap::new())),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Creates a mock repository pre-populated with assets.
    pub fn with_assets(assets: Vec<AssetRecord>) -> Self {
        let map: HashMap<AssetKey, AssetRecord> =
            assets.into_iter().map(|a| (a.key.clone(), a)).collect();
        Self {
            assets: Arc::new(RwLock::new(map)),
            fail_updates: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `apply_update` call fail without writing.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Gets a snapshot of all assets in the mock, ordered by key.
    pub async fn snapshot(&self) -> Vec<AssetRecord> {
        let mut assets: Vec<AssetRecord> = self.assets.read().await.values().cloned().collect();
        assets.sort_by(|a, b| {
            (&a.key.entity_cd, &a.key.reg_id).cmp(&(&b.key.entity_cd, &b.key.reg_id))
        });
        assets
    }
}

#[async_trait]
impl AssetRepository for MockAssetRepository {
    async fn get(&self, key: &AssetKey) -> Result<Option<AssetRecord>, DbError> {
        Ok(self.assets.read().await.get(key).cloned())
    }

    async fn get_many(&self, keys: &[AssetKey]) -> Result<Vec<AssetRecord>, DbError> {
        let assets = self.assets.read().await;
        Ok(keys.iter().filter_map(|k| assets.get(k).cloned()).collect())
    }

    async fn list_without_qr(&self) -> Result<Vec<AssetRecord>, DbError> {
        Ok(self
            .snapshot()
            .await
            .into_iter()
            .filter(|a| !a.has_qr())
            .collect())
    }

    async fn list_with_qr(&self) -> Result<Vec<AssetRecord>, DbError> {
        Ok(self
            .snapshot()
            .await
            .into_iter()
            .filter(|a| a.has_qr())
            .collect())
    }

    async fn apply_update(
        &self,
        key: &AssetKey,
        update: &AssetFieldUpdate,
    ) -> Result<bool, DbError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DbError::Transaction("injected update failure".to_string()));
        }
        let mut assets = self.assets.write().await;
        let Some(record) = assets.get_mut(key) else {
            return Ok(false);
        };
        record.location_map = update.location_map.clone();
        record.status_review = update.status_review.clone();
        record.attachments = update.attachments.clone();
        record.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn set_qr_urls(&self, urls: &[(AssetKey, String)]) -> Result<u64, DbError> {
        let mut assets = self.assets.write().await;
        let mut updated = 0;
        for (key, url) in urls {
            if let Some(record) = assets.get_mut(key) {
                record.qr_url = Some(url.clone());
                record.updated_at = Some(Utc::now());
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn mark_printed(&self, keys: &[AssetKey]) -> Result<u64, DbError> {
        let mut assets = self.assets.write().await;
        let mut updated = 0;
        for key in keys {
            if let Some(record) = assets.get_mut(key) {
                record.printed = true;
                record.updated_at = Some(Utc::now());
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn assign_staff(
        &self,
        key: &AssetKey,
        assignment: &StaffAssignment,
    ) -> Result<bool, DbError> {
        let mut assets = self.assets.write().await;
        let Some(record) = assets.get_mut(key) else {
            return Ok(false);
        };
        record.staff_id = Some(assignment.staff_id.clone());
        record.div_cd = Some(assignment.div_cd.clone());
        record.dept_cd = Some(assignment.dept_cd.clone());
        record.updated_at = Some(Utc::now());
        Ok(true)
    }

    async fn upsert(&self, record: &AssetRecord) -> Result<(), DbError> {
        self.assets
            .write()
            .await
            .insert(record.key.clone(), record.clone());
        Ok(())
    }
}
