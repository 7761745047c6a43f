//! Mock implementation of HistoryRepository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::asset::{AssetHistoryEntry, AssetKey};
use crate::db::{DbError, HistoryRepository, MissingRecord};
use crate::ledger::HistoryPlan;

/// Mock implementation of HistoryRepository using in-memory storage.
///
/// Entries are kept oldest first per key. Writes can be made to fail to
/// exercise rollback paths.
pub struct MockHistoryRepository {
    entries: Arc<RwLock<HashMap<AssetKey, Vec<AssetHistoryEntry>>>>,
    fail_writes: AtomicBool,
}

impl Default for MockHistoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHistoryRepository {
    /// Creates a new mock repository.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Creates a mock repository pre-populated with entries.
    pub fn with_entries(entries: Vec<AssetHistoryEntry>) -> Self {
        let mut map: HashMap<AssetKey, Vec<AssetHistoryEntry>> = HashMap::new();
        for entry in entries {
            map.entry(entry.key.clone()).or_default().push(entry);
        }
        for list in map.values_mut() {
            list.sort_by_key(|e| (e.timestamp, e.id));
        }
        Self {
            entries: Arc::new(RwLock::new(map)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `record` call fail without writing.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the entries for a key, oldest first.
    pub async fn entries_for(&self, key: &AssetKey) -> Vec<AssetHistoryEntry> {
        self.entries
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistoryRepository for MockHistoryRepository {
    async fn latest_for(&self, key: &AssetKey) -> Result<Option<AssetHistoryEntry>, DbError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .and_then(|list| list.iter().max_by_key(|e| (e.timestamp, e.id)))
            .cloned())
    }

    async fn list_for(&self, key: &AssetKey) -> Result<Vec<AssetHistoryEntry>, DbError> {
        let mut list = self.entries_for(key).await;
        list.sort_by_key(|e| std::cmp::Reverse((e.timestamp, e.id)));
        Ok(list)
    }

    async fn record(&self, key: &AssetKey, plan: &HistoryPlan) -> Result<(), DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Transaction("injected write failure".to_string()));
        }

        let mut entries = self.entries.write().await;
        let mut list = entries.get(key).cloned().unwrap_or_default();

        if let Some(entry) = &plan.insert {
            list.push(entry.clone());
        }

        if let Some(patch) = &plan.patch {
            let target = list
                .iter_mut()
                .find(|e| e.id == patch.target)
                .ok_or(DbError::NotFound(MissingRecord::HistoryEntry(patch.target)))?;
            if let Some(note) = &patch.note {
                target.note = Some(note.clone());
            }
            if let Some(audit_status) = &patch.audit_status {
                target.audit_status = Some(audit_status.clone());
            }
        }

        entries.insert(key.clone(), list);
        Ok(())
    }
}
