//! Asset-update reconciliation.
//!
//! [`AssetLedger::reconcile_asset_update`] is the single entry point that
//! turns a partial update into a consistent asset record plus its history:
//!
//! 1. new file URLs are mapped onto the asset's attachment slots,
//! 2. the merged field set is written to the asset record if it differs,
//! 3. the same merged set is handed to the [`AuditTrailWriter`].
//!
//! Reconciliations for the same asset are serialized in-process. Two
//! service instances writing the same asset concurrently can still race
//! between the latest-entry read and the history write.

mod audit_trail;
mod keyed_lock;

pub use audit_trail::{
    plan_history_change, AuditTrailWriter, HistoryPatch, HistoryPlan, ProposedFields,
    ReconcileOutcome,
};
pub use keyed_lock::KeyedLock;

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::asset::{AssetFieldUpdate, AssetKey, ATTACHMENT_SLOTS};
use crate::db::{AssetRepository, DbError, HistoryRepository};
use crate::slots::resolve_attachment_slots;

/// Errors raised while reconciling an asset update.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Reading the asset or its latest history entry failed.
    #[error("Failed to read asset state: {0}")]
    StorageRead(#[source] DbError),

    /// Writing the asset record or its history failed.
    #[error("Failed to write asset state: {0}")]
    StorageWrite(#[source] DbError),

    /// The asset does not exist.
    #[error("Asset not found: {0}")]
    AssetNotFound(AssetKey),

    /// More attachments were supplied than there are slots.
    #[error("Expected at most 3 attachments, got {0}")]
    InvalidSlotCount(usize),
}

/// A partial asset update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposedUpdate {
    pub location: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
    pub audit_status: Option<String>,
    /// Public URLs of files uploaded for this update, in upload order.
    pub new_files: Vec<String>,
}

/// Reconciles asset updates against the register and its history.
pub struct AssetLedger {
    assets: Arc<dyn AssetRepository>,
    trail: AuditTrailWriter,
    locks: KeyedLock<AssetKey>,
}

impl AssetLedger {
    /// Creates a ledger that records history under `actor`.
    pub fn new(
        assets: Arc<dyn AssetRepository>,
        history: Arc<dyn HistoryRepository>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            assets,
            trail: AuditTrailWriter::new(history, actor),
            locks: KeyedLock::new(),
        }
    }

    /// Applies `update` to the asset identified by `key`.
    ///
    /// The asset record is only written when location, status or an
    /// attachment slot actually changes. History is always reconciled, so
    /// a note or audit flag on its own still reaches the latest entry.
    #[instrument(skip(self, update), fields(asset = %key, files = update.new_files.len()))]
    pub async fn reconcile_asset_update(
        &self,
        key: &AssetKey,
        update: ProposedUpdate,
    ) -> Result<ReconcileOutcome, LedgerError> {
        if update.new_files.len() > ATTACHMENT_SLOTS {
            return Err(LedgerError::InvalidSlotCount(update.new_files.len()));
        }

        let _guard = self.locks.lock(key).await;

        let record = self
            .assets
            .get(key)
            .await
            .map_err(LedgerError::StorageRead)?
            .ok_or_else(|| LedgerError::AssetNotFound(key.clone()))?;

        let attachments = resolve_attachment_slots(&update.new_files, &record.attachments);
        let fields = AssetFieldUpdate {
            location_map: update.location.or_else(|| record.location_map.clone()),
            status_review: update.status.or_else(|| record.status_review.clone()),
            attachments,
        };

        if fields.differs_from(&record) {
            let written = self
                .assets
                .apply_update(key, &fields)
                .await
                .map_err(LedgerError::StorageWrite)?;
            if !written {
                return Err(LedgerError::AssetNotFound(key.clone()));
            }
            debug!(asset = %key, "Asset record updated");
        }

        let proposed = ProposedFields {
            location: fields.location_map,
            status: fields.status_review,
            note: update.note,
            audit_status: update.audit_status,
            attachments: Some(fields.attachments),
        };
        let outcome = self.trail.write(key, &proposed).await?;

        metrics::counter!("asset_reconcile_total").increment(1);
        if outcome.inserted {
            metrics::counter!("asset_history_inserted_total").increment(1);
        }
        if outcome.patched_note || outcome.patched_audit_status {
            metrics::counter!("asset_history_patched_total").increment(1);
        }

        info!(
            asset = %key,
            inserted = outcome.inserted,
            patched_note = outcome.patched_note,
            patched_audit_status = outcome.patched_audit_status,
            "Asset update reconciled"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetRecord, AttachmentSlotSet, DEFAULT_NOTE};
    use crate::db::mocks::{MockAssetRepository, MockHistoryRepository};

    fn key() -> AssetKey {
        AssetKey::new("01", "006/EQP2/BTID/VI/12")
    }

    fn url(name: &str) -> String {
        format!("http://files/FAAssetUpload/AssetPicture/{}.png", name)
    }

    fn setup(
        record: AssetRecord,
    ) -> (
        AssetLedger,
        Arc<MockAssetRepository>,
        Arc<MockHistoryRepository>,
    ) {
        let assets = Arc::new(MockAssetRepository::with_assets(vec![record]));
        let history = Arc::new(MockHistoryRepository::new());
        let ledger = AssetLedger::new(assets.clone(), history.clone(), "WEBAPI");
        (ledger, assets, history)
    }

    fn asset() -> AssetRecord {
        let mut record = AssetRecord::new(key());
        record.location_map = Some("-6.2,106.8".to_string());
        record.status_review = Some("R1".to_string());
        record
    }

    #[tokio::test]
    async fn test_first_update_writes_record_and_first_history_entry() {
        let (ledger, assets, history) = setup(asset());

        let outcome = ledger
            .reconcile_asset_update(
                &key(),
                ProposedUpdate {
                    status: Some("R2".to_string()),
                    new_files: vec![url("a")],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(outcome.inserted);
        let record = assets.get(&key()).await.unwrap().unwrap();
        assert_eq!(record.status_review.as_deref(), Some("R2"));
        assert_eq!(record.location_map.as_deref(), Some("-6.2,106.8"));
        assert_eq!(record.attachments.slot2, Some(url("a")));

        let entries = history.entries_for(&key()).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].old_status, None);
        assert_eq!(entries[0].new_status.as_deref(), Some("R2"));
        assert_eq!(entries[0].note.as_deref(), Some(DEFAULT_NOTE));
        assert_eq!(entries[0].actor, "WEBAPI");
    }

    #[tokio::test]
    async fn test_latest_history_matches_record_after_each_update() {
        let (ledger, assets, history) = setup(asset());

        let updates = vec![
            ProposedUpdate {
                location: Some("-6.3,106.9".to_string()),
                ..Default::default()
            },
            ProposedUpdate {
                new_files: vec![url("a"), url("b")],
                ..Default::default()
            },
            ProposedUpdate {
                note: Some("checked".to_string()),
                audit_status: Some("Y".to_string()),
                ..Default::default()
            },
            ProposedUpdate {
                status: Some("R3".to_string()),
                new_files: vec![url("c"), url("d"), url("e")],
                ..Default::default()
            },
        ];

        for update in updates {
            ledger.reconcile_asset_update(&key(), update).await.unwrap();

            let record = assets.get(&key()).await.unwrap().unwrap();
            let latest = history.latest_for(&key()).await.unwrap().unwrap();
            assert_eq!(latest.new_location, record.location_map);
            assert_eq!(latest.new_status, record.status_review);
            assert!(latest.attachments.same_slots(&record.attachments));
        }

        let entries = history.list_for(&key()).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].note.as_deref(), Some("checked"));
        assert_eq!(entries[0].audit_status.as_deref(), Some("Y"));
    }

    #[tokio::test]
    async fn test_note_only_update_patches_without_touching_record() {
        let (ledger, assets, history) = setup(asset());
        ledger
            .reconcile_asset_update(&key(), ProposedUpdate::default())
            .await
            .unwrap();
        let before = assets.get(&key()).await.unwrap().unwrap();

        let outcome = ledger
            .reconcile_asset_update(
                &key(),
                ProposedUpdate {
                    note: Some("scratched casing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconcileOutcome {
                inserted: false,
                patched_note: true,
                patched_audit_status: false,
            }
        );
        assert_eq!(assets.get(&key()).await.unwrap().unwrap(), before);
        assert_eq!(history.entries_for(&key()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_update_is_idempotent() {
        let (ledger, _assets, history) = setup(asset());
        let update = ProposedUpdate {
            location: Some("-6.3,106.9".to_string()),
            note: Some("moved".to_string()),
            ..Default::default()
        };

        ledger
            .reconcile_asset_update(&key(), update.clone())
            .await
            .unwrap();
        let second = ledger.reconcile_asset_update(&key(), update).await.unwrap();

        assert_eq!(second, ReconcileOutcome::default());
        assert_eq!(history.entries_for(&key()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_too_many_files_rejected_before_any_io() {
        let (ledger, assets, history) = setup(asset());
        let before = assets.snapshot().await;

        let result = ledger
            .reconcile_asset_update(
                &key(),
                ProposedUpdate {
                    new_files: vec![url("a"), url("b"), url("c"), url("d")],
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(LedgerError::InvalidSlotCount(4))));
        assert_eq!(assets.snapshot().await, before);
        assert!(history.entries_for(&key()).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_asset_is_reported() {
        let (ledger, _assets, history) = setup(asset());
        let missing = AssetKey::new("01", "NOPE");

        let result = ledger
            .reconcile_asset_update(&missing, ProposedUpdate::default())
            .await;

        assert!(matches!(result, Err(LedgerError::AssetNotFound(k)) if k == missing));
        assert!(history.entries_for(&missing).await.is_empty());
    }

    #[tokio::test]
    async fn test_history_write_failure_surfaces_as_storage_write() {
        let (ledger, _assets, history) = setup(asset());
        history.fail_writes(true);

        let result = ledger
            .reconcile_asset_update(
                &key(),
                ProposedUpdate {
                    status: Some("R2".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(LedgerError::StorageWrite(_))));
        assert!(history.entries_for(&key()).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_updates_to_one_asset_do_not_duplicate_history() {
        let (ledger, _assets, history) = setup(asset());
        let ledger = Arc::new(ledger);
        let update = ProposedUpdate {
            status: Some("R2".to_string()),
            ..Default::default()
        };

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                let update = update.clone();
                tokio::spawn(async move { ledger.reconcile_asset_update(&key(), update).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(history.entries_for(&key()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_slots_survive_update_without_files() {
        let mut record = asset();
        record.attachments = AttachmentSlotSet::new(Some(url("x")), Some(url("y")), None);
        let (ledger, assets, _history) = setup(record);

        ledger
            .reconcile_asset_update(
                &key(),
                ProposedUpdate {
                    status: Some("R2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = assets.get(&key()).await.unwrap().unwrap();
        assert_eq!(record.attachments.slot1, Some(url("x")));
        assert_eq!(record.attachments.slot2, Some(url("y")));
    }
}
