//! Audit trail writer.
//!
//! Decides, for one proposed update, whether a new history entry has to be
//! appended and whether the note or audit flag of the latest entry has to be
//! patched in place. Planning is a pure function over the latest entry; the
//! repository then applies the plan in a single transaction.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::LedgerError;
use crate::asset::{
    AssetHistoryEntry, AssetKey, AttachmentSlotSet, DEFAULT_AUDIT_STATUS, DEFAULT_NOTE,
};
use crate::db::HistoryRepository;

/// Proposed values for one history write. `None` means "no change requested".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposedFields {
    pub location: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
    pub audit_status: Option<String>,
    pub attachments: Option<AttachmentSlotSet>,
}

/// In-place edit of the mutable fields of one history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPatch {
    /// Id of the entry to patch.
    pub target: Uuid,
    pub note: Option<String>,
    pub audit_status: Option<String>,
}

/// Writes required to bring the history in line with a proposed update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPlan {
    pub insert: Option<AssetHistoryEntry>,
    pub patch: Option<HistoryPatch>,
}

impl HistoryPlan {
    /// Returns true if nothing needs to be written.
    pub fn is_noop(&self) -> bool {
        self.insert.is_none() && self.patch.is_none()
    }

    /// Summarises the plan as the outcome reported to callers.
    pub fn outcome(&self) -> ReconcileOutcome {
        let patch = self.patch.as_ref();
        ReconcileOutcome {
            inserted: self.insert.is_some(),
            patched_note: patch.is_some_and(|p| p.note.is_some()),
            patched_audit_status: patch.is_some_and(|p| p.audit_status.is_some()),
        }
    }
}

/// What a reconciliation wrote to the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub inserted: bool,
    pub patched_note: bool,
    pub patched_audit_status: bool,
}

/// Plans the history writes for `proposed` against the latest entry.
///
/// Absent fields inherit from `latest`. A new entry is appended when there
/// is no history yet or when location, status or any attachment slot
/// changed. Note and audit flag are patched independently whenever their
/// merged value differs from what `latest` stores; the patch targets the
/// entry that is latest once the insert (if any) has happened.
pub fn plan_history_change(
    key: &AssetKey,
    latest: Option<&AssetHistoryEntry>,
    proposed: &ProposedFields,
    actor: &str,
    now: DateTime<Utc>,
) -> HistoryPlan {
    let now = now.trunc_subsecs(6);

    let Some(latest) = latest else {
        let entry = AssetHistoryEntry {
            id: Uuid::new_v4(),
            key: key.clone(),
            timestamp: now,
            old_location: None,
            new_location: proposed.location.clone(),
            old_status: None,
            new_status: proposed.status.clone(),
            note: Some(
                proposed
                    .note
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NOTE.to_string()),
            ),
            audit_status: Some(
                proposed
                    .audit_status
                    .clone()
                    .unwrap_or_else(|| DEFAULT_AUDIT_STATUS.to_string()),
            ),
            attachments: proposed.attachments.clone().unwrap_or_default(),
            actor: actor.to_string(),
        };
        return HistoryPlan {
            insert: Some(entry),
            patch: None,
        };
    };

    let location = inherit(&proposed.location, &latest.new_location);
    let status = inherit(&proposed.status, &latest.new_status);
    let note = inherit(&proposed.note, &latest.note).unwrap_or_else(|| DEFAULT_NOTE.to_string());
    let audit_status = inherit(&proposed.audit_status, &latest.audit_status)
        .unwrap_or_else(|| DEFAULT_AUDIT_STATUS.to_string());
    let attachments = proposed
        .attachments
        .clone()
        .unwrap_or_else(|| latest.attachments.clone());

    let transition = location != latest.new_location
        || status != latest.new_status
        || !attachments.same_slots(&latest.attachments);

    let insert = transition.then(|| AssetHistoryEntry {
        id: Uuid::new_v4(),
        key: key.clone(),
        timestamp: next_timestamp(latest.timestamp, now),
        old_location: latest.new_location.clone(),
        new_location: location,
        old_status: latest.new_status.clone(),
        new_status: status,
        note: Some(note.clone()),
        audit_status: Some(audit_status.clone()),
        attachments,
        actor: actor.to_string(),
    });

    let note_patch = (latest.note.as_deref() != Some(note.as_str())).then_some(note);
    let audit_patch =
        (latest.audit_status.as_deref() != Some(audit_status.as_str())).then_some(audit_status);

    let patch = (note_patch.is_some() || audit_patch.is_some()).then(|| HistoryPatch {
        target: insert.as_ref().map_or(latest.id, |entry| entry.id),
        note: note_patch,
        audit_status: audit_patch,
    });

    HistoryPlan { insert, patch }
}

fn inherit(proposed: &Option<String>, current: &Option<String>) -> Option<String> {
    proposed.clone().or_else(|| current.clone())
}

/// Keeps history timestamps strictly increasing even if the clock is behind
/// the latest stored entry.
fn next_timestamp(latest: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > latest {
        now
    } else {
        latest + Duration::microseconds(1)
    }
}

/// Reads the latest history entry, plans, and records the plan.
pub struct AuditTrailWriter {
    history: Arc<dyn HistoryRepository>,
    actor: String,
}

impl AuditTrailWriter {
    /// Creates a writer that records entries under `actor`.
    pub fn new(history: Arc<dyn HistoryRepository>, actor: impl Into<String>) -> Self {
        Self {
            history,
            actor: actor.into(),
        }
    }

    /// Applies `proposed` to the history of `key`.
    pub async fn write(
        &self,
        key: &AssetKey,
        proposed: &ProposedFields,
    ) -> Result<ReconcileOutcome, LedgerError> {
        let latest = self
            .history
            .latest_for(key)
            .await
            .map_err(LedgerError::StorageRead)?;

        let plan = plan_history_change(key, latest.as_ref(), proposed, &self.actor, Utc::now());
        let outcome = plan.outcome();

        if plan.is_noop() {
            debug!(asset = %key, "History unchanged");
            return Ok(outcome);
        }

        self.history
            .record(key, &plan)
            .await
            .map_err(LedgerError::StorageWrite)?;

        debug!(
            asset = %key,
            inserted = outcome.inserted,
            patched_note = outcome.patched_note,
            patched_audit_status = outcome.patched_audit_status,
            "History updated"
        );
        Ok(outcome)
    }
}
