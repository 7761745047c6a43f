//! Asset records, attachment slots and history entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of fixed attachment slots on an asset.
pub const ATTACHMENT_SLOTS: usize = 3;

/// Note stored on a history entry when none was ever supplied.
pub const DEFAULT_NOTE: &str = "No Note";

/// Audit flag stored on a history entry when none was ever supplied.
pub const DEFAULT_AUDIT_STATUS: &str = "N";

/// Actor recorded on history entries written through the API.
pub const DEFAULT_ACTOR: &str = "WEBAPI";

/// Composite identifier for a physical asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    /// Entity (company) code.
    pub entity_cd: String,
    /// Registration id within the entity.
    pub reg_id: String,
}

impl AssetKey {
    /// Creates a new asset key.
    pub fn new(entity_cd: impl Into<String>, reg_id: impl Into<String>) -> Self {
        Self {
            entity_cd: entity_cd.into(),
            reg_id: reg_id.into(),
        }
    }

    /// Returns a copy with surrounding whitespace removed from both parts.
    pub fn trimmed(&self) -> Self {
        Self::new(self.entity_cd.trim(), self.reg_id.trim())
    }

    /// Returns true if either part is blank.
    pub fn is_blank(&self) -> bool {
        self.entity_cd.trim().is_empty() || self.reg_id.trim().is_empty()
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_cd, self.reg_id)
    }
}

/// The three positional attachment slots of an asset.
///
/// Slot identity carries meaning, so the set is compared position by
/// position and never reordered implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSlotSet {
    pub slot1: Option<String>,
    pub slot2: Option<String>,
    pub slot3: Option<String>,
}

impl AttachmentSlotSet {
    /// Creates a slot set from three optional URLs.
    pub fn new(slot1: Option<String>, slot2: Option<String>, slot3: Option<String>) -> Self {
        Self {
            slot1,
            slot2,
            slot3,
        }
    }

    /// Returns a slot set with every slot empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no slot holds a URL.
    pub fn is_empty(&self) -> bool {
        self.slots().iter().all(|slot| slot.is_none())
    }

    /// Returns the slots in positional order.
    pub fn slots(&self) -> [Option<&str>; ATTACHMENT_SLOTS] {
        [
            occupied(&self.slot1),
            occupied(&self.slot2),
            occupied(&self.slot3),
        ]
    }

    /// Returns true if any slot holds exactly `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.slots().iter().any(|slot| *slot == Some(url))
    }

    /// Compares slot by slot, treating empty strings as vacant.
    pub fn same_slots(&self, other: &AttachmentSlotSet) -> bool {
        self.slots() == other.slots()
    }
}

/// Returns the slot value if it holds a non-empty URL.
pub(crate) fn occupied(slot: &Option<String>) -> Option<&str> {
    slot.as_deref().filter(|s| !s.is_empty())
}

/// Current state of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub key: AssetKey,
    /// Free-text description from the asset register.
    pub description: Option<String>,
    /// Location of the asset, usually "lat,long".
    pub location_map: Option<String>,
    /// Review status code.
    pub status_review: Option<String>,
    pub attachments: AttachmentSlotSet,
    /// Public URL of the generated QR code.
    pub qr_url: Option<String>,
    /// Whether the QR label has been printed.
    pub printed: bool,
    pub staff_id: Option<String>,
    pub div_cd: Option<String>,
    pub dept_cd: Option<String>,
    /// Last time the record itself was written.
    pub updated_at: Option<DateTime<Utc>>,
}

impl AssetRecord {
    /// Creates a bare record with only its key set.
    pub fn new(key: AssetKey) -> Self {
        Self {
            key,
            description: None,
            location_map: None,
            status_review: None,
            attachments: AttachmentSlotSet::empty(),
            qr_url: None,
            printed: false,
            staff_id: None,
            div_cd: None,
            dept_cd: None,
            updated_at: None,
        }
    }

    /// Returns true if a QR code URL has been stored for this asset.
    pub fn has_qr(&self) -> bool {
        occupied(&self.qr_url).is_some()
    }
}

/// Reconciled values written to an asset record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFieldUpdate {
    pub location_map: Option<String>,
    pub status_review: Option<String>,
    pub attachments: AttachmentSlotSet,
}

impl AssetFieldUpdate {
    /// Returns true if applying this update would change the record.
    pub fn differs_from(&self, record: &AssetRecord) -> bool {
        self.location_map != record.location_map
            || self.status_review != record.status_review
            || !self.attachments.same_slots(&record.attachments)
    }
}

/// Staff, division and department assignment for an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAssignment {
    pub staff_id: String,
    pub div_cd: String,
    pub dept_cd: String,
}

/// One row of the append-only asset transaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHistoryEntry {
    pub id: Uuid,
    pub key: AssetKey,
    /// Transaction timestamp; the greatest one marks the latest entry.
    pub timestamp: DateTime<Utc>,
    pub old_location: Option<String>,
    pub new_location: Option<String>,
    pub old_status: Option<String>,
    pub new_status: Option<String>,
    /// Mutable in place on the latest entry only.
    pub note: Option<String>,
    /// Mutable in place on the latest entry only.
    pub audit_status: Option<String>,
    pub attachments: AttachmentSlotSet,
    pub actor: String,
}

/// A member of staff who can be assigned to assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    pub staff_id: String,
    pub name: String,
    pub email: Option<String>,
    pub div_cd: Option<String>,
    pub dept_cd: Option<String>,
}

/// An organisational division.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub div_cd: String,
    pub descs: String,
}

/// An organisational department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub dept_cd: String,
    pub descs: String,
}
