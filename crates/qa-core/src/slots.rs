//! Attachment slot assignment.
//!
//! Maps a batch of freshly uploaded file URLs onto the three fixed
//! attachment slots of an asset. The mapping is positional and asymmetric:
//!
//! | new files | slot 1                          | slot 2 | slot 3                          |
//! |-----------|---------------------------------|--------|---------------------------------|
//! | 0         | kept                            | kept   | kept                            |
//! | 1         | cleared unless slot 3 was set   | f0     | cleared unless slot 2 was set   |
//! | 2         | cleared unless slot 3 was set   | f0     | f1                              |
//! | 3         | f2                              | f0     | f1                              |
//!
//! The three-file rotation is kept as-is for compatibility with existing
//! clients that read slot 1 as the most recent picture.

use crate::asset::{occupied, AttachmentSlotSet};

/// Computes the new slot assignment for an upload batch.
///
/// Only the first three entries of `new_files` are considered; callers
/// reject larger batches before they get here.
pub fn resolve_attachment_slots(
    new_files: &[String],
    existing: &AttachmentSlotSet,
) -> AttachmentSlotSet {
    match new_files {
        [] => existing.clone(),
        [first] => AttachmentSlotSet {
            slot1: keep_if(occupied(&existing.slot3).is_some(), &existing.slot1),
            slot2: Some(first.clone()),
            slot3: keep_if(occupied(&existing.slot2).is_some(), &existing.slot3),
        },
        [first, second] => AttachmentSlotSet {
            slot1: keep_if(occupied(&existing.slot3).is_some(), &existing.slot1),
            slot2: Some(first.clone()),
            slot3: Some(second.clone()),
        },
        [first, second, third, ..] => AttachmentSlotSet {
            slot1: Some(third.clone()),
            slot2: Some(first.clone()),
            slot3: Some(second.clone()),
        },
    }
}

fn keep_if(keep: bool, slot: &Option<String>) -> Option<String> {
    if keep {
        slot.clone()
    } else {
        None
    }
}
