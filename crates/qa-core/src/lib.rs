//! # qa-core
//!
//! Core domain model and services for the QR asset service.
//!
//! This crate holds the asset register model, the attachment slot resolver,
//! the audit trail writer and the reconciliation ledger built on top of it,
//! plus the repositories, file upload and QR generation adapters they use.

pub mod asset;
pub mod db;
pub mod ledger;
pub mod qr;
pub mod slots;
pub mod upload;

pub use asset::{
    AssetFieldUpdate, AssetHistoryEntry, AssetKey, AssetRecord, AttachmentSlotSet, Department,
    Division, Staff, StaffAssignment, ATTACHMENT_SLOTS, DEFAULT_ACTOR, DEFAULT_AUDIT_STATUS,
    DEFAULT_NOTE,
};
pub use ledger::{AssetLedger, LedgerError, ProposedFields, ProposedUpdate, ReconcileOutcome};
pub use qr::{GeneratedQr, QrError, QrRenderer, QrReport, QrService, SvgQrRenderer};
pub use slots::resolve_attachment_slots;
pub use upload::{AttachmentUploader, FileStore, LocalFileStore, UploadError};
