//! Cambio Order Wizard
//!
//! Multi-step exchange order draft: line editing with live quotes, contact
//! validation, a read-once snapshot inbox for drafts started elsewhere, and
//! the seam to the backend that accepts finished orders.

pub mod config;
pub mod draft;
pub mod error;
pub mod snapshot;
pub mod storage;
pub mod submission;
pub mod summary;
pub mod wizard;

pub use config::WizardConfig;
pub use draft::{
    ContactInfo, ExchangePairLine, LineEdit, OrderDraft, Recalculation, UserProfile, WizardStep,
};
pub use error::{ContactField, LineIssue, LineProblem, ValidationFailure, WizardError, WizardResult};
pub use snapshot::{DraftSnapshot, SnapshotInbox, DEFAULT_SNAPSHOT_KEY};
pub use storage::{ClientStorage, FileStorage, MemoryStorage, StorageError};
pub use submission::{
    LoggingSubmission, OrderStatus, OrderSubmission, SubmissionAdapter, SubmissionError,
    SubmissionReceipt,
};
pub use summary::OrderSummary;
pub use wizard::OrderWizard;
