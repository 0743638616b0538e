//! Audit log module.
//!
//! Every state-changing operation appends an entry. Entries are never edited;
//! the owning account can only clear its whole log.

mod model;
mod repository;

pub use model::{AuditEntry, NewAuditEntry, OperationKind, PageRequest, RequestMeta, TargetKind};
pub use repository::AuditLog;
