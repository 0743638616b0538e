//! # mailvault-core
//!
//! Business logic for the mailvault credential vault.
//!
//! This crate provides:
//! - Credential storage (`SQLite`) with per-account uniqueness
//! - Concurrent batch validation against the mail gateway
//! - Tagging of stored credentials
//! - An append-only audit log
//! - Import and export of credential files
//! - Dashboard figures and session tokens

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod audit;
pub mod credential;
pub mod db;
mod error;
pub mod report;
pub mod service;
pub mod session;
pub mod tag;

pub use account::AccountId;
pub use audit::{AuditEntry, AuditLog, NewAuditEntry, OperationKind, PageRequest, RequestMeta};
pub use credential::{
    Credential, CredentialId, CredentialRepository, ListQuery, NewCredential, ParsedImport,
    parse_import,
};
pub use error::{Error, Result};
pub use report::{Dashboard, Reporter, Stats, StatsKind};
pub use service::{
    BatchOutcome, BatchSettings, BatchValidator, ClearOutcome, CredentialPage, CredentialService,
    MailService, Services, TagService,
};
pub use session::{Session, SessionIssuer, SessionSettings, SessionUser};
pub use tag::{NewTag, Tag, TagId, TagRepository, TagUpdate};
