//! Mailbox credential module.
//!
//! Provides the credential model, storage, input validation and the plain-text
//! import and export formats.

pub mod export;
mod import;
mod model;
mod repository;
mod validation;

pub use export::{ExportFormat, ExportOutput, ExportRange, ExportRequest, SortDirection, SortField};
pub use import::{FIELD_SEPARATOR, ParsedImport, parse_import};
pub use model::{Credential, CredentialId, ListQuery, NewCredential};
pub use repository::CredentialRepository;
pub use validation::{ValidationError, ValidationResult, describe, validate_new_credential};
