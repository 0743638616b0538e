//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Input was rejected before any work was done.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A credential with the same address already exists for the account.
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// The remote mail gateway failed.
    #[error("{0}")]
    Gateway(#[from] mailvault_gateway::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The referenced record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record exists but belongs to another account.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A tag cannot be deleted while credentials still reference it.
    #[error("Tag {name} is still attached to {count} credential(s)")]
    TagInUse {
        /// Tag name.
        name: String,
        /// Number of credentials referencing the tag.
        count: i64,
    },

    /// A uniqueness rule other than credential duplication was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authentication failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session token could not be issued or verified.
    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
