//! Credential model types.

use chrono::{DateTime, Utc};
use mailvault_gateway::MailboxCredentials;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::tag::Tag;

/// Unique identifier for a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub i64);

impl CredentialId {
    /// Create a new credential ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CredentialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored mailbox credential.
///
/// The password, client id and refresh token never leave the process through
/// serialization.
#[derive(Clone, Serialize)]
pub struct Credential {
    /// Credential id.
    pub id: CredentialId,
    /// Owning account.
    #[serde(skip)]
    pub account: AccountId,
    /// Mailbox address, unique per account.
    pub email_address: String,
    /// Mailbox password.
    #[serde(skip_serializing)]
    pub password: String,
    /// OAuth client id.
    #[serde(skip_serializing)]
    pub client_id: String,
    /// OAuth refresh token.
    #[serde(skip_serializing)]
    pub refresh_token: String,
    /// Free-form note.
    pub remark: String,
    /// Last successful mail operation.
    pub last_operation_at: Option<DateTime<Utc>>,
    /// When the credential was stored.
    pub created_at: DateTime<Utc>,
    /// When the credential was last edited.
    pub updated_at: DateTime<Utc>,
    /// Attached tags.
    pub tags: Vec<Tag>,
}

impl Credential {
    /// The fields the mail gateway authenticates with.
    #[must_use]
    pub fn mailbox_credentials(&self) -> MailboxCredentials<'_> {
        MailboxCredentials {
            email: &self.email_address,
            client_id: &self.client_id,
            refresh_token: &self.refresh_token,
        }
    }

    /// Copy the editable fields from `input`.
    pub fn apply(&mut self, input: &NewCredential) {
        self.email_address.clone_from(&input.email_address);
        self.password.clone_from(&input.password);
        self.client_id.clone_from(&input.client_id);
        self.refresh_token.clone_from(&input.refresh_token);
        self.remark.clone_from(&input.remark);
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("account", &self.account)
            .field("email_address", &self.email_address)
            .field("remark", &self.remark)
            .field("last_operation_at", &self.last_operation_at)
            .field("tags", &self.tags.len())
            .finish_non_exhaustive()
    }
}

/// Input for storing a credential.
#[derive(Clone, Default, Deserialize)]
pub struct NewCredential {
    /// Mailbox address.
    pub email_address: String,
    /// Mailbox password.
    pub password: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth refresh token.
    pub refresh_token: String,
    /// Free-form note.
    #[serde(default)]
    pub remark: String,
}

impl NewCredential {
    /// Create an input without a remark.
    #[must_use]
    pub fn new(
        email_address: impl Into<String>,
        password: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            email_address: email_address.into(),
            password: password.into(),
            client_id: client_id.into(),
            refresh_token: refresh_token.into(),
            remark: String::new(),
        }
    }

    /// Set the remark.
    #[must_use]
    pub fn with_remark(mut self, remark: impl Into<String>) -> Self {
        self.remark = remark.into();
        self
    }

    /// Trim surrounding whitespace from every field.
    #[must_use]
    pub fn trimmed(mut self) -> Self {
        for field in [
            &mut self.email_address,
            &mut self.password,
            &mut self.client_id,
            &mut self.refresh_token,
            &mut self.remark,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_string();
            }
        }
        self
    }

    /// The fields the mail gateway authenticates with.
    #[must_use]
    pub fn mailbox_credentials(&self) -> MailboxCredentials<'_> {
        MailboxCredentials {
            email: &self.email_address,
            client_id: &self.client_id,
            refresh_token: &self.refresh_token,
        }
    }
}

impl std::fmt::Debug for NewCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewCredential")
            .field("email_address", &self.email_address)
            .field("remark", &self.remark)
            .finish_non_exhaustive()
    }
}

/// Listing parameters for credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Substring matched against address and remark.
    pub keyword: Option<String>,
    /// Page size.
    pub limit: i64,
    /// Rows to skip.
    pub offset: i64,
}

impl ListQuery {
    /// Page size used when none (or an invalid one) is given.
    pub const DEFAULT_LIMIT: i64 = 20;
    /// Largest allowed page size.
    pub const MAX_LIMIT: i64 = 100;

    /// Build a query, replacing out-of-range values with defaults.
    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>, keyword: Option<String>) -> Self {
        Self {
            keyword: keyword
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            limit: limit
                .filter(|l| (1..=Self::MAX_LIMIT).contains(l))
                .unwrap_or(Self::DEFAULT_LIMIT),
            offset: offset.filter(|o| *o >= 0).unwrap_or(0),
        }
    }

    /// One-based page number this query corresponds to.
    #[must_use]
    pub const fn page(&self) -> i64 {
        (self.offset / self.limit).saturating_add(1)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}
