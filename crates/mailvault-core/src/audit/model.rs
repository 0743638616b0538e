//! Audit log model types.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::account::AccountId;

macro_rules! operation_kinds {
    ($($variant:ident => $id:literal, $label:literal;)+) => {
        /// Kind of a recorded operation.
        ///
        /// Stored as its snake_case identifier. Identifiers this build does not
        /// know are kept verbatim in [`OperationKind::Other`].
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum OperationKind {
            $(
                #[doc = $label]
                $variant,
            )+
            /// An identifier not known to this build.
            Other(String),
        }

        impl OperationKind {
            /// Every known kind.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Parse a stored identifier.
            #[must_use]
            pub fn parse(s: &str) -> Self {
                match s {
                    $($id => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }

            /// The stored identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $id,)+
                    Self::Other(raw) => raw,
                }
            }

            /// Human-readable label. Unknown kinds are labelled with their identifier.
            #[must_use]
            pub fn label(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Other(raw) => raw,
                }
            }
        }
    };
}

operation_kinds! {
    LoginSuccess => "login_success", "Signed in";
    LoginFailed => "login_failed", "Sign-in failed";
    Logout => "logout", "Signed out";
    ClearAllLogs => "clear_all_logs", "Cleared operation log";
    EmailAdded => "email_added", "Added mailbox";
    EmailDeleted => "email_deleted", "Deleted mailbox";
    EmailUpdated => "email_updated", "Updated mailbox";
    EmailValidationFailed => "email_validation_failed", "Mailbox validation failed";
    EmailValidationSkipped => "email_validation_skipped", "Mailbox validation skipped";
    BatchAddEmails => "batch_add_emails", "Batch added mailboxes";
    BatchDeleteEmails => "batch_delete_emails", "Batch deleted mailboxes";
    GetLatestMail => "get_latest_mail", "Fetched latest mail";
    GetLatestMailFailed => "get_latest_mail_failed", "Fetching latest mail failed";
    GetAllMails => "get_all_mails", "Fetched all mail";
    GetAllMailsFailed => "get_all_mails_failed", "Fetching all mail failed";
    ClearInbox => "clear_inbox", "Cleared inbox";
    ClearInboxFailed => "clear_inbox_failed", "Clearing inbox failed";
    ClearJunk => "clear_junk", "Cleared junk";
    ClearJunkFailed => "clear_junk_failed", "Clearing junk failed";
    BatchClearInbox => "batch_clear_inbox", "Batch cleared inboxes";
    ExportEmails => "export_emails", "Exported mailboxes";
    TagCreated => "tag_created", "Created tag";
    TagUpdated => "tag_updated", "Updated tag";
    TagDeleted => "tag_deleted", "Deleted tag";
    EmailTagged => "email_tagged", "Tagged mailbox";
    EmailUntagged => "email_untagged", "Untagged mailbox";
    BatchTagEmails => "batch_tag_emails", "Batch tagged mailboxes";
    BatchUntagEmails => "batch_untag_emails", "Batch untagged mailboxes";
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// What an audit entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Session and log management.
    Auth,
    /// A stored mailbox credential.
    Credential,
    /// A tag.
    Tag,
}

impl TargetKind {
    /// Parse a stored target type.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "credential" => Self::Credential,
            "tag" => Self::Tag,
            _ => Self::Auth,
        }
    }

    /// The stored target type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Credential => "credential",
            Self::Tag => "tag",
        }
    }
}

/// Where a request came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    /// Client IP address.
    pub ip_address: String,
    /// Client user agent.
    pub user_agent: String,
}

impl RequestMeta {
    /// Create request metadata.
    #[must_use]
    pub fn new(ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip_address: ip_address.into(),
            user_agent: user_agent.into(),
        }
    }
}

/// An entry to be appended to the audit log.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    /// Acting account.
    pub account: AccountId,
    /// Operation kind.
    pub kind: OperationKind,
    /// Target type.
    pub target: TargetKind,
    /// Target id, when the operation concerns one record.
    pub target_id: Option<i64>,
    /// Free-form description.
    pub description: String,
    /// Request origin.
    pub meta: RequestMeta,
}

impl NewAuditEntry {
    /// Create an entry with an [`TargetKind::Auth`] target.
    #[must_use]
    pub fn new(account: AccountId, kind: OperationKind, description: impl Into<String>) -> Self {
        Self {
            account,
            kind,
            target: TargetKind::Auth,
            target_id: None,
            description: description.into(),
            meta: RequestMeta::default(),
        }
    }

    /// Point the entry at a credential.
    #[must_use]
    pub const fn on_credential(mut self, id: Option<i64>) -> Self {
        self.target = TargetKind::Credential;
        self.target_id = id;
        self
    }

    /// Point the entry at a tag.
    #[must_use]
    pub const fn on_tag(mut self, id: Option<i64>) -> Self {
        self.target = TargetKind::Tag;
        self.target_id = id;
        self
    }

    /// Attach request metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: &RequestMeta) -> Self {
        self.meta = meta.clone();
        self
    }
}

/// A stored audit entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Entry id.
    pub id: i64,
    /// Acting account.
    pub account: AccountId,
    /// Operation kind.
    pub kind: OperationKind,
    /// Display label of `kind`.
    pub label: String,
    /// Target type.
    pub target: TargetKind,
    /// Target id.
    pub target_id: Option<i64>,
    /// Description.
    pub description: String,
    /// Client IP address.
    pub ip_address: String,
    /// Client user agent.
    pub user_agent: String,
    /// When the operation happened.
    pub created_at: DateTime<Utc>,
}

/// Paging for audit log listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// One-based page number.
    pub page: i64,
    /// Entries per page.
    pub page_size: i64,
}

impl PageRequest {
    /// Page size used when none (or an invalid one) is given.
    pub const DEFAULT_PAGE_SIZE: i64 = 5;
    /// Largest allowed page size.
    pub const MAX_PAGE_SIZE: i64 = 50;

    /// Build a page request, replacing out-of-range values with defaults.
    #[must_use]
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|s| (1..=Self::MAX_PAGE_SIZE).contains(s))
            .unwrap_or(Self::DEFAULT_PAGE_SIZE);
        Self { page, page_size }
    }

    /// Row offset of the first entry on this page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(&OperationKind::parse(kind.as_str()), kind);
            assert_ne!(kind.label(), kind.as_str());
        }
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let kind = OperationKind::parse("rotate_keys");
        assert_eq!(kind, OperationKind::Other("rotate_keys".to_string()));
        assert_eq!(kind.label(), "rotate_keys");
        assert_eq!(kind.as_str(), "rotate_keys");
    }

    #[test]
    fn test_kind_serializes_as_identifier() {
        let json = serde_json::to_string(&OperationKind::BatchAddEmails).unwrap_or_default();
        assert_eq!(json, "\"batch_add_emails\"");
    }

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, page_size: 5 });
        assert_eq!(PageRequest::new(Some(0), Some(51)), PageRequest { page: 1, page_size: 5 });
        let page = PageRequest::new(Some(3), Some(50));
        assert_eq!(page.page_size, 50);
        assert_eq!(page.offset(), 100);
    }

    #[test]
    fn test_huge_page_saturates() {
        let page = PageRequest::new(Some(i64::MAX), Some(50));
        assert_eq!(page.offset(), i64::MAX);
    }

    #[test]
    fn test_target_kind() {
        assert_eq!(TargetKind::parse("tag"), TargetKind::Tag);
        assert_eq!(TargetKind::parse("unknown"), TargetKind::Auth);
        assert_eq!(TargetKind::Credential.as_str(), "credential");
    }
}
