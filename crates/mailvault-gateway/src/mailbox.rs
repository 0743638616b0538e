//! Mailbox selection and the credential triple the gateway needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote mailbox folder an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mailbox {
    /// The primary inbox.
    #[default]
    #[serde(rename = "INBOX", alias = "inbox", alias = "Inbox")]
    Inbox,
    /// The junk (spam) folder.
    #[serde(rename = "Junk", alias = "junk", alias = "JUNK")]
    Junk,
}

impl Mailbox {
    /// Parses a mailbox name. Anything that is not a junk alias selects the inbox.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("junk") {
            Self::Junk
        } else {
            Self::Inbox
        }
    }

    /// Returns the name the gateway expects on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "INBOX",
            Self::Junk => "Junk",
        }
    }

    /// Path of the gateway endpoint that empties this mailbox.
    #[must_use]
    pub(crate) const fn clear_path(self) -> &'static str {
        match self {
            Self::Inbox => "api/process-inbox",
            Self::Junk => "api/process-junk",
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of the fields the gateway authenticates with.
#[derive(Clone, Copy)]
pub struct MailboxCredentials<'a> {
    /// Mailbox address.
    pub email: &'a str,
    /// OAuth client id registered for the mailbox.
    pub client_id: &'a str,
    /// Long-lived OAuth refresh token.
    pub refresh_token: &'a str,
}

impl fmt::Debug for MailboxCredentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxCredentials")
            .field("email", &self.email)
            .field("client_id", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_falls_back_to_inbox() {
        assert_eq!(Mailbox::parse("Junk"), Mailbox::Junk);
        assert_eq!(Mailbox::parse(" junk "), Mailbox::Junk);
        assert_eq!(Mailbox::parse("INBOX"), Mailbox::Inbox);
        assert_eq!(Mailbox::parse("Archive"), Mailbox::Inbox);
        assert_eq!(Mailbox::parse(""), Mailbox::Inbox);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Mailbox::Inbox.to_string(), "INBOX");
        assert_eq!(Mailbox::Junk.as_str(), "Junk");
        assert_eq!(Mailbox::Junk.clear_path(), "api/process-junk");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = MailboxCredentials {
            email: "a@outlook.com",
            client_id: "client",
            refresh_token: "secret-token",
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("a@outlook.com"));
        assert!(!printed.contains("secret-token"));
    }
}
