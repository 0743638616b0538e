//! Account identity.
//!
//! Deployments are single-tenant: every authenticated session acts as
//! [`AccountId::OWNER`]. Records still carry an account id so ownership checks
//! stay explicit.

use serde::{Deserialize, Serialize};

/// Unique identifier for an owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    /// The account every session acts as.
    pub const OWNER: Self = Self(1);

    /// Used for audit entries written before anyone is authenticated.
    pub const ANONYMOUS: Self = Self(0);

    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
