//! Dashboard and statistics.
//!
//! Figures are recomputed from the store on every call.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Result;
use crate::account::AccountId;
use crate::audit::{AuditEntry, AuditLog};
use crate::credential::{Credential, CredentialRepository, ListQuery};
use crate::tag::{TagId, TagRepository};

/// Number of entries shown in dashboard lists.
const DASHBOARD_ITEMS: i64 = 5;

/// Number of audit entries in the operations statistics.
const RECENT_OPERATIONS: i64 = 20;

/// Overview shown on the landing page.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    /// Credentials owned by the account.
    pub total_emails: i64,
    /// Tags in the deployment.
    pub total_tags: i64,
    /// Five most recent audit entries.
    pub recent_operations: Vec<AuditEntry>,
    /// Credential count per tag name, for the five newest tags.
    pub emails_by_tag: BTreeMap<String, i64>,
    /// Audit entry count per operation label.
    pub operations_by_type: BTreeMap<String, i64>,
}

/// Which statistics to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsKind {
    /// Credential figures.
    Emails,
    /// Tag figures.
    Tags,
    /// Audit figures.
    Operations,
    /// A summary of everything.
    #[default]
    All,
}

impl StatsKind {
    /// Parse a `type` query value. Unknown values select [`StatsKind::All`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "emails" => Self::Emails,
            "tags" => Self::Tags,
            "operations" => Self::Operations,
            _ => Self::All,
        }
    }
}

/// Per-tag usage.
#[derive(Debug, Serialize)]
pub struct TagUsage {
    /// Tag id.
    pub id: TagId,
    /// Tag name.
    pub name: String,
    /// Tag color.
    pub color: String,
    /// Credentials carrying the tag.
    pub email_count: i64,
}

/// Statistics of one [`StatsKind`].
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Stats {
    /// Credential figures.
    Emails {
        /// Credentials owned by the account.
        total_emails: i64,
        /// Newest credentials.
        recent_emails: Vec<Credential>,
    },
    /// Tag figures.
    Tags {
        /// Tags in the deployment.
        total_tags: usize,
        /// Usage of every tag.
        tag_stats: Vec<TagUsage>,
    },
    /// Audit figures.
    Operations {
        /// Most recent audit entries.
        recent_operations: Vec<AuditEntry>,
        /// Audit entry count per operation label.
        operation_stats: BTreeMap<String, i64>,
    },
    /// A summary of everything.
    All {
        /// Credentials owned by the account.
        total_emails: i64,
        /// Tags in the deployment.
        total_tags: i64,
        /// Audit entry count per operation label.
        operation_stats: BTreeMap<String, i64>,
        /// When the figures were computed.
        last_updated: DateTime<Utc>,
    },
}

/// Computes dashboard figures.
#[derive(Debug, Clone)]
pub struct Reporter {
    credentials: CredentialRepository,
    tags: TagRepository,
    audit: AuditLog,
}

impl Reporter {
    /// Create a reporter.
    #[must_use]
    pub const fn new(credentials: CredentialRepository, tags: TagRepository, audit: AuditLog) -> Self {
        Self {
            credentials,
            tags,
            audit,
        }
    }

    /// Landing page overview.
    ///
    /// # Errors
    ///
    /// Returns an error if any database query fails.
    pub async fn dashboard(&self, account: AccountId) -> Result<Dashboard> {
        let emails_by_tag = self
            .tags
            .newest_with_account_counts(account, DASHBOARD_ITEMS)
            .await?
            .into_iter()
            .map(|(tag, count)| (tag.name, count))
            .collect();

        Ok(Dashboard {
            total_emails: self.credentials.count(account, None).await?,
            total_tags: self.tags.count().await?,
            recent_operations: self.audit.recent(account, DASHBOARD_ITEMS).await?,
            emails_by_tag,
            operations_by_type: self.operations_by_label(account).await?,
        })
    }

    /// Statistics of the requested kind.
    ///
    /// # Errors
    ///
    /// Returns an error if any database query fails.
    pub async fn stats(&self, account: AccountId, kind: StatsKind) -> Result<Stats> {
        Ok(match kind {
            StatsKind::Emails => Stats::Emails {
                total_emails: self.credentials.count(account, None).await?,
                recent_emails: self
                    .credentials
                    .list(account, &ListQuery::new(Some(DASHBOARD_ITEMS), None, None))
                    .await?,
            },
            StatsKind::Tags => {
                let tag_stats: Vec<TagUsage> = self
                    .tags
                    .list()
                    .await?
                    .into_iter()
                    .map(|tag| TagUsage {
                        id: tag.id,
                        name: tag.name,
                        color: tag.color,
                        email_count: tag.credential_count,
                    })
                    .collect();
                Stats::Tags {
                    total_tags: tag_stats.len(),
                    tag_stats,
                }
            }
            StatsKind::Operations => Stats::Operations {
                recent_operations: self.audit.recent(account, RECENT_OPERATIONS).await?,
                operation_stats: self.operations_by_label(account).await?,
            },
            StatsKind::All => Stats::All {
                total_emails: self.credentials.count(account, None).await?,
                total_tags: self.tags.count().await?,
                operation_stats: self.operations_by_label(account).await?,
                last_updated: Utc::now(),
            },
        })
    }

    async fn operations_by_label(&self, account: AccountId) -> Result<BTreeMap<String, i64>> {
        let mut by_label = BTreeMap::new();
        for (kind, count) in self.audit.counts_by_kind(account).await? {
            *by_label.entry(kind.label().to_string()).or_insert(0) += count;
        }
        Ok(by_label)
    }
}
