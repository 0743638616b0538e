//! Service layer.
//!
//! Services combine the repositories with the mail gateway and write the audit
//! trail. They are cheap to clone and share one connection pool.

pub mod batch;
mod credentials;
mod mail;
mod tags;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use mailvault_gateway::MailGateway;
use sqlx::SqlitePool;

pub use batch::{BatchOutcome, BatchSettings, BatchValidator, DEFAULT_WORKERS, MAX_BATCH_SIZE};
pub use credentials::{CredentialPage, CredentialService};
pub use mail::{ClearOutcome, MailService};
pub use tags::TagService;

use crate::audit::AuditLog;
use crate::credential::CredentialRepository;
use crate::report::Reporter;
use crate::tag::TagRepository;

/// Every service of a deployment, wired to one pool and one gateway.
#[derive(Clone)]
pub struct Services {
    /// Credential lifecycle.
    pub credentials: CredentialService,
    /// Mail operations.
    pub mail: MailService,
    /// Tag management.
    pub tags: TagService,
    /// Audit log access.
    pub audit: AuditLog,
    /// Dashboard figures.
    pub reports: Reporter,
}

impl Services {
    /// Wire every service.
    #[must_use]
    pub fn new(pool: SqlitePool, gateway: Arc<dyn MailGateway>, settings: BatchSettings) -> Self {
        let credential_repo = CredentialRepository::new(pool.clone());
        let tag_repo = TagRepository::new(pool.clone());
        let audit = AuditLog::new(pool);

        Self {
            credentials: CredentialService::new(
                credential_repo.clone(),
                audit.clone(),
                Arc::clone(&gateway),
                settings,
            ),
            mail: MailService::new(credential_repo.clone(), audit.clone(), gateway),
            tags: TagService::new(tag_repo.clone(), credential_repo.clone(), audit.clone()),
            reports: Reporter::new(credential_repo, tag_repo, audit.clone()),
            audit,
        }
    }
}
