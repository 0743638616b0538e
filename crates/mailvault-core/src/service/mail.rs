//! Mail operations proxied to the remote gateway for stored credentials.

use std::sync::Arc;

use mailvault_gateway::{CanonicalMessage, MailGateway, Mailbox};
use serde::Serialize;
use tracing::{debug, warn};

use crate::account::AccountId;
use crate::audit::{AuditLog, NewAuditEntry, OperationKind, RequestMeta};
use crate::credential::{Credential, CredentialId, CredentialRepository};
use crate::{Error, Result};

/// Result of clearing several inboxes.
#[derive(Debug, Default, Serialize)]
pub struct ClearOutcome {
    /// Number of inboxes cleared.
    pub success_count: usize,
    /// One message per failed id, in request order.
    pub errors: Vec<String>,
}

/// Fetches and clears mail for stored credentials.
#[derive(Clone)]
pub struct MailService {
    credentials: CredentialRepository,
    audit: AuditLog,
    gateway: Arc<dyn MailGateway>,
}

impl MailService {
    /// Create the service.
    #[must_use]
    pub fn new(
        credentials: CredentialRepository,
        audit: AuditLog,
        gateway: Arc<dyn MailGateway>,
    ) -> Self {
        Self {
            credentials,
            audit,
            gateway,
        }
    }

    /// Newest message in `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for foreign ids and
    /// [`Error::Gateway`] when the gateway call fails.
    pub async fn fetch_latest(
        &self,
        account: AccountId,
        id: CredentialId,
        mailbox: Mailbox,
        meta: &RequestMeta,
    ) -> Result<CanonicalMessage> {
        let credential = self.credentials.get_owned(account, id).await?;
        match self
            .gateway
            .fetch_latest(credential.mailbox_credentials(), mailbox)
            .await
        {
            Ok(message) => {
                self.succeeded(
                    &credential,
                    OperationKind::GetLatestMail,
                    format!("Fetched latest {mailbox} mail of {}", credential.email_address),
                    meta,
                )
                .await;
                Ok(message)
            }
            Err(e) => {
                self.failed(
                    &credential,
                    OperationKind::GetLatestMailFailed,
                    format!("Fetching latest {mailbox} mail failed: {e}"),
                    meta,
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Every message in `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for foreign ids and
    /// [`Error::Gateway`] when the gateway call fails.
    pub async fn fetch_all(
        &self,
        account: AccountId,
        id: CredentialId,
        mailbox: Mailbox,
        meta: &RequestMeta,
    ) -> Result<Vec<CanonicalMessage>> {
        let credential = self.credentials.get_owned(account, id).await?;
        match self
            .gateway
            .fetch_all(credential.mailbox_credentials(), mailbox)
            .await
        {
            Ok(messages) => {
                self.succeeded(
                    &credential,
                    OperationKind::GetAllMails,
                    format!(
                        "Fetched {} {mailbox} messages of {}",
                        messages.len(),
                        credential.email_address
                    ),
                    meta,
                )
                .await;
                Ok(messages)
            }
            Err(e) => {
                self.failed(
                    &credential,
                    OperationKind::GetAllMailsFailed,
                    format!("Fetching {mailbox} mail failed: {e}"),
                    meta,
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Delete every message in `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for foreign ids and
    /// [`Error::Gateway`] when the gateway call fails.
    pub async fn clear(
        &self,
        account: AccountId,
        id: CredentialId,
        mailbox: Mailbox,
        meta: &RequestMeta,
    ) -> Result<()> {
        let credential = self.credentials.get_owned(account, id).await?;
        let (done, failed) = match mailbox {
            Mailbox::Inbox => (OperationKind::ClearInbox, OperationKind::ClearInboxFailed),
            Mailbox::Junk => (OperationKind::ClearJunk, OperationKind::ClearJunkFailed),
        };

        match self
            .gateway
            .clear(credential.mailbox_credentials(), mailbox)
            .await
        {
            Ok(()) => {
                self.succeeded(
                    &credential,
                    done,
                    format!("Cleared {mailbox} of {}", credential.email_address),
                    meta,
                )
                .await;
                Ok(())
            }
            Err(e) => {
                self.failed(
                    &credential,
                    failed,
                    format!("Clearing {mailbox} failed: {e}"),
                    meta,
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Clear the inbox of each credential in turn. Failures do not stop the run.
    pub async fn batch_clear_inbox(
        &self,
        account: AccountId,
        ids: &[CredentialId],
        meta: &RequestMeta,
    ) -> ClearOutcome {
        let mut outcome = ClearOutcome::default();
        if ids.is_empty() {
            return outcome;
        }

        for id in ids {
            match self.clear(account, *id, Mailbox::Inbox, meta).await {
                Ok(()) => outcome.success_count += 1,
                Err(Error::Gateway(e)) => {
                    let address = self
                        .credentials
                        .get(*id)
                        .await
                        .ok()
                        .flatten()
                        .map_or_else(|| format!("credential {id}"), |c| c.email_address);
                    outcome.errors.push(format!("{address}: {e}"));
                }
                Err(e) => outcome.errors.push(format!("credential {id}: {e}")),
            }
        }

        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::BatchClearInbox,
                    format!(
                        "Batch clear inbox finished: {} succeeded, {} failed",
                        outcome.success_count,
                        outcome.errors.len()
                    ),
                )
                .on_credential(None)
                .with_meta(meta),
            )
            .await;
        outcome
    }

    async fn succeeded(
        &self,
        credential: &Credential,
        kind: OperationKind,
        description: String,
        meta: &RequestMeta,
    ) {
        if let Err(e) = self.credentials.touch_last_operation(credential.id).await {
            warn!("Failed to record last operation for {}: {e}", credential.id);
        }
        debug!("{kind} succeeded for {}", credential.email_address);
        self.audit
            .record_best_effort(
                NewAuditEntry::new(credential.account, kind, description)
                    .on_credential(Some(credential.id.0))
                    .with_meta(meta),
            )
            .await;
    }

    async fn failed(
        &self,
        credential: &Credential,
        kind: OperationKind,
        description: String,
        meta: &RequestMeta,
    ) {
        warn!("{kind} for {}: {description}", credential.email_address);
        self.audit
            .record_best_effort(
                NewAuditEntry::new(credential.account, kind, description)
                    .on_credential(Some(credential.id.0))
                    .with_meta(meta),
            )
            .await;
    }
}
