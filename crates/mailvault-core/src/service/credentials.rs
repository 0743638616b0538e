//! Credential lifecycle: add, edit, delete, bulk add, import and export.

use std::collections::BTreeSet;
use std::sync::Arc;

use mailvault_gateway::MailGateway;
use serde::Serialize;
use tracing::{info, warn};

use super::batch::{BatchOutcome, BatchSettings, BatchValidator};
use crate::account::AccountId;
use crate::audit::{AuditLog, NewAuditEntry, OperationKind, RequestMeta};
use crate::credential::export::{self, ExportOutput, ExportRange, ExportRequest};
use crate::credential::{
    Credential, CredentialId, CredentialRepository, ListQuery, NewCredential, describe,
    parse_import, validate_new_credential,
};
use crate::{Error, Result};

/// One page of credentials.
#[derive(Debug, Serialize)]
pub struct CredentialPage {
    /// Credentials on this page, newest first.
    pub list: Vec<Credential>,
    /// Total matching credentials.
    pub total: i64,
    /// One-based page number.
    pub page: i64,
    /// Page size.
    pub size: i64,
}

/// Credential operations for one deployment.
#[derive(Clone)]
pub struct CredentialService {
    credentials: CredentialRepository,
    audit: AuditLog,
    gateway: Arc<dyn MailGateway>,
    batch: BatchValidator,
    skip_validation: bool,
}

impl CredentialService {
    /// Create the service.
    #[must_use]
    pub fn new(
        credentials: CredentialRepository,
        audit: AuditLog,
        gateway: Arc<dyn MailGateway>,
        settings: BatchSettings,
    ) -> Self {
        let batch = BatchValidator::new(
            credentials.clone(),
            audit.clone(),
            Arc::clone(&gateway),
            settings,
        );
        Self {
            credentials,
            audit,
            gateway,
            batch,
            skip_validation: settings.skip_validation,
        }
    }

    /// Validate and store one credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed input, [`Error::Duplicate`]
    /// if the address is already stored, or [`Error::Gateway`] if the gateway
    /// rejects the credential.
    pub async fn add(
        &self,
        account: AccountId,
        input: NewCredential,
        meta: &RequestMeta,
    ) -> Result<Credential> {
        let input = input.trimmed();
        validate_new_credential(&input).map_err(|e| Error::Validation(describe(&e)))?;

        if self.credentials.exists(account, &input.email_address).await? {
            return Err(Error::Duplicate(input.email_address));
        }

        if self.skip_validation {
            self.audit
                .record_best_effort(
                    NewAuditEntry::new(
                        account,
                        OperationKind::EmailValidationSkipped,
                        format!("Skipped validation for {}", input.email_address),
                    )
                    .on_credential(None)
                    .with_meta(meta),
                )
                .await;
        } else if let Err(e) = self.gateway.validate(input.mailbox_credentials()).await {
            warn!("Validation failed for {}: {e}", input.email_address);
            self.audit
                .record_best_effort(
                    NewAuditEntry::new(
                        account,
                        OperationKind::EmailValidationFailed,
                        format!("Validation failed for {}: {e}", input.email_address),
                    )
                    .on_credential(None)
                    .with_meta(meta),
                )
                .await;
            return Err(e.into());
        }

        let credential = self.credentials.create(account, &input).await?;
        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::EmailAdded,
                    format!("Added mailbox {}", credential.email_address),
                )
                .on_credential(Some(credential.id.0))
                .with_meta(meta),
            )
            .await;

        info!("Added credential {} ({})", credential.id, credential.email_address);
        Ok(credential)
    }

    /// Get a credential owned by `account`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] or [`Error::Forbidden`].
    pub async fn get(&self, account: AccountId, id: CredentialId) -> Result<Credential> {
        self.credentials.get_owned(account, id).await
    }

    /// One page of the account's credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, account: AccountId, query: &ListQuery) -> Result<CredentialPage> {
        let list = self.credentials.list(account, query).await?;
        let total = self
            .credentials
            .count(account, query.keyword.as_deref())
            .await?;
        Ok(CredentialPage {
            list,
            total,
            page: query.page(),
            size: query.limit,
        })
    }

    /// Replace a credential's fields after proving the new values work.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for foreign ids,
    /// [`Error::Validation`] for malformed input, [`Error::Gateway`] if the
    /// gateway rejects the new values, or [`Error::Duplicate`] if the new
    /// address is taken.
    pub async fn update(
        &self,
        account: AccountId,
        id: CredentialId,
        input: NewCredential,
        meta: &RequestMeta,
    ) -> Result<Credential> {
        let mut credential = self.credentials.get_owned(account, id).await?;
        let input = input.trimmed();
        validate_new_credential(&input).map_err(|e| Error::Validation(describe(&e)))?;

        credential.apply(&input);
        if !self.skip_validation {
            self.gateway
                .validate(credential.mailbox_credentials())
                .await?;
        }
        self.credentials.update(&credential).await?;

        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::EmailUpdated,
                    format!("Updated mailbox {}", credential.email_address),
                )
                .on_credential(Some(id.0))
                .with_meta(meta),
            )
            .await;

        self.credentials.get_owned(account, id).await
    }

    /// Delete one credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for foreign ids.
    pub async fn delete(&self, account: AccountId, id: CredentialId, meta: &RequestMeta) -> Result<()> {
        let credential = self.credentials.get_owned(account, id).await?;
        self.credentials.delete(id).await?;

        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::EmailDeleted,
                    format!("Deleted mailbox {}", credential.email_address),
                )
                .on_credential(Some(id.0))
                .with_meta(meta),
            )
            .await;
        Ok(())
    }

    /// Delete several credentials. Every id is checked before anything is removed.
    ///
    /// Returns the number of credentials removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] naming the first
    /// foreign id; nothing is deleted in that case.
    pub async fn delete_many(
        &self,
        account: AccountId,
        ids: &[CredentialId],
        meta: &RequestMeta,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        for id in ids {
            self.credentials.get_owned(account, *id).await?;
        }

        let removed = self.credentials.delete_many(ids).await?;
        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::BatchDeleteEmails,
                    format!("Batch deleted {removed} mailboxes"),
                )
                .on_credential(None)
                .with_meta(meta),
            )
            .await;
        Ok(removed)
    }

    /// Validate and store up to 30 credentials concurrently.
    ///
    /// # Errors
    ///
    /// See [`BatchValidator::run`].
    pub async fn batch_add(
        &self,
        account: AccountId,
        items: Vec<NewCredential>,
        meta: &RequestMeta,
    ) -> Result<BatchOutcome> {
        self.batch.run(account, items, meta).await
    }

    /// Parse an import file and batch-add its records.
    ///
    /// Lines that fail to parse are reported after the batch errors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no line parses or more than 30 do,
    /// otherwise see [`BatchValidator::run`].
    pub async fn import(
        &self,
        account: AccountId,
        content: &str,
        meta: &RequestMeta,
    ) -> Result<BatchOutcome> {
        let parsed = parse_import(content);
        if parsed.credentials.is_empty() {
            let mut message = "no valid credentials found in import".to_string();
            if !parsed.errors.is_empty() {
                message.push_str(": ");
                message.push_str(&parsed.errors.join("; "));
            }
            return Err(Error::Validation(message));
        }

        let mut outcome = self.batch.run(account, parsed.credentials, meta).await?;
        outcome.errors.extend(parsed.errors);
        Ok(outcome)
    }

    /// Render the account's credentials, secrets included, for download.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if a selected export names no ids or any
    /// id that is not the account's.
    pub async fn export(
        &self,
        account: AccountId,
        request: &ExportRequest,
        meta: &RequestMeta,
    ) -> Result<ExportOutput> {
        let mut credentials = match request.range {
            ExportRange::All => self.credentials.list_for_export(account, None).await?,
            ExportRange::Selected => {
                if request.ids.is_empty() {
                    return Err(Error::Validation(
                        "a selected export needs at least one id".to_string(),
                    ));
                }
                let wanted: Vec<CredentialId> = request
                    .ids
                    .iter()
                    .copied()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                let found = self
                    .credentials
                    .list_for_export(account, Some(&wanted))
                    .await?;
                if found.len() != wanted.len() {
                    return Err(Error::Validation(
                        "some selected credentials do not exist or are not accessible"
                            .to_string(),
                    ));
                }
                found
            }
        };

        export::sort_credentials(&mut credentials, request.sort_field, request.sort_direction);
        let content = export::render(&credentials, request.format);

        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::ExportEmails,
                    format!(
                        "Exported {} mailboxes ({:?}, {:?})",
                        credentials.len(),
                        request.range,
                        request.format
                    ),
                )
                .on_credential(None)
                .with_meta(meta),
            )
            .await;

        Ok(ExportOutput {
            content,
            count: credentials.len(),
            format: request.format,
        })
    }
}
