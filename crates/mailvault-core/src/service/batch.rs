//! Concurrent validation and bulk insertion of credentials.
//!
//! A batch is checked item by item on a bounded pool of worker tasks, then
//! every item that passed is stored in one transaction. Per-item failures are
//! reported back in input order; they never abort the batch.

use std::collections::HashSet;
use std::sync::Arc;

use mailvault_gateway::MailGateway;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::account::AccountId;
use crate::audit::{AuditLog, NewAuditEntry, OperationKind, RequestMeta};
use crate::credential::{
    Credential, CredentialRepository, NewCredential, describe, validate_new_credential,
};
use crate::{Error, Result};

/// Largest number of credentials accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 30;

/// Worker count used when none is configured.
pub const DEFAULT_WORKERS: usize = 5;

/// Batch behavior settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Upper bound on concurrent gateway checks.
    pub workers: usize,
    /// Store credentials without proving them against the gateway.
    pub skip_validation: bool,
}

impl BatchSettings {
    /// Create settings. A worker count of zero selects [`DEFAULT_WORKERS`].
    #[must_use]
    pub const fn new(workers: usize, skip_validation: bool) -> Self {
        Self {
            workers: if workers == 0 { DEFAULT_WORKERS } else { workers },
            skip_validation,
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, false)
    }
}

/// Result of a batch.
#[derive(Debug, Default, Serialize)]
pub struct BatchOutcome {
    /// Stored credentials, in input order.
    pub created: Vec<Credential>,
    /// One message per rejected item, in input order.
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Number of stored credentials.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.created.len()
    }

    /// Number of rejected items.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

type ItemResult = std::result::Result<(), String>;

/// Checks a single item. Cloned into every worker.
#[derive(Clone)]
struct ItemChecker {
    credentials: CredentialRepository,
    gateway: Arc<dyn MailGateway>,
    skip_validation: bool,
}

impl ItemChecker {
    async fn check(&self, account: AccountId, item: &NewCredential) -> ItemResult {
        let address = &item.email_address;

        if let Err(problems) = validate_new_credential(item) {
            return Err(format!("{address}: {}", describe(&problems)));
        }

        match self.credentials.exists(account, address).await {
            Ok(false) => {}
            Ok(true) => return Err(format!("{address}: already exists")),
            Err(e) => return Err(format!("{address}: duplicate check failed: {e}")),
        }

        if self.skip_validation {
            return Ok(());
        }

        self.gateway
            .validate(item.mailbox_credentials())
            .await
            .map_err(|e| format!("{address}: {e}"))
    }
}

/// Validates and stores batches of credentials.
#[derive(Clone)]
pub struct BatchValidator {
    checker: ItemChecker,
    credentials: CredentialRepository,
    audit: AuditLog,
    workers: usize,
}

impl BatchValidator {
    /// Create a validator.
    #[must_use]
    pub fn new(
        credentials: CredentialRepository,
        audit: AuditLog,
        gateway: Arc<dyn MailGateway>,
        settings: BatchSettings,
    ) -> Self {
        Self {
            checker: ItemChecker {
                credentials: credentials.clone(),
                gateway,
                skip_validation: settings.skip_validation,
            },
            credentials,
            audit,
            workers: settings.workers.max(1),
        }
    }

    /// Validate `items` and store the ones that pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the batch has more than
    /// [`MAX_BATCH_SIZE`] items, and [`Error::Database`] if storing the
    /// validated items fails, in which case nothing is stored.
    pub async fn run(
        &self,
        account: AccountId,
        items: Vec<NewCredential>,
        meta: &RequestMeta,
    ) -> Result<BatchOutcome> {
        if items.len() > MAX_BATCH_SIZE {
            return Err(Error::Validation(format!(
                "at most {MAX_BATCH_SIZE} credentials per batch, got {}",
                items.len()
            )));
        }
        if items.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let items: Arc<Vec<NewCredential>> =
            Arc::new(items.into_iter().map(NewCredential::trimmed).collect());
        let results = self.check_all(account, Arc::clone(&items)).await;

        let mut valid = Vec::new();
        let mut errors = Vec::new();
        for (item, result) in items.iter().zip(results) {
            match result {
                Ok(()) => valid.push(item.clone()),
                Err(message) => errors.push(message),
            }
        }

        let created = if valid.is_empty() {
            Vec::new()
        } else {
            self.credentials.create_many(account, &valid).await?
        };

        for credential in &created {
            self.audit
                .record_best_effort(
                    NewAuditEntry::new(
                        account,
                        OperationKind::EmailAdded,
                        format!("Added mailbox {} (batch)", credential.email_address),
                    )
                    .on_credential(Some(credential.id.0))
                    .with_meta(meta),
                )
                .await;
        }
        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::BatchAddEmails,
                    format!(
                        "Batch add finished: {} succeeded, {} failed",
                        created.len(),
                        errors.len()
                    ),
                )
                .on_credential(None)
                .with_meta(meta),
            )
            .await;

        info!(
            account = %account,
            created = created.len(),
            failed = errors.len(),
            "Batch add finished"
        );
        Ok(BatchOutcome { created, errors })
    }

    /// Check every item on at most `min(n, workers)` tasks. Results are in input order.
    async fn check_all(
        &self,
        account: AccountId,
        items: Arc<Vec<NewCredential>>,
    ) -> Vec<ItemResult> {
        let n = items.len();
        let mut results: Vec<Option<ItemResult>> = (0..n).map(|_| None).collect();

        // Repeats of an address within the batch would fail the insert transaction.
        let mut seen = HashSet::new();
        let (task_tx, task_rx) = mpsc::channel::<usize>(n);
        for (index, item) in items.iter().enumerate() {
            if seen.insert(item.email_address.to_ascii_lowercase()) {
                if task_tx.send(index).await.is_err() {
                    break;
                }
            } else {
                results[index] = Some(Err(format!(
                    "{}: listed more than once in this batch",
                    item.email_address
                )));
            }
        }
        drop(task_tx);

        let worker_count = self.workers.min(n);
        debug!("Checking {n} credentials on {worker_count} workers");

        let task_rx = Arc::new(Mutex::new(task_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, ItemResult)>(n);
        let mut workers = JoinSet::new();
        for _ in 0..worker_count {
            let task_rx = Arc::clone(&task_rx);
            let result_tx = result_tx.clone();
            let checker = self.checker.clone();
            let items = Arc::clone(&items);
            workers.spawn(async move {
                loop {
                    let next = task_rx.lock().await.recv().await;
                    let Some(index) = next else { break };
                    let result = checker.check(account, &items[index]).await;
                    if result_tx.send((index, result)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        while let Some((index, result)) = result_rx.recv().await {
            results[index] = Some(result);
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Validation worker failed: {e}");
            }
        }

        results
            .into_iter()
            .zip(items.iter())
            .map(|(result, item)| {
                result.unwrap_or_else(|| {
                    Err(format!("{}: validation did not complete", item.email_address))
                })
            })
            .collect()
    }
}
