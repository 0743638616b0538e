//! Batch add properties, exercised through the public service API.

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailvault_core::service::MAX_BATCH_SIZE;
use mailvault_core::{
    AccountId, BatchSettings, Error, NewCredential, OperationKind, PageRequest, RequestMeta,
    Services, db,
};
use mailvault_gateway::{CanonicalMessage, MailGateway, Mailbox, MailboxCredentials};
use proptest::prelude::*;

/// Accepts every mailbox except the listed ones.
struct Gatekeeper {
    rejected: HashSet<String>,
}

impl Gatekeeper {
    fn rejecting(rejected: impl IntoIterator<Item = String>) -> Arc<Self> {
        Arc::new(Self {
            rejected: rejected.into_iter().collect(),
        })
    }
}

#[async_trait]
impl MailGateway for Gatekeeper {
    async fn fetch_latest(
        &self,
        creds: MailboxCredentials<'_>,
        _mailbox: Mailbox,
    ) -> mailvault_gateway::Result<CanonicalMessage> {
        tokio::task::yield_now().await;
        if self.rejected.contains(creds.email) {
            return Err(mailvault_gateway::Error::Status {
                status: 400,
                body: "AADSTS70000: invalid_grant".to_string(),
            });
        }
        Ok(CanonicalMessage {
            id: "1".to_string(),
            subject: "hello".to_string(),
            from: "sender@example.com".to_string(),
            to: creds.email.to_string(),
            body: String::new(),
            is_read: true,
            received_at: DateTime::<Utc>::UNIX_EPOCH,
            verification_code: None,
        })
    }

    async fn fetch_all(
        &self,
        _creds: MailboxCredentials<'_>,
        _mailbox: Mailbox,
    ) -> mailvault_gateway::Result<Vec<CanonicalMessage>> {
        Ok(Vec::new())
    }

    async fn clear(
        &self,
        _creds: MailboxCredentials<'_>,
        _mailbox: Mailbox,
    ) -> mailvault_gateway::Result<()> {
        Ok(())
    }
}

fn address(n: usize) -> String {
    format!("box{n}@outlook.com")
}

fn batch(n: usize) -> Vec<NewCredential> {
    (0..n)
        .map(|i| NewCredential::new(address(i), format!("pw{i}"), "client", format!("token{i}")))
        .collect()
}

async fn services(rejected: impl IntoIterator<Item = String>, workers: usize) -> Services {
    let pool = db::in_memory().await.unwrap();
    Services::new(pool, Gatekeeper::rejecting(rejected), BatchSettings::new(workers, false))
}

#[tokio::test]
async fn three_items_with_one_already_stored() {
    let services = services([], 5).await;
    let owner = AccountId::OWNER;
    let meta = RequestMeta::new("192.0.2.10", "integration-test");

    services
        .credentials
        .add(owner, batch(2).remove(1), &meta)
        .await
        .unwrap();
    services.audit.clear(owner).await.unwrap();

    let outcome = services
        .credentials
        .batch_add(owner, batch(3), &meta)
        .await
        .unwrap();

    assert_eq!(outcome.success_count(), 2);
    assert_eq!(outcome.errors, [format!("{}: already exists", address(1))]);

    let entries = services
        .audit
        .list(owner, PageRequest::new(None, Some(50)))
        .await
        .unwrap();
    let added = entries
        .iter()
        .filter(|e| e.kind == OperationKind::EmailAdded)
        .count();
    let summaries = entries
        .iter()
        .filter(|e| e.kind == OperationKind::BatchAddEmails)
        .count();
    assert_eq!((added, summaries), (2, 1));
}

#[tokio::test]
async fn oversized_batch_is_one_validation_error() {
    let services = services([], 5).await;
    let err = services
        .credentials
        .batch_add(AccountId::OWNER, batch(MAX_BATCH_SIZE + 1), &RequestMeta::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let page = services
        .credentials
        .list(AccountId::OWNER, &mailvault_core::ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn returned_credentials_do_not_serialize_secrets() {
    let services = services([], 5).await;
    let outcome = services
        .credentials
        .batch_add(AccountId::OWNER, batch(2), &RequestMeta::default())
        .await
        .unwrap();

    let json = serde_json::to_string(&outcome).unwrap();
    assert!(json.contains(&address(0)));
    assert!(!json.contains("token0"));
    assert!(!json.contains("pw1"));
    assert!(!json.contains("client"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_item_is_either_created_or_reported(
        n in 0usize..=MAX_BATCH_SIZE,
        workers in 1usize..8,
        rejected in prop::collection::hash_set(0usize..MAX_BATCH_SIZE, 0..10),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (created, errors) = runtime.block_on(async {
            let services = services(rejected.iter().map(|i| address(*i)), workers).await;
            let outcome = services
                .credentials
                .batch_add(AccountId::OWNER, batch(n), &RequestMeta::default())
                .await
                .unwrap();
            let created: Vec<String> =
                outcome.created.iter().map(|c| c.email_address.clone()).collect();
            (created, outcome.errors)
        });

        prop_assert_eq!(created.len() + errors.len(), n);

        let expected_created: Vec<String> = (0..n)
            .filter(|i| !rejected.contains(i))
            .map(address)
            .collect();
        prop_assert_eq!(created, expected_created);

        let expected_failed: Vec<String> = (0..n)
            .filter(|i| rejected.contains(i))
            .map(address)
            .collect();
        let failed: Vec<String> = errors
            .iter()
            .map(|e| e.split(": ").next().unwrap_or_default().to_string())
            .collect();
        prop_assert_eq!(failed, expected_failed);
    }
}
