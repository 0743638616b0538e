//! In-process gateway double for service tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mailvault_gateway::{CanonicalMessage, Error, MailGateway, Mailbox, MailboxCredentials, Result};

/// Answers every call locally. Chosen addresses fail with a 400 status.
#[derive(Default)]
pub(crate) struct ScriptedGateway {
    failing: HashSet<String>,
    stagger_ms: u64,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    cleared: Mutex<Vec<(String, Mailbox)>>,
}

impl ScriptedGateway {
    pub(crate) fn failing_for(addresses: &[&str]) -> Self {
        Self {
            failing: addresses.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Delay each call so that `userN@...` finishes before `userM@...` for N > M.
    pub(crate) fn staggered(mut self, stagger_ms: u64) -> Self {
        self.stagger_ms = stagger_ms;
        self
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn cleared(&self) -> Vec<(String, Mailbox)> {
        self.cleared.lock().map(|c| c.clone()).unwrap_or_default()
    }

    async fn answer(&self, email: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if self.stagger_ms > 0 {
            let n: u64 = email
                .trim_start_matches("user")
                .split('@')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            let delay = self.stagger_ms * 40u64.saturating_sub(n);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(email) {
            return Err(Error::Status {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn message(to: &str, id: &str) -> CanonicalMessage {
    CanonicalMessage {
        id: id.to_string(),
        subject: format!("Your code for {to}"),
        from: "noreply@example.com".to_string(),
        to: to.to_string(),
        body: "<p>123456</p>".to_string(),
        is_read: false,
        received_at: DateTime::<Utc>::UNIX_EPOCH,
        verification_code: Some("123456".to_string()),
    }
}

#[async_trait]
impl MailGateway for ScriptedGateway {
    async fn fetch_latest(
        &self,
        creds: MailboxCredentials<'_>,
        _mailbox: Mailbox,
    ) -> Result<CanonicalMessage> {
        self.answer(creds.email).await?;
        Ok(message(creds.email, "latest"))
    }

    async fn fetch_all(
        &self,
        creds: MailboxCredentials<'_>,
        _mailbox: Mailbox,
    ) -> Result<Vec<CanonicalMessage>> {
        self.answer(creds.email).await?;
        Ok(vec![message(creds.email, "1"), message(creds.email, "2")])
    }

    async fn clear(&self, creds: MailboxCredentials<'_>, mailbox: Mailbox) -> Result<()> {
        self.answer(creds.email).await?;
        if let Ok(mut cleared) = self.cleared.lock() {
            cleared.push((creds.email.to_string(), mailbox));
        }
        Ok(())
    }
}
