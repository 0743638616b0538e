//! HTTP client for the remote mail gateway.

use crate::error::{Error, Result};
use crate::mailbox::{Mailbox, MailboxCredentials};
use crate::message::{self, CanonicalMessage};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Mail operations the rest of the system needs from the gateway.
///
/// Implemented by [`GatewayClient`]; services hold an `Arc<dyn MailGateway>` so
/// tests can substitute an in-process fake.
#[async_trait]
pub trait MailGateway: Send + Sync {
    /// Fetches the newest message in `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyResult`] when the mailbox is empty, and a transport,
    /// status or decoding error otherwise.
    async fn fetch_latest(
        &self,
        creds: MailboxCredentials<'_>,
        mailbox: Mailbox,
    ) -> Result<CanonicalMessage>;

    /// Fetches every message in `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns a transport, status or decoding error.
    async fn fetch_all(
        &self,
        creds: MailboxCredentials<'_>,
        mailbox: Mailbox,
    ) -> Result<Vec<CanonicalMessage>>;

    /// Empties `mailbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] when the gateway reports a failure in its
    /// acknowledgement, and a transport, status or decoding error otherwise.
    async fn clear(&self, creds: MailboxCredentials<'_>, mailbox: Mailbox) -> Result<()>;

    /// Proves the credentials work by fetching the newest inbox message.
    ///
    /// # Errors
    ///
    /// Returns whatever [`MailGateway::fetch_latest`] returns.
    async fn validate(&self, creds: MailboxCredentials<'_>) -> Result<()> {
        self.fetch_latest(creds, Mailbox::Inbox).await.map(|_| ())
    }
}

/// Gateway connection settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway, e.g. `https://mail-api.example.com`.
    pub base_url: String,
    /// Per-call timeout.
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Creates settings with the default timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    refresh_token: &'a str,
    client_id: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mailbox: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_type: Option<&'a str>,
}

impl<'a> GatewayRequest<'a> {
    const fn new(creds: MailboxCredentials<'a>) -> Self {
        Self {
            refresh_token: creds.refresh_token,
            client_id: creds.client_id,
            email: creds.email,
            mailbox: None,
            response_type: None,
        }
    }

    const fn with_mailbox(mut self, mailbox: Mailbox) -> Self {
        self.mailbox = Some(mailbox.as_str());
        self
    }
}

/// Client for the gateway's JSON-over-HTTP API.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: Url,
    http_client: Client,
}

impl GatewayClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let mut base_url = Url::parse(config.base_url.trim())?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post(&self, path: &str, request: &GatewayRequest<'_>) -> Result<String> {
        let url = self.base_url.join(path)?;
        debug!(endpoint = %url, email = request.email, "calling mail gateway");

        let response = self
            .http_client
            .post(url)
            .header(ACCEPT, "*/*")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "mail gateway returned an error status");
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl MailGateway for GatewayClient {
    async fn fetch_latest(
        &self,
        creds: MailboxCredentials<'_>,
        mailbox: Mailbox,
    ) -> Result<CanonicalMessage> {
        let mut request = GatewayRequest::new(creds).with_mailbox(mailbox);
        request.response_type = Some("json");
        let body = self.post("api/mail-new", &request).await?;
        message::decode_latest(&body)
    }

    async fn fetch_all(
        &self,
        creds: MailboxCredentials<'_>,
        mailbox: Mailbox,
    ) -> Result<Vec<CanonicalMessage>> {
        let request = GatewayRequest::new(creds).with_mailbox(mailbox);
        let body = self.post("api/mail-all", &request).await?;
        message::decode_all(&body)
    }

    async fn clear(&self, creds: MailboxCredentials<'_>, mailbox: Mailbox) -> Result<()> {
        let request = GatewayRequest::new(creds);
        let body = self.post(mailbox.clear_path(), &request).await?;
        message::decode_ack(&body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = GatewayClient::new(&GatewayConfig::new("https://gw.example.com/outlook")).unwrap();
        assert_eq!(client.base_url().as_str(), "https://gw.example.com/outlook/");
        assert_eq!(
            client.base_url().join("api/mail-new").unwrap().as_str(),
            "https://gw.example.com/outlook/api/mail-new"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GatewayClient::new(&GatewayConfig::new("not a url"));
        assert!(matches!(result, Err(Error::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let creds = MailboxCredentials {
            email: "a@outlook.com",
            client_id: "cid",
            refresh_token: "rt",
        };
        let clear = serde_json::to_value(GatewayRequest::new(creds)).unwrap();
        assert_eq!(
            clear,
            serde_json::json!({"refresh_token": "rt", "client_id": "cid", "email": "a@outlook.com"})
        );

        let fetch = serde_json::to_value(GatewayRequest::new(creds).with_mailbox(Mailbox::Junk)).unwrap();
        assert_eq!(fetch["mailbox"], "Junk");
        assert!(fetch.get("response_type").is_none());
    }

    #[test]
    fn test_config_timeout() {
        let config = GatewayConfig::new("http://localhost").with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(GatewayConfig::new("http://x").timeout, DEFAULT_TIMEOUT);
    }
}
