//! # mailvault-gateway
//!
//! Client for the remote mail retrieval gateway that fronts Outlook mailboxes.
//!
//! The gateway exposes four POST endpoints that take a mailbox's refresh token,
//! client id and address and either return messages or clear a folder. Its
//! responses are loosely typed JSON; this crate turns them into
//! [`CanonicalMessage`] values with fixed fallback rules.
//!
//! ## Example
//!
//! ```ignore
//! use mailvault_gateway::{GatewayClient, GatewayConfig, MailGateway, Mailbox, MailboxCredentials};
//!
//! let client = GatewayClient::new(&GatewayConfig::new("https://gateway.example.com"))?;
//! let creds = MailboxCredentials {
//!     email: "someone@outlook.com",
//!     client_id: "client-id",
//!     refresh_token: "refresh-token",
//! };
//! let latest = client.fetch_latest(creds, Mailbox::Inbox).await?;
//! println!("{} from {}", latest.subject, latest.from);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod mailbox;
pub mod message;

pub use client::{DEFAULT_TIMEOUT, GatewayClient, GatewayConfig, MailGateway};
pub use error::{Error, Result};
pub use mailbox::{Mailbox, MailboxCredentials};
pub use message::CanonicalMessage;
