//! Canonical message model and response decoding.
//!
//! The gateway's JSON is loosely typed. Decoding happens in two steps: the body
//! is read into [`RawMessage`] records with lenient field handling, then each
//! record is normalized into a [`CanonicalMessage`].

mod raw;

pub use raw::{RawAck, RawMessage};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// A message normalized from the gateway's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalMessage {
    /// Remote message id.
    pub id: String,
    /// Subject line.
    pub subject: String,
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Body, HTML when the gateway supplied it, plain text otherwise.
    pub body: String,
    /// Whether the message has been read.
    pub is_read: bool,
    /// Receive time. The Unix epoch when the gateway sent no usable timestamp.
    pub received_at: DateTime<Utc>,
    /// Verification code, when the gateway extracted one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_code: Option<String>,
}

impl From<RawMessage> for CanonicalMessage {
    fn from(raw: RawMessage) -> Self {
        let received_at = parse_timestamp(&raw.received_date_time)
            .or_else(|| parse_timestamp(&raw.date))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let body = if raw.html.is_empty() {
            raw.text
        } else {
            raw.html
        };
        let verification_code = Some(raw.verify_code).filter(|code| !code.is_empty());

        Self {
            id: raw.id,
            subject: raw.subject,
            from: raw.send,
            to: raw.to,
            body,
            is_read: raw.is_read,
            received_at,
            verification_code,
        }
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_body(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| Error::malformed(e.to_string(), body))
}

fn decode_record(value: Value, body: &str) -> Result<CanonicalMessage> {
    serde_json::from_value::<RawMessage>(value)
        .map(CanonicalMessage::from)
        .map_err(|e| Error::malformed(e.to_string(), body))
}

/// Decodes a fetch-latest response.
///
/// A single object is the message. An array yields its first element.
///
/// # Errors
///
/// Returns [`Error::EmptyResult`] for an empty array and [`Error::Malformed`]
/// when the body is neither an object nor an array of objects.
pub fn decode_latest(body: &str) -> Result<CanonicalMessage> {
    match parse_body(body)? {
        value @ Value::Object(_) => decode_record(value, body),
        Value::Array(items) => {
            let first = items.into_iter().next().ok_or(Error::EmptyResult)?;
            decode_record(first, body)
        }
        _ => Err(Error::malformed("expected a message object or array", body)),
    }
}

/// Decodes a fetch-all response. The body must be an array, possibly empty.
///
/// # Errors
///
/// Returns [`Error::Malformed`] when the body is not an array of objects.
pub fn decode_all(body: &str) -> Result<Vec<CanonicalMessage>> {
    match parse_body(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| decode_record(item, body))
            .collect(),
        _ => Err(Error::malformed("expected a message array", body)),
    }
}

/// Decodes a clear-mailbox acknowledgement.
///
/// # Errors
///
/// Returns [`Error::Rejected`] when the acknowledgement carries a non-empty
/// `error`, and [`Error::Malformed`] when the body is not an object.
pub fn decode_ack(body: &str) -> Result<()> {
    let value = parse_body(body)?;
    if !value.is_object() {
        return Err(Error::malformed("expected an acknowledgement object", body));
    }
    let ack: RawAck =
        serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string(), body))?;
    if ack.error.is_empty() {
        Ok(())
    } else {
        Err(Error::Rejected(ack.error))
    }
}
