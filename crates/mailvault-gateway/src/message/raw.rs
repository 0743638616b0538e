//! Loosely typed wire record as the gateway sends it.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One message exactly as it appears in a gateway response.
///
/// Every field is optional on the wire. Missing or wrongly typed strings decode
/// to an empty string and missing or wrongly typed booleans decode to `false`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMessage {
    /// Remote message id.
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    /// Subject line.
    #[serde(deserialize_with = "lenient_string")]
    pub subject: String,
    /// Sender. The gateway calls this field `send`.
    #[serde(deserialize_with = "lenient_string")]
    pub send: String,
    /// Recipient.
    #[serde(deserialize_with = "lenient_string")]
    pub to: String,
    /// HTML body.
    #[serde(deserialize_with = "lenient_string")]
    pub html: String,
    /// Plain-text body.
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    /// Send date, RFC 3339.
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    /// Receive date, RFC 3339. Wins over `date` when parsable.
    #[serde(rename = "receivedDateTime", deserialize_with = "lenient_string")]
    pub received_date_time: String,
    /// Read flag.
    #[serde(rename = "isRead", deserialize_with = "lenient_bool")]
    pub is_read: bool,
    /// Verification code extracted by the gateway.
    #[serde(rename = "verifyCode", deserialize_with = "lenient_string")]
    pub verify_code: String,
}

/// Acknowledgement returned by the mailbox-clearing endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAck {
    /// Error reported by the gateway. Empty on success.
    #[serde(deserialize_with = "lenient_string")]
    pub error: String,
    /// Optional human-readable status.
    #[serde(deserialize_with = "lenient_string")]
    pub message: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}
