//! Error types for gateway operations.

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (connect failure, timeout, broken body).
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway answered with a non-success HTTP status.
    #[error("gateway returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response body could not be interpreted.
    #[error("malformed gateway response ({reason}): {body}")]
    Malformed {
        /// Why decoding failed.
        reason: String,
        /// Raw response body.
        body: String,
    },

    /// The gateway returned an empty message list where one message was expected.
    #[error("gateway returned no messages")]
    EmptyResult,

    /// The gateway acknowledged the request but reported an error in its payload.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    /// The configured base URL is not a valid URL.
    #[error("invalid gateway base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

impl Error {
    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
            body: body.into(),
        }
    }

    /// Returns true when the failure happened below HTTP (no response was received).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_carries_body() {
        let err = Error::Status {
            status: 401,
            body: "invalid_grant".to_string(),
        };
        assert_eq!(err.to_string(), "gateway returned status 401: invalid_grant");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_malformed_constructor() {
        let err = Error::malformed("expected object", "<html>");
        match err {
            Error::Malformed { reason, body } => {
                assert_eq!(reason, "expected object");
                assert_eq!(body, "<html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
