//! Session tokens for the single operator account.
//!
//! Signing in exchanges the deployment's shared access token for a signed,
//! short-lived session token. Every session acts as [`AccountId::OWNER`].

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::AccountId;
use crate::audit::{AuditLog, NewAuditEntry, OperationKind, RequestMeta};
use crate::{Error, Result};

const ISSUER: &str = "mailvault";
const SUBJECT: &str = "user-auth";
const OWNER_NAME: &str = "admin";

/// Sessions can be renewed once they are this close to expiry.
pub const REFRESH_WINDOW_MINUTES: i64 = 30;

/// Session configuration.
#[derive(Clone)]
pub struct SessionSettings {
    /// Shared access token operators sign in with.
    pub access_token: String,
    /// HMAC secret for session tokens.
    pub signing_secret: String,
    /// Session lifetime.
    pub lifetime: Duration,
}

impl SessionSettings {
    /// Create settings with a lifetime in hours.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        signing_secret: impl Into<String>,
        lifetime_hours: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            signing_secret: signing_secret.into(),
            lifetime: Duration::hours(lifetime_hours),
        }
    }
}

impl std::fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSettings")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// The signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    /// Account the session acts as.
    pub id: AccountId,
    /// Display name.
    pub username: String,
}

/// A freshly issued session.
#[derive(Debug, Serialize)]
pub struct Session {
    /// Bearer token.
    pub token: String,
    /// Expiry as Unix seconds.
    pub expires_at: i64,
    /// The signed-in operator.
    pub user: SessionUser,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: i64,
    username: String,
    exp: i64,
    iat: i64,
    nbf: i64,
    iss: String,
    sub: String,
}

/// Issues and checks session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    access_token: String,
    lifetime: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    audit: AuditLog,
}

impl SessionIssuer {
    /// Create an issuer.
    #[must_use]
    pub fn new(settings: &SessionSettings, audit: AuditLog) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        Self {
            access_token: settings.access_token.clone(),
            lifetime: settings.lifetime,
            encoding_key: EncodingKey::from_secret(settings.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.signing_secret.as_bytes()),
            validation,
            audit,
        }
    }

    /// Exchange the shared access token for a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] if `supplied` does not match the
    /// configured access token.
    pub async fn login(&self, supplied: &str, meta: &RequestMeta) -> Result<Session> {
        if !constant_time_eq(supplied.as_bytes(), self.access_token.as_bytes()) {
            warn!(ip = %meta.ip_address, "Rejected sign-in");
            self.audit
                .record_best_effort(
                    NewAuditEntry::new(
                        AccountId::ANONYMOUS,
                        OperationKind::LoginFailed,
                        "Wrong access token",
                    )
                    .with_meta(meta),
                )
                .await;
            return Err(Error::Unauthorized("wrong access token".to_string()));
        }

        let user = SessionUser {
            id: AccountId::OWNER,
            username: OWNER_NAME.to_string(),
        };
        let session = self.issue(user)?;

        self.audit
            .record_best_effort(
                NewAuditEntry::new(session.user.id, OperationKind::LoginSuccess, "Signed in")
                    .with_meta(meta),
            )
            .await;
        info!(ip = %meta.ip_address, "Operator signed in");
        Ok(session)
    }

    /// Check a session token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<SessionUser> {
        let claims = self.decode(token)?;
        Ok(SessionUser {
            id: AccountId::new(claims.user_id),
            username: claims.username,
        })
    }

    /// Replace a session that is about to expire.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] for an invalid token and [`Error::Unauthorized`]
    /// if it expires more than [`REFRESH_WINDOW_MINUTES`] from now.
    pub fn refresh(&self, token: &str) -> Result<Session> {
        let claims = self.decode(token)?;
        let remaining = claims.exp - Utc::now().timestamp();
        if remaining > REFRESH_WINDOW_MINUTES * 60 {
            return Err(Error::Unauthorized(
                "session is not yet eligible for refresh".to_string(),
            ));
        }

        debug!("Refreshing session of {}", claims.username);
        self.issue(SessionUser {
            id: AccountId::new(claims.user_id),
            username: claims.username,
        })
    }

    /// Record that the operator signed out. Tokens stay valid until they expire.
    pub async fn logout(&self, user: &SessionUser, meta: &RequestMeta) {
        self.audit
            .record_best_effort(
                NewAuditEntry::new(user.id, OperationKind::Logout, "Signed out").with_meta(meta),
            )
            .await;
    }

    fn issue(&self, user: SessionUser) -> Result<Session> {
        let now = Utc::now();
        let expires_at = (now + self.lifetime).timestamp();
        let claims = Claims {
            user_id: user.id.0,
            username: user.username.clone(),
            exp: expires_at,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            iss: ISSUER.to_string(),
            sub: SUBJECT.to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(Session {
            token,
            expires_at,
            user,
        })
    }

    fn decode(&self, token: &str) -> Result<Claims> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
