//! Sign-in, sign-out and session renewal.

use std::sync::Arc;

use axum::extract::State;
use mailvault_core::Session;
use serde::Deserialize;

use super::AppState;
use super::extract::{ApiJson, AuthUser, BearerToken, ClientMeta};
use super::response::{ApiResult, done, ok};

#[derive(Deserialize)]
pub struct LoginRequest {
    auth_token: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Session> {
    let session = state.sessions.login(&request.auth_token, &meta).await?;
    ok("Signed in", session)
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
) -> ApiResult<()> {
    state.sessions.logout(&user, &meta).await;
    done("Signed out")
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> ApiResult<Session> {
    let session = state.sessions.refresh(&token)?;
    ok("Session renewed", session)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use crate::api::testing::{ACCESS_TOKEN, TestServer};

    #[tokio::test]
    async fn test_login_with_wrong_token() {
        let server = TestServer::start(&[]).await;
        let (status, body) = server
            .post("/api/auth/login", json!({"auth_token": "guess"}))
            .await;
        assert_eq!(status, 401);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_login_logout_are_audited() {
        let mut server = TestServer::start(&[]).await;
        let (status, body) = server
            .post("/api/auth/login", json!({"auth_token": ACCESS_TOKEN}))
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["user"]["username"], "admin");
        server.token = Some(body["data"]["token"].as_str().unwrap().to_string());

        let (status, _) = server.post("/api/auth/logout", json!({})).await;
        assert_eq!(status, 200);

        let (_, body) = server.get("/api/logs?page_size=10").await;
        let kinds: Vec<&str> = body["data"]["logs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["logout", "login_success"]);
        assert_eq!(body["data"]["logs"][0]["ip_address"], "203.0.113.9");
    }

    #[tokio::test]
    async fn test_fresh_session_is_not_renewed() {
        let server = TestServer::signed_in().await;
        let (status, body) = server.post("/api/auth/refresh", json!({})).await;
        assert_eq!(status, 401);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_forged_token_is_rejected() {
        let mut server = TestServer::start(&[]).await;
        server.token = Some("not.a.token".to_string());
        let (status, _) = server.get("/api/dashboard").await;
        assert_eq!(status, 401);
    }
}
