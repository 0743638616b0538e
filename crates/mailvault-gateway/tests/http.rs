//! End-to-end tests against a throwaway local gateway.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use mailvault_gateway::{
    Error, GatewayClient, GatewayConfig, MailGateway, Mailbox, MailboxCredentials,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Seen = Arc<Mutex<Vec<(String, Value)>>>;

const CREDS: MailboxCredentials<'static> = MailboxCredentials {
    email: "user@outlook.com",
    client_id: "client-1",
    refresh_token: "refresh-1",
};

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str) -> GatewayClient {
    GatewayClient::new(&GatewayConfig::new(base)).unwrap()
}

fn recording_gateway(seen: Seen) -> Router {
    Router::new()
        .route(
            "/api/mail-new",
            post(
                |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(headers.get("accept").unwrap(), "*/*");
                    seen.lock().unwrap().push(("mail-new".to_string(), body));
                    Json(json!([
                        {"id": "m2", "subject": "Your code", "send": "noreply@x.com",
                         "html": "<b>123</b>", "text": "123", "verifyCode": "123"},
                        {"id": "m1"}
                    ]))
                },
            ),
        )
        .route(
            "/api/mail-all",
            post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(("mail-all".to_string(), body));
                Json(json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]))
            }),
        )
        .route(
            "/api/process-inbox",
            post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(("process-inbox".to_string(), body));
                Json(json!({"message": "inbox cleared"}))
            }),
        )
        .route(
            "/api/process-junk",
            post(|State(seen): State<Seen>, Json(body): Json<Value>| async move {
                seen.lock().unwrap().push(("process-junk".to_string(), body));
                Json(json!({"error": "junk folder locked"}))
            }),
        )
        .with_state(seen)
}

#[tokio::test]
async fn test_fetch_latest_posts_credentials() {
    let seen = Seen::default();
    let base = spawn(recording_gateway(Arc::clone(&seen))).await;

    let msg = client(&base).fetch_latest(CREDS, Mailbox::Junk).await.unwrap();
    assert_eq!(msg.id, "m2");
    assert_eq!(msg.body, "<b>123</b>");
    assert_eq!(msg.from, "noreply@x.com");
    assert_eq!(msg.verification_code.as_deref(), Some("123"));

    let seen = seen.lock().unwrap();
    let (endpoint, body) = &seen[0];
    assert_eq!(endpoint, "mail-new");
    assert_eq!(
        body,
        &json!({
            "refresh_token": "refresh-1",
            "client_id": "client-1",
            "email": "user@outlook.com",
            "mailbox": "Junk",
            "response_type": "json"
        })
    );
}

#[tokio::test]
async fn test_fetch_all_and_clear() {
    let seen = Seen::default();
    let base = spawn(recording_gateway(Arc::clone(&seen))).await;
    let gateway = client(&base);

    let all = gateway.fetch_all(CREDS, Mailbox::Inbox).await.unwrap();
    assert_eq!(all.len(), 3);

    gateway.clear(CREDS, Mailbox::Inbox).await.unwrap();

    match gateway.clear(CREDS, Mailbox::Junk).await {
        Err(Error::Rejected(reason)) => assert_eq!(reason, "junk folder locked"),
        other => panic!("unexpected: {other:?}"),
    }

    let seen = seen.lock().unwrap();
    let endpoints: Vec<&str> = seen.iter().map(|(e, _)| e.as_str()).collect();
    assert_eq!(endpoints, ["mail-all", "process-inbox", "process-junk"]);
    assert_eq!(seen[0].1["mailbox"], "INBOX");
    assert!(seen[1].1.get("mailbox").is_none());
}

#[tokio::test]
async fn test_validate_uses_inbox() {
    let seen = Seen::default();
    let base = spawn(recording_gateway(Arc::clone(&seen))).await;

    client(&base).validate(CREDS).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].1["mailbox"], "INBOX");
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let router = Router::new().route(
        "/api/mail-new",
        post(|| async { (StatusCode::UNAUTHORIZED, "refresh token expired") }),
    );
    let base = spawn(router).await;

    match client(&base).fetch_latest(CREDS, Mailbox::Inbox).await {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "refresh token expired");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_mailbox() {
    let router = Router::new().route("/api/mail-new", post(|| async { Json(json!([])) }));
    let base = spawn(router).await;

    let result = client(&base).fetch_latest(CREDS, Mailbox::Inbox).await;
    assert!(matches!(result, Err(Error::EmptyResult)));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let router = Router::new().route(
        "/api/mail-all",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let base = spawn(router).await;
    let gateway = GatewayClient::new(
        &GatewayConfig::new(base).with_timeout(Duration::from_millis(200)),
    )
    .unwrap();

    let err = gateway.fetch_all(CREDS, Mailbox::Inbox).await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got {err:?}");
}
