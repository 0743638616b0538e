//! HTTP API.
//!
//! Every route lives under `/api` and answers with the JSON envelope of
//! [`response::ApiResponse`]. Apart from the health check and sign-in, routes
//! require a bearer session token.

mod auth;
mod dashboard;
mod emails;
mod error;
mod extract;
mod logs;
mod response;
mod tags;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use mailvault_core::{SessionIssuer, Services};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use error::ApiError;
use response::{ApiResult, ok};

/// State shared by every handler.
pub struct AppState {
    /// Business services.
    pub services: Services,
    /// Session issuance and verification.
    pub sessions: SessionIssuer,
}

impl AppState {
    /// Wrap services for the router.
    #[must_use]
    pub fn new(services: Services, sessions: SessionIssuer) -> Arc<Self> {
        Arc::new(Self { services, sessions })
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/refresh", post(auth::refresh))
        .route("/dashboard", get(dashboard::overview))
        .route("/dashboard/stats", get(dashboard::stats))
        .route("/logs", get(logs::list).delete(logs::clear))
        .merge(emails::routes())
        .merge(tags::routes());

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors(allowed_origins))
        .with_state(state)
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> ApiResult<Health> {
    ok(
        "mailvault is running",
        Health {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
