//! Dashboard figures.

use std::sync::Arc;

use axum::extract::State;
use mailvault_core::{Dashboard, Stats, StatsKind};
use serde::Deserialize;

use super::AppState;
use super::extract::{ApiQuery, AuthUser};
use super::response::{ApiResult, ok};

#[derive(Deserialize)]
pub struct StatsParams {
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub async fn overview(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Dashboard> {
    let dashboard = state.services.reports.dashboard(user.id).await?;
    ok("Dashboard loaded", dashboard)
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<StatsParams>,
) -> ApiResult<Stats> {
    let kind = params
        .kind
        .as_deref()
        .map(StatsKind::parse)
        .unwrap_or_default();
    let stats = state.services.reports.stats(user.id, kind).await?;
    ok("Statistics loaded", stats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::api::testing::TestServer;

    #[tokio::test]
    async fn test_dashboard_reflects_stored_credentials() {
        let server = TestServer::signed_in().await;
        server.add_credential("dash@outlook.com").await;

        let (status, body) = server.get("/api/dashboard").await;
        assert_eq!(status, 200);
        assert_eq!(body["data"]["total_emails"], 1);
        assert_eq!(body["data"]["operations_by_type"]["Added mailbox"], 1);
        assert_eq!(body["data"]["operations_by_type"]["Signed in"], 1);
    }

    #[tokio::test]
    async fn test_stats_kinds() {
        let server = TestServer::signed_in().await;
        server.add_credential("stats@outlook.com").await;

        let (_, body) = server.get("/api/dashboard/stats?type=emails").await;
        assert_eq!(body["data"]["total_emails"], 1);
        assert_eq!(
            body["data"]["recent_emails"][0]["email_address"],
            "stats@outlook.com"
        );

        let (_, body) = server.get("/api/dashboard/stats?type=operations").await;
        assert!(body["data"]["recent_operations"].is_array());

        let (_, body) = server.get("/api/dashboard/stats").await;
        assert!(body["data"]["last_updated"].is_string());
    }
}
