//! Operation log.

use std::sync::Arc;

use axum::extract::State;
use mailvault_core::{AuditEntry, PageRequest};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::extract::{ApiQuery, AuthUser, ClientMeta};
use super::response::{ApiResult, ok};

#[derive(Deserialize)]
pub struct LogParams {
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct LogPage {
    logs: Vec<AuditEntry>,
    total: i64,
    page: i64,
    page_size: i64,
    total_pages: i64,
}

#[derive(Serialize)]
pub struct Cleared {
    removed: u64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<LogParams>,
) -> ApiResult<LogPage> {
    let page = PageRequest::new(params.page, params.page_size);
    let logs = state.services.audit.list(user.id, page).await?;
    let total = state.services.audit.count(user.id).await?;

    ok(
        "Operation log loaded",
        LogPage {
            logs,
            total,
            page: page.page,
            page_size: page.page_size,
            total_pages: (total + page.page_size - 1) / page.page_size,
        },
    )
}

pub async fn clear(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
) -> ApiResult<Cleared> {
    let removed = state.services.audit.reset(user.id, &meta).await?;
    ok("Operation log cleared", Cleared { removed })
}
