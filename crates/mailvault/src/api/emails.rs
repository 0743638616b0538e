//! Credential routes: CRUD, bulk operations, import/export and mail retrieval.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::{delete, get, post, put};
use mailvault_core::credential::{ExportOutput, ExportRequest};
use mailvault_core::{
    BatchOutcome, ClearOutcome, Credential, CredentialId, CredentialPage, ListQuery,
    NewCredential, TagId,
};
use mailvault_gateway::{CanonicalMessage, Mailbox};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery, AuthUser, ClientMeta};
use super::response::{ApiResult, done, ok};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/emails", get(list).post(add))
        .route("/emails/batch", post(batch_add).delete(batch_delete))
        .route("/emails/import", post(import))
        .route("/emails/export", post(export))
        .route("/emails/batch-clear-inbox", post(batch_clear_inbox))
        .route("/emails/{id}", get(show).put(update).delete(remove))
        .route("/emails/{id}/latest", get(latest))
        .route("/emails/{id}/all", get(all))
        .route("/emails/{id}/inbox", delete(clear))
        .route("/emails/{id}/tags", put(tag))
        .route("/emails/{id}/tags/{tag_id}", delete(untag))
}

#[derive(Deserialize)]
pub struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
    keyword: Option<String>,
}

#[derive(Deserialize)]
pub struct MailboxParams {
    mailbox: Option<String>,
}

impl MailboxParams {
    fn mailbox(&self) -> Mailbox {
        self.mailbox.as_deref().map(Mailbox::parse).unwrap_or_default()
    }
}

#[derive(Deserialize)]
pub struct BatchAddRequest {
    emails: Vec<NewCredential>,
}

#[derive(Deserialize)]
pub struct IdsRequest {
    email_ids: Vec<CredentialId>,
}

impl IdsRequest {
    fn ids(&self) -> Result<&[CredentialId], ApiError> {
        if self.email_ids.is_empty() {
            return Err(ApiError::BadRequest("email_ids cannot be empty".to_string()));
        }
        Ok(&self.email_ids)
    }
}

#[derive(Deserialize)]
pub struct TagRequest {
    tag_id: TagId,
}

/// Outcome of a bulk add or import.
#[derive(Serialize)]
pub struct BatchReport {
    success_emails: Vec<Credential>,
    errors: Vec<String>,
    success_count: usize,
    error_count: usize,
}

impl From<BatchOutcome> for BatchReport {
    fn from(outcome: BatchOutcome) -> Self {
        Self {
            success_count: outcome.success_count(),
            error_count: outcome.error_count(),
            success_emails: outcome.created,
            errors: outcome.errors,
        }
    }
}

#[derive(Serialize)]
pub struct ClearReport {
    success_count: usize,
    error_count: usize,
    errors: Vec<String>,
}

impl From<ClearOutcome> for ClearReport {
    fn from(outcome: ClearOutcome) -> Self {
        Self {
            success_count: outcome.success_count,
            error_count: outcome.errors.len(),
            errors: outcome.errors,
        }
    }
}

#[derive(Serialize)]
pub struct Deleted {
    deleted_count: u64,
}

#[derive(Serialize)]
pub struct Messages {
    mailbox: Mailbox,
    count: usize,
    messages: Vec<CanonicalMessage>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiQuery(params): ApiQuery<ListParams>,
) -> ApiResult<CredentialPage> {
    let query = ListQuery::new(params.limit, params.offset, params.keyword);
    let page = state.services.credentials.list(user.id, &query).await?;
    ok("Mailboxes loaded", page)
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(input): ApiJson<NewCredential>,
) -> ApiResult<Credential> {
    let credential = state.services.credentials.add(user.id, input, &meta).await?;
    ok("Mailbox added", credential)
}

pub async fn show(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiPath(id): ApiPath<CredentialId>,
) -> ApiResult<Credential> {
    let credential = state.services.credentials.get(user.id, id).await?;
    ok("Mailbox loaded", credential)
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<CredentialId>,
    ApiJson(input): ApiJson<NewCredential>,
) -> ApiResult<Credential> {
    let credential = state
        .services
        .credentials
        .update(user.id, id, input, &meta)
        .await?;
    ok("Mailbox updated", credential)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<CredentialId>,
) -> ApiResult<()> {
    state.services.credentials.delete(user.id, id, &meta).await?;
    done("Mailbox deleted")
}

pub async fn batch_add(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<BatchAddRequest>,
) -> ApiResult<BatchReport> {
    let outcome = state
        .services
        .credentials
        .batch_add(user.id, request.emails, &meta)
        .await?;
    ok("Batch add finished", outcome.into())
}

/// Import credentials from a text body, one record per line.
pub async fn import(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    body: String,
) -> ApiResult<BatchReport> {
    let outcome = state
        .services
        .credentials
        .import(user.id, &body, &meta)
        .await?;
    ok("Import finished", outcome.into())
}

pub async fn export(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<ExportRequest>,
) -> ApiResult<ExportOutput> {
    let output = state
        .services
        .credentials
        .export(user.id, &request, &meta)
        .await?;
    ok(format!("Exported {} mailboxes", output.count), output)
}

pub async fn batch_delete(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<IdsRequest>,
) -> ApiResult<Deleted> {
    let deleted_count = state
        .services
        .credentials
        .delete_many(user.id, request.ids()?, &meta)
        .await?;
    ok(
        format!("Deleted {deleted_count} mailboxes"),
        Deleted { deleted_count },
    )
}

pub async fn batch_clear_inbox(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<IdsRequest>,
) -> ApiResult<ClearReport> {
    let report = ClearReport::from(
        state
            .services
            .mail
            .batch_clear_inbox(user.id, request.ids()?, &meta)
            .await,
    );
    ok(
        format!(
            "Batch clear finished: {} succeeded, {} failed",
            report.success_count, report.error_count
        ),
        report,
    )
}

pub async fn latest(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<CredentialId>,
    ApiQuery(params): ApiQuery<MailboxParams>,
) -> ApiResult<CanonicalMessage> {
    let message = state
        .services
        .mail
        .fetch_latest(user.id, id, params.mailbox(), &meta)
        .await?;
    ok("Latest message loaded", message)
}

pub async fn all(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<CredentialId>,
    ApiQuery(params): ApiQuery<MailboxParams>,
) -> ApiResult<Messages> {
    let mailbox = params.mailbox();
    let messages = state
        .services
        .mail
        .fetch_all(user.id, id, mailbox, &meta)
        .await?;
    ok(
        "Messages loaded",
        Messages {
            mailbox,
            count: messages.len(),
            messages,
        },
    )
}

pub async fn clear(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<CredentialId>,
    ApiQuery(params): ApiQuery<MailboxParams>,
) -> ApiResult<()> {
    let mailbox = params.mailbox();
    state
        .services
        .mail
        .clear(user.id, id, mailbox, &meta)
        .await?;
    done(format!("{mailbox} cleared"))
}

pub async fn tag(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<CredentialId>,
    ApiJson(request): ApiJson<TagRequest>,
) -> ApiResult<()> {
    state
        .services
        .tags
        .tag_one(user.id, id, request.tag_id, &meta)
        .await?;
    done("Tag added")
}

pub async fn untag(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath((id, tag_id)): ApiPath<(CredentialId, TagId)>,
) -> ApiResult<()> {
    let removed = state
        .services
        .tags
        .untag_one(user.id, id, tag_id, &meta)
        .await?;
    done(if removed {
        "Tag removed"
    } else {
        "Tag was not attached"
    })
}
