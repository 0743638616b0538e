//! Tag routes.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post, put};
use mailvault_core::{CredentialId, NewTag, Tag, TagId, TagUpdate};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::extract::{ApiJson, ApiPath, AuthUser, ClientMeta};
use super::response::{ApiResult, done, ok};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tags", get(list).post(create))
        .route("/tags/{id}", put(update).delete(remove))
        .route("/tags/batch-tag", post(batch_tag))
        .route("/tags/batch-untag", post(batch_untag))
}

#[derive(Deserialize)]
pub struct BatchTagRequest {
    email_ids: Vec<CredentialId>,
    tag_id: TagId,
}

#[derive(Serialize)]
pub struct Tagged {
    tag_id: TagId,
    tagged_count: usize,
}

#[derive(Serialize)]
pub struct Untagged {
    tag_id: TagId,
    untagged_count: u64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    AuthUser(_): AuthUser,
) -> ApiResult<Vec<Tag>> {
    let tags = state.services.tags.list().await?;
    ok("Tags loaded", tags)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(input): ApiJson<NewTag>,
) -> ApiResult<Tag> {
    let tag = state.services.tags.create(user.id, &input, &meta).await?;
    ok("Tag created", tag)
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<TagId>,
    ApiJson(update): ApiJson<TagUpdate>,
) -> ApiResult<Tag> {
    let tag = state
        .services
        .tags
        .update(user.id, id, update, &meta)
        .await?;
    ok("Tag updated", tag)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiPath(id): ApiPath<TagId>,
) -> ApiResult<()> {
    state.services.tags.delete(user.id, id, &meta).await?;
    done("Tag deleted")
}

pub async fn batch_tag(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<BatchTagRequest>,
) -> ApiResult<Tagged> {
    let tagged_count = state
        .services
        .tags
        .batch_tag(user.id, &request.email_ids, request.tag_id, &meta)
        .await?;
    ok(
        format!("Tagged {tagged_count} mailboxes"),
        Tagged {
            tag_id: request.tag_id,
            tagged_count,
        },
    )
}

pub async fn batch_untag(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ClientMeta(meta): ClientMeta,
    ApiJson(request): ApiJson<BatchTagRequest>,
) -> ApiResult<Untagged> {
    let untagged_count = state
        .services
        .tags
        .batch_untag(user.id, &request.email_ids, request.tag_id, &meta)
        .await?;
    ok(
        format!("Untagged {untagged_count} mailboxes"),
        Untagged {
            tag_id: request.tag_id,
            untagged_count,
        },
    )
}
