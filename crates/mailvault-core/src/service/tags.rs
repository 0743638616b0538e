//! Tag management and tagging of credentials.

use crate::account::AccountId;
use crate::audit::{AuditLog, NewAuditEntry, OperationKind, RequestMeta};
use crate::credential::{CredentialId, CredentialRepository};
use crate::tag::{NewTag, Tag, TagId, TagRepository, TagUpdate};
use crate::{Error, Result};

/// Tag operations with ownership checks and audit entries.
#[derive(Debug, Clone)]
pub struct TagService {
    tags: TagRepository,
    credentials: CredentialRepository,
    audit: AuditLog,
}

impl TagService {
    /// Create the service.
    #[must_use]
    pub const fn new(tags: TagRepository, credentials: CredentialRepository, audit: AuditLog) -> Self {
        Self {
            tags,
            credentials,
            audit,
        }
    }

    /// All tags, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Tag>> {
        self.tags.list().await
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a blank name and [`Error::Conflict`]
    /// if the name is taken.
    pub async fn create(&self, account: AccountId, input: &NewTag, meta: &RequestMeta) -> Result<Tag> {
        if input.name.trim().is_empty() {
            return Err(Error::Validation("tag name is required".to_string()));
        }

        let tag = self.tags.create(input).await?;
        self.record(
            account,
            OperationKind::TagCreated,
            Some(tag.id),
            format!("Created tag {}", tag.name),
            meta,
        )
        .await;
        Ok(tag)
    }

    /// Change a tag. Absent or blank name and color are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown tag and [`Error::Conflict`]
    /// if the new name belongs to another tag.
    pub async fn update(
        &self,
        account: AccountId,
        id: TagId,
        update: TagUpdate,
        meta: &RequestMeta,
    ) -> Result<Tag> {
        let mut tag = self.existing(id).await?;

        if let Some(name) = update.name.as_deref().map(str::trim)
            && !name.is_empty()
            && name != tag.name
        {
            if self.tags.get_by_name(name).await?.is_some() {
                return Err(Error::Conflict(format!("tag name {name} already exists")));
            }
            tag.name = name.to_string();
        }
        if let Some(description) = update.description {
            tag.description = description;
        }
        if let Some(color) = update.color.as_deref().map(str::trim)
            && !color.is_empty()
        {
            tag.color = color.to_string();
        }

        self.tags.update(&tag).await?;
        self.record(
            account,
            OperationKind::TagUpdated,
            Some(id),
            format!("Updated tag {}", tag.name),
            meta,
        )
        .await;
        self.existing(id).await
    }

    /// Delete a tag that no credential carries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown tag and [`Error::TagInUse`]
    /// while any credential still carries it.
    pub async fn delete(&self, account: AccountId, id: TagId, meta: &RequestMeta) -> Result<()> {
        let tag = self.existing(id).await?;

        let count = self.tags.usage_count(id).await?;
        if count > 0 {
            return Err(Error::TagInUse {
                name: tag.name,
                count,
            });
        }

        self.tags.delete(id).await?;
        self.record(
            account,
            OperationKind::TagDeleted,
            Some(id),
            format!("Deleted tag {}", tag.name),
            meta,
        )
        .await;
        Ok(())
    }

    /// Attach a tag to one credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for a foreign
    /// credential and [`Error::NotFound`] for an unknown tag.
    pub async fn tag_one(
        &self,
        account: AccountId,
        credential: CredentialId,
        tag: TagId,
        meta: &RequestMeta,
    ) -> Result<()> {
        let target = self.credentials.get_owned(account, credential).await?;
        let tag = self.existing(tag).await?;

        self.tags.attach(credential, tag.id).await?;
        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::EmailTagged,
                    format!("Tagged {} with {}", target.email_address, tag.name),
                )
                .on_credential(Some(credential.0))
                .with_meta(meta),
            )
            .await;
        Ok(())
    }

    /// Detach a tag from one credential. Returns whether it was attached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`]/[`Error::Forbidden`] for a foreign
    /// credential and [`Error::NotFound`] for an unknown tag.
    pub async fn untag_one(
        &self,
        account: AccountId,
        credential: CredentialId,
        tag: TagId,
        meta: &RequestMeta,
    ) -> Result<bool> {
        let target = self.credentials.get_owned(account, credential).await?;
        let tag = self.existing(tag).await?;

        let removed = self.tags.detach(credential, tag.id).await?;
        self.audit
            .record_best_effort(
                NewAuditEntry::new(
                    account,
                    OperationKind::EmailUntagged,
                    format!("Removed tag {} from {}", tag.name, target.email_address),
                )
                .on_credential(Some(credential.0))
                .with_meta(meta),
            )
            .await;
        Ok(removed)
    }

    /// Attach a tag to several credentials. Every credential is checked first.
    ///
    /// Returns the number of credentials named.
    ///
    /// # Errors
    ///
    /// Returns the ownership error of the first foreign credential, or
    /// [`Error::NotFound`] for an unknown tag; nothing is attached then.
    pub async fn batch_tag(
        &self,
        account: AccountId,
        credentials: &[CredentialId],
        tag: TagId,
        meta: &RequestMeta,
    ) -> Result<usize> {
        self.check_owned(account, credentials).await?;
        let tag = self.existing(tag).await?;

        self.tags.attach_many(credentials, tag.id).await?;
        self.record(
            account,
            OperationKind::BatchTagEmails,
            Some(tag.id),
            format!("Tagged {} mailboxes with {}", credentials.len(), tag.name),
            meta,
        )
        .await;
        Ok(credentials.len())
    }

    /// Detach a tag from several credentials. Every credential is checked first.
    ///
    /// Returns the number of links removed.
    ///
    /// # Errors
    ///
    /// Returns the ownership error of the first foreign credential, or
    /// [`Error::NotFound`] for an unknown tag; nothing is detached then.
    pub async fn batch_untag(
        &self,
        account: AccountId,
        credentials: &[CredentialId],
        tag: TagId,
        meta: &RequestMeta,
    ) -> Result<u64> {
        self.check_owned(account, credentials).await?;
        let tag = self.existing(tag).await?;

        let removed = self.tags.detach_many(credentials, tag.id).await?;
        self.record(
            account,
            OperationKind::BatchUntagEmails,
            Some(tag.id),
            format!("Removed tag {} from {} mailboxes", tag.name, credentials.len()),
            meta,
        )
        .await;
        Ok(removed)
    }

    async fn existing(&self, id: TagId) -> Result<Tag> {
        self.tags
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("tag {id}")))
    }

    async fn check_owned(&self, account: AccountId, credentials: &[CredentialId]) -> Result<()> {
        if credentials.is_empty() {
            return Err(Error::Validation("no credentials selected".to_string()));
        }
        for id in credentials {
            self.credentials.get_owned(account, *id).await?;
        }
        Ok(())
    }

    async fn record(
        &self,
        account: AccountId,
        kind: OperationKind,
        tag: Option<TagId>,
        description: String,
        meta: &RequestMeta,
    ) {
        self.audit
            .record_best_effort(
                NewAuditEntry::new(account, kind, description)
                    .on_tag(tag.map(|t| t.0))
                    .with_meta(meta),
            )
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::credential::NewCredential;
    use crate::db;

    const OWNER: AccountId = AccountId::OWNER;

    struct Fixture {
        service: TagService,
        credentials: CredentialRepository,
        audit: AuditLog,
    }

    async fn fixture() -> Fixture {
        let pool = db::in_memory().await.unwrap();
        let credentials = CredentialRepository::new(pool.clone());
        let audit = AuditLog::new(pool.clone());
        let service = TagService::new(TagRepository::new(pool), credentials.clone(), audit.clone());
        Fixture {
            service,
            credentials,
            audit,
        }
    }

    async fn store(fx: &Fixture, account: AccountId, address: &str) -> CredentialId {
        fx.credentials
            .create(account, &NewCredential::new(address, "pw", "cid", "rt"))
            .await
            .unwrap()
            .id
    }

    fn meta() -> RequestMeta {
        RequestMeta::default()
    }

    #[tokio::test]
    async fn test_create_rejects_blank_and_taken_names() {
        let fx = fixture().await;
        assert!(matches!(
            fx.service.create(OWNER, &NewTag::named("  "), &meta()).await,
            Err(Error::Validation(_))
        ));

        fx.service.create(OWNER, &NewTag::named("VIP"), &meta()).await.unwrap();
        assert!(matches!(
            fx.service.create(OWNER, &NewTag::named("VIP"), &meta()).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let fx = fixture().await;
        let tag = fx
            .service
            .create(
                OWNER,
                &NewTag::named("VIP").with_description("top").with_color("#111111"),
                &meta(),
            )
            .await
            .unwrap();

        let updated = fx
            .service
            .update(
                OWNER,
                tag.id,
                TagUpdate {
                    name: Some("Gold".into()),
                    color: Some("  ".into()),
                    ..TagUpdate::default()
                },
                &meta(),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Gold");
        assert_eq!(updated.description, "top");
        assert_eq!(updated.color, "#111111");
    }

    #[tokio::test]
    async fn test_rename_to_existing_name() {
        let fx = fixture().await;
        fx.service.create(OWNER, &NewTag::named("A"), &meta()).await.unwrap();
        let b = fx.service.create(OWNER, &NewTag::named("B"), &meta()).await.unwrap();

        let err = fx
            .service
            .update(
                OWNER,
                b.id,
                TagUpdate {
                    name: Some("A".into()),
                    ..TagUpdate::default()
                },
                &meta(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_blocked_until_last_detach() {
        let fx = fixture().await;
        let tag = fx.service.create(OWNER, &NewTag::named("VIP"), &meta()).await.unwrap();
        let a = store(&fx, OWNER, "a@outlook.com").await;
        let b = store(&fx, OWNER, "b@outlook.com").await;
        fx.service.batch_tag(OWNER, &[a, b], tag.id, &meta()).await.unwrap();

        let err = fx.service.delete(OWNER, tag.id, &meta()).await.unwrap_err();
        assert!(matches!(err, Error::TagInUse { count: 2, .. }));

        assert!(fx.service.untag_one(OWNER, a, tag.id, &meta()).await.unwrap());
        assert!(matches!(
            fx.service.delete(OWNER, tag.id, &meta()).await,
            Err(Error::TagInUse { count: 1, .. })
        ));

        assert_eq!(fx.service.batch_untag(OWNER, &[b], tag.id, &meta()).await.unwrap(), 1);
        fx.service.delete(OWNER, tag.id, &meta()).await.unwrap();
        assert!(fx.service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_tag_checks_every_credential() {
        let fx = fixture().await;
        let tag = fx.service.create(OWNER, &NewTag::named("VIP"), &meta()).await.unwrap();
        let mine = store(&fx, OWNER, "a@outlook.com").await;
        let foreign = store(&fx, AccountId(2), "b@outlook.com").await;

        let err = fx
            .service
            .batch_tag(OWNER, &[mine, foreign], tag.id, &meta())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let stored = fx.credentials.get(mine).await.unwrap().unwrap();
        assert!(stored.tags.is_empty());
    }

    #[tokio::test]
    async fn test_tag_one_is_idempotent_and_audited() {
        let fx = fixture().await;
        let tag = fx.service.create(OWNER, &NewTag::named("VIP"), &meta()).await.unwrap();
        let id = store(&fx, OWNER, "a@outlook.com").await;

        fx.service.tag_one(OWNER, id, tag.id, &meta()).await.unwrap();
        fx.service.tag_one(OWNER, id, tag.id, &meta()).await.unwrap();

        let stored = fx.credentials.get(id).await.unwrap().unwrap();
        assert_eq!(stored.tags.len(), 1);
        assert_eq!(stored.tags[0].name, "VIP");

        let kinds: Vec<OperationKind> = fx
            .audit
            .recent(OWNER, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds.iter().filter(|k| **k == OperationKind::EmailTagged).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_unknown_tag() {
        let fx = fixture().await;
        let id = store(&fx, OWNER, "a@outlook.com").await;
        assert!(matches!(
            fx.service.tag_one(OWNER, id, TagId::new(42), &meta()).await,
            Err(Error::NotFound(_))
        ));
    }
}
