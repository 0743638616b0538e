//! Tag storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use super::model::{NewTag, Tag, TagId};
use crate::account::AccountId;
use crate::credential::CredentialId;
use crate::db::{parse_timestamp, timestamp};
use crate::{Error, Result};

const TAG_COLUMNS: &str = r"
    t.id, t.name, t.description, t.color, t.created_at, t.updated_at,
    (SELECT COUNT(*) FROM credential_tags ct WHERE ct.tag_id = t.id) AS credential_count
";

/// Repository for tags and credential-tag links.
#[derive(Debug, Clone)]
pub struct TagRepository {
    pool: SqlitePool,
}

impl TagRepository {
    /// Create a repository over an initialized pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the default tags when no tags exist yet.
    ///
    /// Returns the number of tags created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn seed_defaults(&self) -> Result<usize> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Ok(0);
        }

        let defaults = super::model::default_tags();
        for tag in &defaults {
            self.create(tag).await?;
        }
        debug!("Seeded {} default tags", defaults.len());
        Ok(defaults.len())
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the name is taken, or a database error.
    pub async fn create(&self, tag: &NewTag) -> Result<Tag> {
        let now = timestamp(Utc::now());
        let name = tag.name.trim();

        let result = sqlx::query(
            r"
            INSERT INTO tags (name, description, color, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(name)
        .bind(&tag.description)
        .bind(tag.color_or_default())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| name_conflict(e, name))?;

        let id = TagId::new(result.last_insert_rowid());
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("tag {id}")))
    }

    /// Get a tag by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: TagId) -> Result<Option<Tag>> {
        let row = sqlx::query(&format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(row_to_tag))
    }

    /// Get a tag by its exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let row = sqlx::query(&format!("SELECT {TAG_COLUMNS} FROM tags t WHERE t.name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(row_to_tag))
    }

    /// All tags, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(&format!(
            "SELECT {TAG_COLUMNS} FROM tags t ORDER BY t.created_at DESC, t.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_tag).collect())
    }

    /// Total number of tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Persist a tag's name, description and color.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the new name is taken, or a database error.
    pub async fn update(&self, tag: &Tag) -> Result<()> {
        sqlx::query(
            r"
            UPDATE tags SET name = ?, description = ?, color = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&tag.name)
        .bind(&tag.description)
        .bind(&tag.color)
        .bind(timestamp(Utc::now()))
        .bind(tag.id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| name_conflict(e, &tag.name))?;

        Ok(())
    }

    /// Delete a tag and its links. Returns whether a tag was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: TagId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM credential_tags WHERE tag_id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of credentials carrying a tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn usage_count(&self, id: TagId) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM credential_tags WHERE tag_id = ?")
            .bind(id.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Attach a tag to a credential. Attaching twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn attach(&self, credential: CredentialId, tag: TagId) -> Result<()> {
        self.attach_many(&[credential], tag).await
    }

    /// Detach a tag from a credential. Returns whether a link was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn detach(&self, credential: CredentialId, tag: TagId) -> Result<bool> {
        Ok(self.detach_many(&[credential], tag).await? > 0)
    }

    /// Attach a tag to several credentials in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; nothing is attached in that case.
    pub async fn attach_many(&self, credentials: &[CredentialId], tag: TagId) -> Result<()> {
        let now = timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;
        for credential in credentials {
            sqlx::query(
                r"
                INSERT OR IGNORE INTO credential_tags (credential_id, tag_id, created_at)
                VALUES (?, ?, ?)
                ",
            )
            .bind(credential.0)
            .bind(tag.0)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Detach a tag from several credentials in one transaction.
    ///
    /// Returns the number of links removed.
    ///
    /// # Errors
    ///
    /// Returns an error if any delete fails; nothing is detached in that case.
    pub async fn detach_many(&self, credentials: &[CredentialId], tag: TagId) -> Result<u64> {
        let mut removed = 0;
        let mut tx = self.pool.begin().await?;
        for credential in credentials {
            removed += sqlx::query("DELETE FROM credential_tags WHERE credential_id = ? AND tag_id = ?")
                .bind(credential.0)
                .bind(tag.0)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }

    /// Tags attached to a credential, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn tags_of(&self, credential: CredentialId) -> Result<Vec<Tag>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {TAG_COLUMNS}
            FROM tags t
            JOIN credential_tags link ON link.tag_id = t.id
            WHERE link.credential_id = ?
            ORDER BY t.name ASC
            "
        ))
        .bind(credential.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_tag).collect())
    }

    /// The `limit` newest tags with the number of the account's credentials
    /// carrying each.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn newest_with_account_counts(
        &self,
        account: AccountId,
        limit: i64,
    ) -> Result<Vec<(Tag, i64)>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {TAG_COLUMNS},
                   (SELECT COUNT(*) FROM credential_tags ct
                    JOIN credentials c ON c.id = ct.credential_id
                    WHERE ct.tag_id = t.id AND c.account_id = ?) AS account_count
            FROM tags t
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT ?
            "
        ))
        .bind(account.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|row| row_to_tag(row).map(|tag| (tag, row.get("account_count"))))
            .collect())
    }
}

fn name_conflict(err: sqlx::Error, name: &str) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict(format!("tag name {name} already exists"))
        }
        _ => Error::Database(err),
    }
}

/// Convert a database row to a Tag.
fn row_to_tag(row: &SqliteRow) -> Option<Tag> {
    Some(Tag {
        id: TagId::new(row.get("id")),
        name: row.get("name"),
        description: row.get("description"),
        color: row.get("color"),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
        credential_count: row.get("credential_count"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db;

    async fn repo() -> TagRepository {
        TagRepository::new(db::in_memory().await.unwrap())
    }

    async fn insert_credential(pool: &SqlitePool, account: i64, address: &str) -> CredentialId {
        let now = timestamp(Utc::now());
        let result = sqlx::query(
            r"
            INSERT INTO credentials
                (account_id, email_address, password, client_id, refresh_token, created_at, updated_at)
            VALUES (?, ?, 'pw', 'cid', 'rt', ?, ?)
            ",
        )
        .bind(account)
        .bind(address)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        CredentialId::new(result.last_insert_rowid())
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = repo().await;
        let tag = repo
            .create(&NewTag::named(" vip ").with_description("top accounts"))
            .await
            .unwrap();
        assert_eq!(tag.name, "vip");
        assert_eq!(tag.color, super::super::model::DEFAULT_COLOR);
        assert_eq!(tag.credential_count, 0);

        let by_name = repo.get_by_name("vip").await.unwrap().unwrap();
        assert_eq!(by_name.id, tag.id);
        assert!(repo.get(TagId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let repo = repo().await;
        repo.create(&NewTag::named("vip")).await.unwrap();
        let err = repo.create(&NewTag::named("vip")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let repo = repo().await;
        repo.create(&NewTag::named("first")).await.unwrap();
        repo.create(&NewTag::named("second")).await.unwrap();
        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent_and_counted() {
        let repo = repo().await;
        let cred = insert_credential(&repo.pool, 1, "a@x.com").await;
        let tag = repo.create(&NewTag::named("vip")).await.unwrap();

        repo.attach(cred, tag.id).await.unwrap();
        repo.attach(cred, tag.id).await.unwrap();
        assert_eq!(repo.usage_count(tag.id).await.unwrap(), 1);
        assert_eq!(repo.get(tag.id).await.unwrap().unwrap().credential_count, 1);
        assert_eq!(repo.tags_of(cred).await.unwrap().len(), 1);

        assert!(repo.detach(cred, tag.id).await.unwrap());
        assert!(!repo.detach(cred, tag.id).await.unwrap());
        assert_eq!(repo.usage_count(tag.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_account_counts() {
        let repo = repo().await;
        let mine = insert_credential(&repo.pool, 1, "a@x.com").await;
        let theirs = insert_credential(&repo.pool, 2, "b@x.com").await;
        let tag = repo.create(&NewTag::named("shared")).await.unwrap();
        repo.attach_many(&[mine, theirs], tag.id).await.unwrap();

        let counts = repo
            .newest_with_account_counts(AccountId::new(1), 5)
            .await
            .unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].1, 1);
        assert_eq!(counts[0].0.credential_count, 2);
    }

    #[tokio::test]
    async fn test_seed_defaults_once() {
        let repo = repo().await;
        assert_eq!(repo.seed_defaults().await.unwrap(), 5);
        assert_eq!(repo.seed_defaults().await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_delete_removes_links() {
        let repo = repo().await;
        let cred = insert_credential(&repo.pool, 1, "a@x.com").await;
        let tag = repo.create(&NewTag::named("gone")).await.unwrap();
        repo.attach(cred, tag.id).await.unwrap();

        assert!(repo.delete(tag.id).await.unwrap());
        assert!(repo.get(tag.id).await.unwrap().is_none());
        assert!(repo.tags_of(cred).await.unwrap().is_empty());
        assert!(!repo.delete(tag.id).await.unwrap());
    }
}
