//! Credential storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::debug;

use super::model::{Credential, CredentialId, ListQuery, NewCredential};
use crate::account::AccountId;
use crate::db::{parse_timestamp, timestamp};
use crate::tag::TagRepository;
use crate::{Error, Result};

const CREDENTIAL_COLUMNS: &str = r"
    id, account_id, email_address, password, client_id, refresh_token, remark,
    last_operation_at, created_at, updated_at
";

/// Repository for stored mailbox credentials.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: SqlitePool,
    tags: TagRepository,
}

impl CredentialRepository {
    /// Create a repository over an initialized pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        let tags = TagRepository::new(pool.clone());
        Self { pool, tags }
    }

    /// Store one credential.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if the address is already stored for the
    /// account, or a database error.
    pub async fn create(&self, account: AccountId, input: &NewCredential) -> Result<Credential> {
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO credentials
                (account_id, email_address, password, client_id, refresh_token, remark,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(account.0)
        .bind(&input.email_address)
        .bind(&input.password)
        .bind(&input.client_id)
        .bind(&input.refresh_token)
        .bind(&input.remark)
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_address(e, &input.email_address))?;

        let id = CredentialId::new(result.last_insert_rowid());
        debug!("Stored credential {id} for {}", input.email_address);
        Ok(fresh_credential(id, account, input, now))
    }

    /// Store several credentials in one transaction.
    ///
    /// Either every credential is stored or none is. The returned credentials
    /// are in input order.
    ///
    /// # Errors
    ///
    /// Returns a database error if any insert fails, including a uniqueness
    /// violation; the transaction is rolled back in that case.
    pub async fn create_many(
        &self,
        account: AccountId,
        inputs: &[NewCredential],
    ) -> Result<Vec<Credential>> {
        let now = Utc::now();
        let stamp = timestamp(now);
        let mut created = Vec::with_capacity(inputs.len());

        let mut tx = self.pool.begin().await?;
        for input in inputs {
            let result = sqlx::query(
                r"
                INSERT INTO credentials
                    (account_id, email_address, password, client_id, refresh_token, remark,
                     created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(account.0)
            .bind(&input.email_address)
            .bind(&input.password)
            .bind(&input.client_id)
            .bind(&input.refresh_token)
            .bind(&input.remark)
            .bind(&stamp)
            .bind(&stamp)
            .execute(&mut *tx)
            .await?;

            let id = CredentialId::new(result.last_insert_rowid());
            created.push(fresh_credential(id, account, input, now));
        }
        tx.commit().await?;

        debug!("Stored {} credentials in one transaction", created.len());
        Ok(created)
    }

    /// Get a credential by id, regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: CredentialId) -> Result<Option<Credential>> {
        let row = sqlx::query(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = ?"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut credential) = row.as_ref().and_then(row_to_credential) else {
            return Ok(None);
        };
        credential.tags = self.tags.tags_of(id).await?;
        Ok(Some(credential))
    }

    /// Get a credential owned by `account`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no credential has the id and
    /// [`Error::Forbidden`] if it belongs to another account.
    pub async fn get_owned(&self, account: AccountId, id: CredentialId) -> Result<Credential> {
        let credential = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("credential {id}")))?;

        if credential.account != account {
            return Err(Error::Forbidden(format!(
                "credential {id} belongs to another account"
            )));
        }
        Ok(credential)
    }

    /// Whether `address` is already stored for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn exists(&self, account: AccountId, address: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM credentials WHERE account_id = ? AND email_address = ?",
        )
        .bind(account.0)
        .bind(address)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// One page of an account's credentials, newest first, with tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, account: AccountId, query: &ListQuery) -> Result<Vec<Credential>> {
        let rows = if let Some(keyword) = &query.keyword {
            sqlx::query(&format!(
                r"
                SELECT {CREDENTIAL_COLUMNS} FROM credentials
                WHERE account_id = ? AND (email_address LIKE ? ESCAPE '\' OR remark LIKE ? ESCAPE '\')
                ORDER BY created_at DESC, id DESC
                LIMIT ? OFFSET ?
                "
            ))
            .bind(account.0)
            .bind(like_pattern(keyword))
            .bind(like_pattern(keyword))
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                r"
                SELECT {CREDENTIAL_COLUMNS} FROM credentials
                WHERE account_id = ?
                ORDER BY created_at DESC, id DESC
                LIMIT ? OFFSET ?
                "
            ))
            .bind(account.0)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?
        };

        let mut credentials: Vec<Credential> = rows.iter().filter_map(row_to_credential).collect();
        for credential in &mut credentials {
            credential.tags = self.tags.tags_of(credential.id).await?;
        }
        Ok(credentials)
    }

    /// Number of an account's credentials, optionally filtered by keyword.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, account: AccountId, keyword: Option<&str>) -> Result<i64> {
        let count: i64 = if let Some(keyword) = keyword {
            sqlx::query_scalar(
                r"
                SELECT COUNT(*) FROM credentials
                WHERE account_id = ? AND (email_address LIKE ? ESCAPE '\' OR remark LIKE ? ESCAPE '\')
                ",
            )
            .bind(account.0)
            .bind(like_pattern(keyword))
            .bind(like_pattern(keyword))
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM credentials WHERE account_id = ?")
                .bind(account.0)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(count)
    }

    /// Every credential of an account, or only `ids`, oldest first.
    ///
    /// Ids belonging to other accounts or not existing are silently skipped;
    /// callers compare the result length against the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_export(
        &self,
        account: AccountId,
        ids: Option<&[CredentialId]>,
    ) -> Result<Vec<Credential>> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {CREDENTIAL_COLUMNS} FROM credentials
            WHERE account_id = ?
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(account.0)
        .fetch_all(&self.pool)
        .await?;

        let all = rows.iter().filter_map(row_to_credential);
        Ok(match ids {
            Some(ids) => all.filter(|c| ids.contains(&c.id)).collect(),
            None => all.collect(),
        })
    }

    /// Persist a credential's editable fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] if the new address is taken, or a database error.
    pub async fn update(&self, credential: &Credential) -> Result<()> {
        sqlx::query(
            r"
            UPDATE credentials SET
                email_address = ?, password = ?, client_id = ?, refresh_token = ?,
                remark = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(&credential.email_address)
        .bind(&credential.password)
        .bind(&credential.client_id)
        .bind(&credential.refresh_token)
        .bind(&credential.remark)
        .bind(timestamp(Utc::now()))
        .bind(credential.id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| duplicate_address(e, &credential.email_address))?;

        Ok(())
    }

    /// Record that a mail operation just succeeded for a credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn touch_last_operation(&self, id: CredentialId) -> Result<()> {
        sqlx::query("UPDATE credentials SET last_operation_at = ? WHERE id = ?")
            .bind(timestamp(Utc::now()))
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete one credential and its tag links.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: CredentialId) -> Result<()> {
        self.delete_many(&[id]).await.map(|_| ())
    }

    /// Delete several credentials and their tag links in one transaction.
    ///
    /// Returns the number of credentials removed.
    ///
    /// # Errors
    ///
    /// Returns an error if any delete fails; nothing is removed in that case.
    pub async fn delete_many(&self, ids: &[CredentialId]) -> Result<u64> {
        let mut removed = 0;
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM credential_tags WHERE credential_id = ?")
                .bind(id.0)
                .execute(&mut *tx)
                .await?;
            removed += sqlx::query("DELETE FROM credentials WHERE id = ?")
                .bind(id.0)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        Ok(removed)
    }
}

/// Substring pattern matching `keyword` literally.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn duplicate_address(err: sqlx::Error, address: &str) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Duplicate(address.to_string())
        }
        _ => Error::Database(err),
    }
}

fn fresh_credential(
    id: CredentialId,
    account: AccountId,
    input: &NewCredential,
    now: DateTime<Utc>,
) -> Credential {
    Credential {
        id,
        account,
        email_address: input.email_address.clone(),
        password: input.password.clone(),
        client_id: input.client_id.clone(),
        refresh_token: input.refresh_token.clone(),
        remark: input.remark.clone(),
        last_operation_at: None,
        created_at: now,
        updated_at: now,
        tags: Vec::new(),
    }
}

/// Convert a database row to a Credential (without tags).
fn row_to_credential(row: &SqliteRow) -> Option<Credential> {
    let last_operation_at: Option<&str> = row.get("last_operation_at");
    Some(Credential {
        id: CredentialId::new(row.get("id")),
        account: AccountId::new(row.get("account_id")),
        email_address: row.get("email_address"),
        password: row.get("password"),
        client_id: row.get("client_id"),
        refresh_token: row.get("refresh_token"),
        remark: row.get("remark"),
        last_operation_at: last_operation_at.and_then(parse_timestamp),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
        tags: Vec::new(),
    })
}
