//! Audit log storage.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use tracing::warn;

use super::model::{
    AuditEntry, NewAuditEntry, OperationKind, PageRequest, RequestMeta, TargetKind,
};
use crate::Result;
use crate::account::AccountId;
use crate::db::{parse_timestamp, timestamp};

/// Append-only operation log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pool: SqlitePool,
}

impl AuditLog {
    /// Create an audit log over an initialized pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record(&self, entry: &NewAuditEntry) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO audit_log
                (account_id, operation, target_type, target_id, description,
                 ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(entry.account.0)
        .bind(entry.kind.as_str())
        .bind(entry.target.as_str())
        .bind(entry.target_id)
        .bind(&entry.description)
        .bind(&entry.meta.ip_address)
        .bind(&entry.meta.user_agent)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append an entry, logging instead of failing when the write does not succeed.
    pub async fn record_best_effort(&self, entry: NewAuditEntry) {
        if let Err(e) = self.record(&entry).await {
            warn!(operation = %entry.kind, "Failed to write audit entry: {e}");
        }
    }

    /// One page of an account's entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, account: AccountId, page: PageRequest) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r"
            SELECT id, account_id, operation, target_type, target_id, description,
                   ip_address, user_agent, created_at
            FROM audit_log
            WHERE account_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            ",
        )
        .bind(account.0)
        .bind(page.page_size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_entry).collect())
    }

    /// The `limit` most recent entries of an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recent(&self, account: AccountId, limit: i64) -> Result<Vec<AuditEntry>> {
        self.list(
            account,
            PageRequest {
                page: 1,
                page_size: limit,
            },
        )
        .await
    }

    /// Number of entries recorded for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self, account: AccountId) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM audit_log WHERE account_id = ?")
            .bind(account.0)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Entry counts per operation kind, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn counts_by_kind(&self, account: AccountId) -> Result<Vec<(OperationKind, i64)>> {
        let rows = sqlx::query(
            r"
            SELECT operation, COUNT(*) AS total
            FROM audit_log
            WHERE account_id = ?
            GROUP BY operation
            ORDER BY total DESC, operation ASC
            ",
        )
        .bind(account.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (OperationKind::parse(row.get("operation")), row.get("total")))
            .collect())
    }

    /// Delete all of an account's entries. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear(&self, account: AccountId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audit_log WHERE account_id = ?")
            .bind(account.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Clear the account's log, leaving a single `clear_all_logs` entry behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be deleted.
    pub async fn reset(&self, account: AccountId, meta: &RequestMeta) -> Result<u64> {
        let removed = self.clear(account).await?;
        self.record_best_effort(
            NewAuditEntry::new(
                account,
                OperationKind::ClearAllLogs,
                format!("Cleared {removed} log entries"),
            )
            .with_meta(meta),
        )
        .await;
        Ok(removed)
    }
}

/// Convert a database row to an `AuditEntry`.
fn row_to_entry(row: &SqliteRow) -> Option<AuditEntry> {
    let kind = OperationKind::parse(row.get("operation"));
    Some(AuditEntry {
        id: row.get("id"),
        account: AccountId::new(row.get("account_id")),
        label: kind.label().to_string(),
        kind,
        target: TargetKind::parse(row.get("target_type")),
        target_id: row.get("target_id"),
        description: row.get("description"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db;

    async fn log() -> AuditLog {
        AuditLog::new(db::in_memory().await.unwrap())
    }

    fn entry(account: i64, kind: OperationKind) -> NewAuditEntry {
        NewAuditEntry::new(AccountId::new(account), kind, "test")
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let log = log().await;
        let meta = RequestMeta::new("10.0.0.1", "curl/8");
        log.record(
            &entry(1, OperationKind::EmailAdded)
                .on_credential(Some(7))
                .with_meta(&meta),
        )
        .await
        .unwrap();
        log.record(&entry(1, OperationKind::TagCreated).on_tag(Some(3)))
            .await
            .unwrap();
        log.record(&entry(2, OperationKind::Logout)).await.unwrap();

        let entries = log.list(AccountId::new(1), PageRequest::default()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, OperationKind::TagCreated);
        assert_eq!(entries[0].target, TargetKind::Tag);
        assert_eq!(entries[1].target_id, Some(7));
        assert_eq!(entries[1].ip_address, "10.0.0.1");
        assert_eq!(entries[1].label, "Added mailbox");
        assert_eq!(log.count(AccountId::new(1)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_paging() {
        let log = log().await;
        for _ in 0..7 {
            log.record(&entry(1, OperationKind::GetLatestMail)).await.unwrap();
        }
        let page2 = log
            .list(AccountId::new(1), PageRequest::new(Some(2), Some(5)))
            .await
            .unwrap();
        assert_eq!(page2.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_kind_survives_storage() {
        let log = log().await;
        log.record(&entry(1, OperationKind::Other("legacy_op".into())))
            .await
            .unwrap();
        let entries = log.recent(AccountId::new(1), 5).await.unwrap();
        assert_eq!(entries[0].kind, OperationKind::Other("legacy_op".into()));
        assert_eq!(entries[0].label, "legacy_op");
    }

    #[tokio::test]
    async fn test_counts_and_clear() {
        let log = log().await;
        log.record(&entry(1, OperationKind::ClearInbox)).await.unwrap();
        log.record(&entry(1, OperationKind::ClearInbox)).await.unwrap();
        log.record(&entry(1, OperationKind::ClearJunk)).await.unwrap();

        let counts = log.counts_by_kind(AccountId::new(1)).await.unwrap();
        assert_eq!(counts[0], (OperationKind::ClearInbox, 2));
        assert_eq!(counts[1], (OperationKind::ClearJunk, 1));

        assert_eq!(log.clear(AccountId::new(1)).await.unwrap(), 3);
        assert_eq!(log.count(AccountId::new(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reset_leaves_marker() {
        let log = log().await;
        log.record(&entry(1, OperationKind::Logout)).await.unwrap();
        log.record(&entry(2, OperationKind::Logout)).await.unwrap();

        let removed = log
            .reset(AccountId::new(1), &RequestMeta::new("10.0.0.2", "ui"))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let entries = log.recent(AccountId::new(1), 5).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, OperationKind::ClearAllLogs);
        assert_eq!(entries[0].ip_address, "10.0.0.2");
        assert_eq!(log.count(AccountId::new(2)).await.unwrap(), 1);
    }
}
