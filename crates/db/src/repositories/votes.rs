use chrono::Utc;
use sqlx::Row;

use smashbot_core::{ItemKey, StoreError, VoteKind, VoteStore, VoteTally};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlVoteStore {
    pool: DbPool,
}

impl SqlVoteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn upsert_increment(&self, key: &ItemKey, kind: VoteKind) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let (approve, reject) = match kind {
            VoteKind::Approve => (1_i64, 0_i64),
            VoteKind::Reject => (0, 1),
        };

        // One statement per vote keeps concurrent increments on a key from losing updates.
        sqlx::query(
            "INSERT INTO vote_tally (item_key, approve_count, reject_count, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(item_key) DO UPDATE SET
                 approve_count = approve_count + excluded.approve_count,
                 reject_count = reject_count + excluded.reject_count,
                 updated_at = excluded.updated_at",
        )
        .bind(key.as_str())
        .bind(approve)
        .bind(reject)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_tally(&self, key: &ItemKey) -> Result<Option<VoteTally>, RepositoryError> {
        let row = sqlx::query(
            "SELECT approve_count, reject_count FROM vote_tally WHERE item_key = ?",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_tally).transpose()
    }

    async fn insert_zeroed(&self, key: &ItemKey) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO vote_tally
                 (item_key, approve_count, reject_count, created_at, updated_at)
             VALUES (?, 0, 0, ?, ?)",
        )
        .bind(key.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<(ItemKey, VoteTally)>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT item_key, approve_count, reject_count FROM vote_tally ORDER BY item_key ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let key: String =
                    row.try_get("item_key").map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok((ItemKey(key), row_to_tally(row)?))
            })
            .collect()
    }
}

fn row_to_tally(row: &sqlx::sqlite::SqliteRow) -> Result<VoteTally, RepositoryError> {
    let approve: i64 =
        row.try_get("approve_count").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reject: i64 =
        row.try_get("reject_count").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(VoteTally::new(counter(approve, "approve_count")?, counter(reject, "reject_count")?))
}

fn counter(value: i64, column: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{column} is negative: {value}")))
}

#[async_trait::async_trait]
impl VoteStore for SqlVoteStore {
    async fn increment(&self, key: &ItemKey, kind: VoteKind) -> Result<(), StoreError> {
        self.upsert_increment(key, kind).await.map_err(StoreError::from)
    }

    async fn read(&self, key: &ItemKey) -> Result<VoteTally, StoreError> {
        self.fetch_tally(key).await?.ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn ensure_exists(&self, key: &ItemKey) -> Result<(), StoreError> {
        self.insert_zeroed(key).await.map_err(StoreError::from)
    }

    async fn list(&self) -> Result<Vec<(ItemKey, VoteTally)>, StoreError> {
        self.fetch_all().await.map_err(StoreError::from)
    }
}
