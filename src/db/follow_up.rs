use super::StoreError;
use crate::models::FollowUp;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait FollowUpRepo: Send + Sync {
    async fn create(&self, follow_up: &FollowUp) -> Result<i64, StoreError>;

    async fn get(&self, shift_id: i64) -> Result<Vec<FollowUp>, StoreError>;

    /// Mark a follow-up as done. Returns the number of rows changed.
    async fn resolve(&self, id: i64) -> Result<u64, StoreError>;
}

pub struct FollowUpRepository {
    pool: SqlitePool,
}

impl FollowUpRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowUpRepo for FollowUpRepository {
    async fn create(&self, follow_up: &FollowUp) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO follow_ups (shift_id, sender, initiator, description, done, category, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(follow_up.shift_id)
        .bind(&follow_up.sender)
        .bind(&follow_up.initiator)
        .bind(&follow_up.description)
        .bind(follow_up.done)
        .bind(&follow_up.category)
        .bind(follow_up.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn get(&self, shift_id: i64) -> Result<Vec<FollowUp>, StoreError> {
        let items = sqlx::query_as::<_, FollowUp>(
            "SELECT * FROM follow_ups WHERE shift_id = ? ORDER BY id ASC"
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn resolve(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE follow_ups SET done = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
