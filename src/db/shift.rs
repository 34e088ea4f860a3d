use super::StoreError;
use crate::models::Shift;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

#[async_trait]
pub trait ShiftRepo: Send + Sync {
    /// Insert all rows of one shift atomically and return their ids in order.
    async fn create(&self, shifts: &[Shift]) -> Result<Vec<i64>, StoreError>;

    /// Every shift of the room, oldest first.
    async fn get(&self, room_id: &str) -> Result<Vec<Shift>, StoreError>;

    /// Rows of the room that have not ended yet.
    async fn active(&self, room_id: &str) -> Result<Vec<Shift>, StoreError>;

    /// End the active shift of `room_id` that contains the row `shift_id`.
    ///
    /// Every holder row of that shift is closed. Returns the number of rows
    /// changed, which is zero when the id is unknown, belongs to another room
    /// or has already ended.
    async fn end(&self, room_id: &str, shift_id: i64, at: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Rows whose `[start_time, end_time or +inf)` interval intersects `[from, to]`.
    async fn report(
        &self,
        room_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Shift>, StoreError>;
}

pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_conflict(err: sqlx::Error, shift: &Shift) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::ActiveShiftConflict {
                room_id: shift.room_id.clone(),
                holder: shift.holder.clone(),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ShiftRepo for ShiftRepository {
    async fn create(&self, shifts: &[Shift]) -> Result<Vec<i64>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(shifts.len());

        for shift in shifts {
            let result = sqlx::query(
                "INSERT INTO shifts (room_id, sender, holder, start_time, end_time)
                 VALUES (?, ?, ?, ?, ?)"
            )
            .bind(&shift.room_id)
            .bind(&shift.sender)
            .bind(&shift.holder)
            .bind(shift.start_time)
            .bind(shift.end_time)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_conflict(e, shift))?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn get(&self, room_id: &str) -> Result<Vec<Shift>, StoreError> {
        let shifts = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE room_id = ? ORDER BY start_time ASC, id ASC"
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shifts)
    }

    async fn active(&self, room_id: &str) -> Result<Vec<Shift>, StoreError> {
        let shifts = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts WHERE room_id = ? AND end_time IS NULL ORDER BY id ASC"
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shifts)
    }

    async fn end(&self, room_id: &str, shift_id: i64, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE shifts SET end_time = ?
             WHERE room_id = ? AND end_time IS NULL
               AND EXISTS (
                   SELECT 1 FROM shifts
                   WHERE id = ? AND room_id = ? AND end_time IS NULL
               )"
        )
        .bind(at.timestamp())
        .bind(room_id)
        .bind(shift_id)
        .bind(room_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn report(
        &self,
        room_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Shift>, StoreError> {
        let shifts = sqlx::query_as::<_, Shift>(
            "SELECT * FROM shifts
             WHERE room_id = ? AND start_time <= ?
               AND (end_time IS NULL OR end_time >= ?)
             ORDER BY start_time ASC, id ASC"
        )
        .bind(room_id)
        .bind(to.timestamp())
        .bind(from.timestamp())
        .fetch_all(&self.pool)
        .await?;
        Ok(shifts)
    }
}
