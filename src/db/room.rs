use super::StoreError;
use crate::models::Room;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait RoomRepo: Send + Sync {
    /// Record a room the bot was invited to. Re-inviting is not an error.
    async fn create(&self, room: &Room) -> Result<(), StoreError>;
}

pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Room>, sqlx::Error> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl RoomRepo for RoomRepository {
    async fn create(&self, room: &Room) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO rooms (id, sender, created_at) VALUES (?, ?, ?)")
            .bind(&room.id)
            .bind(&room.sender)
            .bind(room.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
