use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A chat room the bot has been invited into.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Room {
    pub id: String,
    /// Who invited the bot
    pub sender: String,
    pub created_at: i64,
}

impl Room {
    pub fn new(id: String, sender: String) -> Self {
        Self {
            id,
            sender,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
