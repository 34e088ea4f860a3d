use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::shift::from_timestamp;

/// Direction of a follow-up: raised by someone else, or owed to someone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowUpCategory {
    Incoming,
    Outgoing,
}

impl FollowUpCategory {
    /// Lenient normalization of the category token.
    ///
    /// `in`/`incoming` and `out`/`outgoing` are recognized; anything else,
    /// typos included, silently falls back to `Incoming`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "out" | "outgoing" => Self::Outgoing,
            _ => Self::Incoming,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for FollowUpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FollowUp {
    pub id: i64,
    pub shift_id: i64,
    pub sender: String,
    /// Free text, usually the external party that raised or awaits the item
    pub initiator: String,
    pub description: String,
    pub done: bool,
    /// Stored as `incoming` or `outgoing`
    pub category: String,
    pub created_at: i64,
}

impl FollowUp {
    pub fn new(
        shift_id: i64,
        sender: String,
        initiator: String,
        description: String,
        category: FollowUpCategory,
    ) -> Self {
        Self {
            id: 0,
            shift_id,
            sender,
            initiator,
            description,
            done: false,
            category: category.as_str().to_string(),
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        from_timestamp(self.created_at)
    }
}
