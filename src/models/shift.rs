use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One on-call holder for a room over a time interval.
///
/// A shift with several holders is stored as one row per holder, all sharing
/// the same room, sender and start time. A row with no `end_time` is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Shift {
    pub id: i64,
    pub room_id: String,
    pub sender: String,
    pub holder: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

impl Shift {
    /// Build an unsaved, active shift row. The id is assigned on insert.
    pub fn new(room_id: String, sender: String, holder: String, start: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            room_id,
            sender,
            holder,
            start_time: start.timestamp(),
            end_time: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn start(&self) -> DateTime<Utc> {
        from_timestamp(self.start_time)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_time.map(from_timestamp)
    }
}

pub(crate) fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
