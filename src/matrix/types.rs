use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

pub const ROOM_MEMBER_EVENT: &str = "m.room.member";
pub const ROOM_MESSAGE_EVENT: &str = "m.room.message";

/// Payload of `GET /_matrix/client/v3/sync` (only the parts the bot reads)
#[derive(Debug, Clone, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRooms {
    #[serde(default)]
    pub join: HashMap<String, JoinedRoom>,
    #[serde(default)]
    pub invite: HashMap<String, InvitedRoom>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvitedRoom {
    #[serde(default)]
    pub invite_state: InviteState,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InviteState {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub sender: String,
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub origin_server_ts: i64,
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: Value,
}

/// A room message as seen by the command dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub room_id: String,
    pub event_id: String,
    pub sender: String,
    /// `content.body`, absent when it is missing or not a string
    pub body: Option<String>,
    /// `content.formatted_body`, present for rich text (mentions)
    pub formatted_body: Option<String>,
    pub origin_server_ts: i64,
}

/// The bot being invited into a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteEvent {
    pub room_id: String,
    pub sender: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Invite(InviteEvent),
    Message(MessageEvent),
}

/// One batch of events pulled from the homeserver.
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
    pub next_batch: String,
    pub events: Vec<BotEvent>,
}

impl SyncResponse {
    /// Flatten into the events the bot reacts to, in arrival order.
    ///
    /// Only invitations addressed to `user_id` are kept.
    pub fn into_batch(self, user_id: &str) -> SyncBatch {
        let mut events = Vec::new();

        for (room_id, room) in self.rooms.invite {
            let invited = room.invite_state.events.into_iter().find(|event| {
                event.event_type == ROOM_MEMBER_EVENT
                    && event.state_key.as_deref() == Some(user_id)
                    && event.content["membership"].as_str() == Some("invite")
            });
            if let Some(event) = invited {
                events.push((event.origin_server_ts, BotEvent::Invite(InviteEvent {
                    room_id,
                    sender: event.sender,
                })));
            }
        }

        for (room_id, room) in self.rooms.join {
            for event in room.timeline.events {
                if event.event_type != ROOM_MESSAGE_EVENT {
                    continue;
                }
                events.push((event.origin_server_ts, BotEvent::Message(MessageEvent {
                    room_id: room_id.clone(),
                    body: event.content["body"].as_str().map(str::to_string),
                    formatted_body: event.content["formatted_body"].as_str().map(str::to_string),
                    event_id: event.event_id,
                    sender: event.sender,
                    origin_server_ts: event.origin_server_ts,
                })));
            }
        }

        // Stable sort keeps per-room timeline order for equal timestamps
        events.sort_by_key(|(ts, _)| *ts);

        SyncBatch {
            next_batch: self.next_batch,
            events: events.into_iter().map(|(_, event)| event).collect(),
        }
    }
}
