use crate::bot::Bot;
use crate::db::memory::{MemoryFollowUpRepo, MemoryRoomRepo, MemoryShiftRepo};
use crate::matrix::fake::FakeChatClient;
use crate::matrix::MessageEvent;
use std::sync::Arc;

pub const ROOM: &str = "!ops:example.org";
pub const ALICE: &str = "@alice:example.org";
pub const BOT: &str = "@oncall:example.org";

pub struct TestBot {
    pub bot: Arc<Bot>,
    pub client: Arc<FakeChatClient>,
    pub rooms: Arc<MemoryRoomRepo>,
    pub shifts: Arc<MemoryShiftRepo>,
    pub follow_ups: Arc<MemoryFollowUpRepo>,
}

impl TestBot {
    pub fn new() -> Self {
        Self::with(|bot| bot)
    }

    pub fn with(configure: impl FnOnce(Bot) -> Bot) -> Self {
        Self::with_client(FakeChatClient::default(), configure)
    }

    pub fn with_client(client: FakeChatClient, configure: impl FnOnce(Bot) -> Bot) -> Self {
        let client = Arc::new(client);
        let rooms = Arc::new(MemoryRoomRepo::default());
        let shifts = Arc::new(MemoryShiftRepo::default());
        let follow_ups = Arc::new(MemoryFollowUpRepo::default());

        let bot = Bot::new(
            BOT.to_string(),
            client.clone(),
            rooms.clone(),
            shifts.clone(),
            follow_ups.clone(),
        )
        .unwrap();

        Self {
            bot: Arc::new(configure(bot)),
            client,
            rooms,
            shifts,
            follow_ups,
        }
    }

    /// Feed `body` from Alice through the full parse-and-dispatch path.
    pub async fn say(&self, body: &str) -> anyhow::Result<()> {
        self.bot.handle_message(&message(body)).await
    }
}

pub fn message(body: &str) -> MessageEvent {
    MessageEvent {
        room_id: ROOM.to_string(),
        event_id: "$event".to_string(),
        sender: ALICE.to_string(),
        body: Some(body.to_string()),
        formatted_body: None,
        origin_server_ts: chrono::Utc::now().timestamp_millis(),
    }
}
