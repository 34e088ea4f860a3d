//! Recording chat client for handler and bot tests.

use super::client::ChatClient;
use super::types::SyncBatch;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { room_id: String, text: String },
    Formatted { room_id: String, text: String, html: String },
}

impl Sent {
    /// The plain body of the message
    pub fn text(&self) -> &str {
        match self {
            Sent::Text { text, .. } | Sent::Formatted { text, .. } => text,
        }
    }

    pub fn html(&self) -> Option<&str> {
        match self {
            Sent::Formatted { html, .. } => Some(html),
            Sent::Text { .. } => None,
        }
    }
}

#[derive(Default)]
pub struct FakeChatClient {
    pub sent: Mutex<Vec<Sent>>,
    pub joined: Mutex<Vec<String>>,
    pub display_names: Mutex<HashMap<String, String>>,
    pub batches: Mutex<VecDeque<SyncBatch>>,
    pub sync_calls: Mutex<Vec<Option<String>>>,
}

impl FakeChatClient {
    pub fn with_display_name(self, user_id: &str, name: &str) -> Self {
        self.display_names
            .lock()
            .unwrap()
            .insert(user_id.to_string(), name.to_string());
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_sent(&self) -> Sent {
        self.sent().last().cloned().expect("nothing was sent")
    }
}

#[async_trait]
impl ChatClient for FakeChatClient {
    async fn sync(&self, since: Option<&str>) -> Result<SyncBatch> {
        self.sync_calls.lock().unwrap().push(since.map(str::to_string));
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        self.joined.lock().unwrap().push(room_id.to_string());
        Ok(())
    }

    async fn send_text(&self, room_id: &str, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Text {
            room_id: room_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_formatted(&self, room_id: &str, text: &str, html: &str) -> Result<()> {
        self.sent.lock().unwrap().push(Sent::Formatted {
            room_id: room_id.to_string(),
            text: text.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }

    async fn display_name(&self, user_id: &str) -> Result<String> {
        self.display_names
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("M_NOT_FOUND: no profile for {}", user_id))
    }
}
