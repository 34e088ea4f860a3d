use super::types::SyncResponse;
use super::SyncBatch;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

/// What the bot needs from the chat network.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Pull the events that arrived after `since` (everything when `None`).
    async fn sync(&self, since: Option<&str>) -> Result<SyncBatch>;

    async fn join_room(&self, room_id: &str) -> Result<()>;

    async fn send_text(&self, room_id: &str, text: &str) -> Result<()>;

    /// Send HTML with a plain-text fallback body.
    async fn send_formatted(&self, room_id: &str, text: &str, html: &str) -> Result<()>;

    async fn display_name(&self, user_id: &str) -> Result<String>;
}

/// Matrix client-server API over HTTP.
pub struct MatrixClient {
    client: Client,
    homeserver: Url,
    user_id: String,
    access_token: String,
    txn_prefix: i64,
    txn_counter: AtomicU64,
}

impl MatrixClient {
    pub fn new(homeserver: &str, user_id: String, access_token: String) -> Result<Self> {
        let homeserver = Url::parse(homeserver)
            .with_context(|| format!("Invalid homeserver URL: {}", homeserver))?;

        Ok(Self {
            client: Client::new(),
            homeserver,
            user_id,
            access_token,
            txn_prefix: chrono::Utc::now().timestamp_millis(),
            txn_counter: AtomicU64::new(0),
        })
    }

    /// Build `/_matrix/client/v3/<segments>` with every segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.homeserver.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Homeserver URL cannot be a base: {}", self.homeserver))?
            .pop_if_empty()
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        Ok(url)
    }

    fn next_txn_id(&self) -> String {
        let n = self.txn_counter.fetch_add(1, Ordering::Relaxed);
        format!("oncall.{}.{}", self.txn_prefix, n)
    }

    async fn send_message(&self, room_id: &str, content: serde_json::Value) -> Result<()> {
        let txn_id = self.next_txn_id();
        let url = self.endpoint(&["rooms", room_id, "send", "m.room.message", txn_id.as_str()])?;

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&content)
            .send()
            .await
            .context("Failed to send message")?;

        check(response).await?;
        Ok(())
    }
}

/// Turn a non-2xx response into an error carrying the Matrix `errcode`.
async fn check(response: Response) -> Result<serde_json::Value> {
    let status = response.status();
    let json: serde_json::Value = response.json().await.unwrap_or_default();

    if !status.is_success() {
        anyhow::bail!(
            "Matrix API error {}: {} {}",
            status,
            json["errcode"].as_str().unwrap_or("unknown"),
            json["error"].as_str().unwrap_or("")
        );
    }

    Ok(json)
}

#[async_trait]
impl ChatClient for MatrixClient {
    async fn sync(&self, since: Option<&str>) -> Result<SyncBatch> {
        let url = self.endpoint(&["sync"])?;
        let mut request = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("timeout", "0")]);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }

        let response = request.send().await.context("Failed to sync")?;
        let json = check(response).await?;
        let sync: SyncResponse = serde_json::from_value(json).context("Malformed sync response")?;

        Ok(sync.into_batch(&self.user_id))
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        let url = self.endpoint(&["join", room_id])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&json!({}))
            .send()
            .await
            .context("Failed to join room")?;

        check(response).await?;
        Ok(())
    }

    async fn send_text(&self, room_id: &str, text: &str) -> Result<()> {
        self.send_message(room_id, json!({
            "msgtype": "m.text",
            "body": text,
        }))
        .await
    }

    async fn send_formatted(&self, room_id: &str, text: &str, html: &str) -> Result<()> {
        self.send_message(room_id, json!({
            "msgtype": "m.text",
            "body": text,
            "format": "org.matrix.custom.html",
            "formatted_body": html,
        }))
        .await
    }

    async fn display_name(&self, user_id: &str) -> Result<String> {
        let url = self.endpoint(&["profile", user_id, "displayname"])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to get display name")?;

        let json = check(response).await?;

        // Users without a display name are shown by their id
        Ok(json["displayname"]
            .as_str()
            .unwrap_or(user_id)
            .to_string())
    }
}
