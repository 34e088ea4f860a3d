use crate::commands::{Command, CommandError, CommandParser};
use crate::db::{FollowUpRepo, RoomRepo, ShiftRepo};
use crate::format::MessageFormatter;
use crate::handlers;
use crate::matrix::{BotEvent, ChatClient, InviteEvent, MessageEvent};
use crate::models::Room;
use crate::report::WeekHolidays;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, OwnedMutexGuard};
use tokio::time::MissedTickBehavior;

/// Pause between two syncs with the homeserver
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(300);

/// One async mutex per room so shift start/end never interleave within a room.
#[derive(Default)]
pub struct RoomLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RoomLocks {
    pub async fn lock(&self, room_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(room_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Shared state for the command handlers.
pub struct Bot {
    pub user_id: String,
    pub auto_join: bool,
    pub client: Arc<dyn ChatClient>,
    pub rooms: Arc<dyn RoomRepo>,
    pub shifts: Arc<dyn ShiftRepo>,
    pub follow_ups: Arc<dyn FollowUpRepo>,
    pub parser: CommandParser,
    pub formatter: MessageFormatter,
    pub holidays: WeekHolidays,
    room_locks: RoomLocks,
}

impl Bot {
    pub fn new(
        user_id: String,
        client: Arc<dyn ChatClient>,
        rooms: Arc<dyn RoomRepo>,
        shifts: Arc<dyn ShiftRepo>,
        follow_ups: Arc<dyn FollowUpRepo>,
    ) -> Result<Self> {
        Ok(Self {
            user_id,
            auto_join: true,
            client,
            rooms,
            shifts,
            follow_ups,
            parser: CommandParser::new().context("Failed to build command parser")?,
            formatter: MessageFormatter::new().context("Failed to build message formatter")?,
            holidays: WeekHolidays::default(),
            room_locks: RoomLocks::default(),
        })
    }

    pub fn with_holidays(mut self, holidays: WeekHolidays) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn with_auto_join(mut self, auto_join: bool) -> Self {
        self.auto_join = auto_join;
        self
    }

    /// Serialize shift lifecycle changes for one room.
    pub async fn lock_room(&self, room_id: &str) -> OwnedMutexGuard<()> {
        self.room_locks.lock(room_id).await
    }

    /// Poll the homeserver until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Events are handled one at a time in arrival order. A stop request is only
    /// observed between ticks, so a running command always completes.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let started_at = chrono::Utc::now().timestamp_millis();
        let mut since: Option<String> = None;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Bot {} is polling every {:?}", self.user_id, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let batch = match self.client.sync(since.as_deref()).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::error!("Sync failed: {:#}", e);
                    continue;
                }
            };

            let initial = since.is_none();
            for event in batch.events {
                // History from before startup is not replayed as commands
                if let BotEvent::Message(msg) = &event {
                    if initial && msg.origin_server_ts < started_at {
                        tracing::debug!("Skipping old message {} in {}", msg.event_id, msg.room_id);
                        continue;
                    }
                }
                self.handle_event(event).await;
            }
            since = Some(batch.next_batch);
        }

        tracing::info!("Bot stopped polling");
    }

    /// Handle one event; failures are logged and never stop the bot.
    pub async fn handle_event(&self, event: BotEvent) {
        match event {
            BotEvent::Invite(invite) => {
                if let Err(e) = self.handle_invite(&invite).await {
                    tracing::error!("Error handling invite to {}: {:#}", invite.room_id, e);
                }
            }
            BotEvent::Message(msg) => {
                if msg.sender == self.user_id {
                    return;
                }
                if let Err(e) = self.handle_message(&msg).await {
                    tracing::error!(
                        "Error handling message {} in {} from {}: {:#}",
                        msg.event_id,
                        msg.room_id,
                        msg.sender,
                        e
                    );
                }
            }
        }
    }

    async fn handle_invite(&self, invite: &InviteEvent) -> Result<()> {
        if !self.auto_join {
            tracing::debug!("Auto join disabled, ignoring invite to {}", invite.room_id);
            return Ok(());
        }

        self.rooms
            .create(&Room::new(invite.room_id.clone(), invite.sender.clone()))
            .await
            .context("Failed to save room")?;
        self.client
            .join_room(&invite.room_id)
            .await
            .context("Failed to join room")?;

        tracing::info!("Joined room {} (invited by {})", invite.room_id, invite.sender);
        Ok(())
    }

    /// Parse and dispatch a message that did not come from the bot itself.
    pub async fn handle_message(&self, msg: &MessageEvent) -> Result<()> {
        let command = match self.parser.parse(msg.body.as_deref(), msg.formatted_body.as_deref()) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(CommandError::UnknownCommand(head)) => {
                tracing::warn!("Unknown command {} in {}", head, msg.room_id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Received {} from {} in {}", command.head(), msg.sender, msg.room_id);
        self.dispatch(msg, command).await
    }

    async fn dispatch(&self, msg: &MessageEvent, command: Command) -> Result<()> {
        match command {
            Command::StartShift { holders, unknown } => {
                handlers::shift::handle_start_shift(self, msg, holders, unknown).await
            }
            Command::EndShift { shift_id } => handlers::shift::handle_end_shift(self, msg, shift_id).await,
            Command::ListShifts => handlers::shift::handle_list_shifts(self, msg).await,
            Command::FollowUp { category, initiator, description } => {
                handlers::follow_up::handle_create(self, msg, category, initiator, description).await
            }
            Command::ListFollowUps => handlers::follow_up::handle_list(self, msg).await,
            Command::ResolveFollowUp { id } => handlers::follow_up::handle_resolve(self, msg, id).await,
            Command::Report(range) => handlers::report::handle_report(self, msg, &range).await,
            Command::Help => handlers::handle_help(self, msg).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{message, TestBot, ROOM};
    use crate::matrix::SyncBatch;

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let t = TestBot::new();
        let mut msg = message("!startshift");
        msg.sender = t.bot.user_id.clone();

        t.bot.handle_event(BotEvent::Message(msg)).await;

        assert!(t.shifts.all().is_empty());
        assert!(t.client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_ordinary_chat_and_unknown_commands_get_no_reply() {
        let t = TestBot::new();
        t.bot.handle_event(BotEvent::Message(message("hello there"))).await;
        t.bot.handle_event(BotEvent::Message(message("!unknown"))).await;
        assert!(t.client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_commands_are_errors_without_reply() {
        let t = TestBot::new();
        assert!(t.bot.handle_message(&message("!endshift")).await.is_err());
        assert!(t.bot.handle_message(&message("!endshift abc")).await.is_err());

        let mut no_body = message("");
        no_body.body = None;
        let err = t.bot.handle_message(&no_body).await.unwrap_err();
        assert_eq!(err.downcast_ref::<CommandError>(), Some(&CommandError::InvalidBody));

        assert!(t.client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_invite_saves_room_and_joins() {
        let t = TestBot::new();
        t.bot
            .handle_event(BotEvent::Invite(InviteEvent {
                room_id: "!new:example.org".to_string(),
                sender: "@bob:example.org".to_string(),
            }))
            .await;

        assert_eq!(*t.client.joined.lock().unwrap(), vec!["!new:example.org".to_string()]);
        let rooms = t.rooms.rooms.lock().unwrap();
        assert_eq!(rooms["!new:example.org"].sender, "@bob:example.org");
    }

    #[tokio::test]
    async fn test_invite_ignored_without_auto_join() {
        let t = TestBot::with(|bot| bot.with_auto_join(false));
        t.bot
            .handle_event(BotEvent::Invite(InviteEvent {
                room_id: "!new:example.org".to_string(),
                sender: "@bob:example.org".to_string(),
            }))
            .await;

        assert!(t.client.joined.lock().unwrap().is_empty());
        assert!(t.rooms.rooms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_processes_batches_until_shutdown() {
        let t = TestBot::new();
        let future = chrono::Utc::now().timestamp_millis() + 60_000;

        let mut old = message("!startshift");
        old.origin_server_ts = 0;
        let mut fresh = message("!help");
        fresh.origin_server_ts = future;

        t.client.batches.lock().unwrap().push_back(SyncBatch {
            next_batch: "s1".to_string(),
            events: vec![BotEvent::Message(old), BotEvent::Message(fresh)],
        });

        let (tx, rx) = watch::channel(false);
        let bot = t.bot.clone();
        let handle = tokio::spawn(async move { bot.run(Duration::from_millis(10), rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        // Only the fresh message was answered; the stale !startshift was skipped
        assert!(t.shifts.all().is_empty());
        let sent = t.client.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text().contains("!startshift"));
        assert!(sent.iter().all(|s| matches!(s, crate::matrix::fake::Sent::Formatted { room_id, .. } if room_id == ROOM)));

        let calls = t.client.sync_calls.lock().unwrap();
        assert_eq!(calls[0], None);
        assert_eq!(calls[1].as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_room_locks_serialize_per_room() {
        let locks = Arc::new(RoomLocks::default());
        let guard = locks.lock("!a:x").await;

        // A different room is not blocked
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock("!b:x")).await;
        assert!(other.is_ok());

        // The same room waits until the guard is released
        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock("!a:x")).await;
        assert!(same.is_err());
        drop(guard);
        let same = tokio::time::timeout(Duration::from_millis(50), locks.lock("!a:x")).await;
        assert!(same.is_ok());
    }
}
