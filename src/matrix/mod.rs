pub mod client;
pub mod types;
#[cfg(test)]
pub mod fake;

pub use client::{ChatClient, MatrixClient};
pub use types::{BotEvent, InviteEvent, MessageEvent, SyncBatch};
