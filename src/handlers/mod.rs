pub mod follow_up;
pub mod report;
pub mod shift;
#[cfg(test)]
pub mod test_support;

use crate::bot::Bot;
use crate::matrix::MessageEvent;
use anyhow::{Context, Result};

pub async fn handle_help(bot: &Bot, event: &MessageEvent) -> Result<()> {
    let reply = bot.formatter.help();
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send help")?;
    Ok(())
}
