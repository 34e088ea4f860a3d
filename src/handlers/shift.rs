use crate::bot::Bot;
use crate::db::StoreError;
use crate::format::ACTIVE_SHIFT_ONGOING;
use crate::matrix::MessageEvent;
use crate::models::Shift;
use anyhow::{Context, Result};
use chrono::Utc;

/// Start a shift for `holders`, or for the sender when none are named.
///
/// Refused with an informational reply while the room has an active shift, or
/// when the holder list names something that is not a user id.
pub async fn handle_start_shift(
    bot: &Bot,
    event: &MessageEvent,
    holders: Vec<String>,
    unknown: Vec<String>,
) -> Result<()> {
    if !unknown.is_empty() {
        tracing::warn!("Refusing shift in {} for unknown holders {:?}", event.room_id, unknown);
        bot.client
            .send_text(&event.room_id, &bot.formatter.unknown_holders(&unknown))
            .await
            .context("Failed to send unknown holders message")?;
        return Ok(());
    }

    let _room = bot.lock_room(&event.room_id).await;

    let active = bot
        .shifts
        .active(&event.room_id)
        .await
        .context("Failed to get active shifts")?;

    if !active.is_empty() {
        return reply_active_shift(bot, event).await;
    }

    let holders = if holders.is_empty() {
        vec![event.sender.clone()]
    } else {
        holders
    };

    let now = Utc::now();
    let rows: Vec<Shift> = holders
        .iter()
        .map(|holder| Shift::new(event.room_id.clone(), event.sender.clone(), holder.clone(), now))
        .collect();

    match bot.shifts.create(&rows).await {
        Ok(ids) => {
            tracing::info!("Started shift {:?} in {} for {:?}", ids, event.room_id, holders);
        }
        Err(StoreError::ActiveShiftConflict { .. }) => {
            return reply_active_shift(bot, event).await;
        }
        Err(e) => return Err(e).context("Failed to save shift"),
    }

    let reply = bot.formatter.shift_started(now, &holders);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send shift started message")?;

    Ok(())
}

async fn reply_active_shift(bot: &Bot, event: &MessageEvent) -> Result<()> {
    bot.client
        .send_text(&event.room_id, ACTIVE_SHIFT_ONGOING)
        .await
        .context("Failed to send active shift message")
}

/// End the active shift containing `shift_id` in this room.
pub async fn handle_end_shift(bot: &Bot, event: &MessageEvent, shift_id: i64) -> Result<()> {
    let _room = bot.lock_room(&event.room_id).await;

    let ended = bot
        .shifts
        .end(&event.room_id, shift_id, Utc::now())
        .await
        .context("Failed to update shift")?;

    if ended == 0 {
        tracing::warn!("No active shift {} in {}", shift_id, event.room_id);
        bot.client
            .send_text(&event.room_id, &bot.formatter.shift_not_ended(shift_id))
            .await
            .context("Failed to send shift not ended message")?;
        return Ok(());
    }

    let reply = bot.formatter.shift_ended(shift_id);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send shift end message")?;

    Ok(())
}

pub async fn handle_list_shifts(bot: &Bot, event: &MessageEvent) -> Result<()> {
    let shifts = bot
        .shifts
        .get(&event.room_id)
        .await
        .context("Failed to get shifts")?;

    let reply = bot.formatter.shift_list(&shifts);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send shifts list")?;

    Ok(())
}
