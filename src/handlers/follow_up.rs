use crate::bot::Bot;
use crate::format::NO_ACTIVE_SHIFT;
use crate::matrix::MessageEvent;
use crate::models::{FollowUp, FollowUpCategory, Shift};
use anyhow::{Context, Result};

/// The shift follow-ups attach to, or `None` after telling the room there is none.
async fn active_shift(bot: &Bot, event: &MessageEvent) -> Result<Option<Shift>> {
    let active = bot
        .shifts
        .active(&event.room_id)
        .await
        .context("Failed to get active shifts")?;

    match active.into_iter().next() {
        Some(shift) => Ok(Some(shift)),
        None => {
            bot.client
                .send_text(&event.room_id, NO_ACTIVE_SHIFT)
                .await
                .context("Failed to send no active shift message")?;
            Ok(None)
        }
    }
}

pub async fn handle_create(
    bot: &Bot,
    event: &MessageEvent,
    category: FollowUpCategory,
    initiator: String,
    description: String,
) -> Result<()> {
    let Some(shift) = active_shift(bot, event).await? else {
        return Ok(());
    };

    let item = FollowUp::new(shift.id, event.sender.clone(), initiator, description, category);
    let id = bot
        .follow_ups
        .create(&item)
        .await
        .context("Failed to save follow up")?;

    tracing::info!("Created {} follow up {} on shift {}", category, id, shift.id);

    let reply = bot.formatter.follow_up_created(id);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send follow up created message")?;

    Ok(())
}

pub async fn handle_list(bot: &Bot, event: &MessageEvent) -> Result<()> {
    let Some(shift) = active_shift(bot, event).await? else {
        return Ok(());
    };

    let items = bot
        .follow_ups
        .get(shift.id)
        .await
        .context("Failed to get follow ups")?;

    let reply = bot.formatter.follow_up_list(&items);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send list of follow ups")?;

    Ok(())
}

/// Mark a follow-up done. The id is not checked against the room or shift,
/// and the reply confirms even when nothing matched.
pub async fn handle_resolve(bot: &Bot, event: &MessageEvent, id: i64) -> Result<()> {
    let changed = bot
        .follow_ups
        .resolve(id)
        .await
        .context("Failed to update follow up")?;

    if changed == 0 {
        tracing::warn!("Resolved follow up {} did not exist", id);
    }

    let reply = bot.formatter.follow_up_resolved(id);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send follow up resolved message")?;

    Ok(())
}
