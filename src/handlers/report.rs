use crate::bot::Bot;
use crate::commands::ReportRange;
use crate::format::ReportLine;
use crate::matrix::MessageEvent;
use crate::report;
use anyhow::{Context, Result};
use chrono::Utc;

/// Per-holder working and holiday days for the requested window.
///
/// Any storage or display name failure aborts the whole report; nothing
/// partial is sent.
pub async fn handle_report(bot: &Bot, event: &MessageEvent, range: &ReportRange) -> Result<()> {
    let (from, to) = match report::window(range, Utc::now()) {
        Ok(bounds) => bounds,
        Err(err) => {
            let reason = err.reason();
            bot.client
                .send_text(&event.room_id, &bot.formatter.invalid_report_command(reason.as_deref()))
                .await
                .context("Failed to send invalid report command message")?;
            return Ok(());
        }
    };

    let shifts = bot
        .shifts
        .report(&event.room_id, from, to)
        .await
        .context("Failed to get shifts for report")?;

    let totals = report::aggregate(&shifts, from, to, &bot.holidays);

    let mut lines = Vec::with_capacity(totals.len());
    for total in totals {
        let display_name = bot
            .client
            .display_name(&total.holder)
            .await
            .with_context(|| format!("Failed to get display name of {}", total.holder))?;
        lines.push(ReportLine {
            holder_id: total.holder,
            display_name,
            days: total.days,
        });
    }

    let reply = bot.formatter.report(from, to, &lines);
    bot.client
        .send_formatted(&event.room_id, &reply.text, &reply.html)
        .await
        .context("Failed to send report")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{TestBot, ROOM};
    use crate::matrix::fake::FakeChatClient;
    use crate::models::Shift;
    use chrono::{DateTime, TimeZone};

    fn day(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 0, 0, 0).unwrap()
    }

    fn seed(t: &TestBot, holder: &str, start: DateTime<Utc>, end: Option<DateTime<Utc>>) {
        let mut shifts = t.shifts.shifts.lock().unwrap();
        let id = shifts.len() as i64 + 1;
        shifts.insert(id, Shift {
            id,
            room_id: ROOM.to_string(),
            sender: holder.to_string(),
            holder: holder.to_string(),
            start_time: start.timestamp(),
            end_time: end.map(|e| e.timestamp()),
        });
    }

    fn named_client() -> FakeChatClient {
        FakeChatClient::default()
            .with_display_name("@alice:example.org", "Alice")
            .with_display_name("@bob:example.org", "Bob")
    }

    #[tokio::test]
    async fn test_report_between_dates() {
        let t = TestBot::with_client(named_client(), |bot| bot);
        // Straddles the whole window: Mon 4 Mar to Sun 17 Mar
        seed(&t, "@alice:example.org", day(2, 20), Some(day(3, 30)));
        // Ends before the window
        seed(&t, "@bob:example.org", day(2, 1), Some(day(2, 10)));
        // Still open, starts on Monday 11 Mar
        seed(&t, "@bob:example.org", day(3, 11), None);

        t.say("!report from 2024-03-04 to 2024-03-17").await.unwrap();

        let sent = t.client.last_sent();
        let text = sent.text();
        assert!(text.contains("Alice: 10 working days, 4 holidays"), "{}", text);
        // Mon 11 through Sun 17 is one full week
        assert!(text.contains("Bob: 5 working days, 2 holidays"), "{}", text);
        assert!(sent.html().unwrap().contains("https://matrix.to/#/@alice:example.org"));
    }

    #[tokio::test]
    async fn test_report_with_custom_holidays() {
        let holidays = report::WeekHolidays::parse("sat,sun").unwrap();
        let t = TestBot::with_client(named_client(), |bot| bot.with_holidays(holidays));
        seed(&t, "@alice:example.org", day(3, 1), Some(day(3, 31)));

        t.say("!report from 2024-03-04 to 2024-03-10").await.unwrap();
        assert!(t.client.last_sent().text().contains("Alice: 5 working days, 2 holidays"));
    }

    #[tokio::test]
    async fn test_report_without_shifts() {
        let t = TestBot::new();
        t.say("!report").await.unwrap();
        assert!(t.client.last_sent().text().contains("No shifts in this period."));
    }

    #[tokio::test]
    async fn test_report_malformed_replies_with_usage() {
        let t = TestBot::new();
        t.say("!report from").await.unwrap();
        assert_eq!(t.client.last_sent().text(), crate::format::INVALID_REPORT_COMMAND);

        t.say("!report from 2024-02-30").await.unwrap();
        let text = t.client.last_sent().text().to_string();
        assert!(text.starts_with(crate::format::INVALID_REPORT_COMMAND));
        assert!(text.contains("2024-02-30"));
    }

    #[tokio::test]
    async fn test_reversed_range_replies_with_usage() {
        // No display names known, so any lookup would fail the command
        let t = TestBot::new();
        seed(&t, "@alice:example.org", day(3, 1), Some(day(3, 31)));

        t.say("!report from 2024-03-20 to 2024-03-10").await.unwrap();
        let text = t.client.last_sent().text().to_string();
        assert!(text.starts_with(crate::format::INVALID_REPORT_COMMAND), "{}", text);
        assert!(text.contains("2024-03-20"), "{}", text);

        t.say("!report from 9999-01-01").await.unwrap();
        assert!(t.client.last_sent().text().starts_with(crate::format::INVALID_REPORT_COMMAND));
        assert_eq!(t.client.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_display_name_failure_aborts_report() {
        // No display names known to the client
        let t = TestBot::new();
        seed(&t, "@alice:example.org", day(3, 4), Some(day(3, 5)));

        let result = t.say("!report from 2024-03-01 to 2024-03-31").await;
        assert!(result.is_err());
        assert!(t.client.sent().is_empty());
    }
}
