//! Reply texts. Everything here is rendering; no decisions are made.

use crate::commands::Head;
use crate::models::{FollowUp, Shift};
use crate::report::DayCount;
use chrono::{DateTime, Utc};
use regex::Regex;

pub const ACTIVE_SHIFT_ONGOING: &str =
    "There's an active shift still in progress. You can't start a new one.";
pub const NO_ACTIVE_SHIFT: &str = "There's no active shift. Create one first.";
pub const INVALID_REPORT_COMMAND: &str =
    "Invalid report command. Use !report, !report from YYYY-MM-DD or !report from YYYY-MM-DD to YYYY-MM-DD.";

const DISPLAY_TIME_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S UTC";
const REPORT_TIME_FORMAT: &str = "%b %e %Y %H:%M:%S";

const OPEN_SHIFT: &str = "🟢";
const CLOSED_SHIFT: &str = "⚪️";
const OPEN_FOLLOW_UP: &str = "⭕️";
const DONE_FOLLOW_UP: &str = "✅";

/// A reply carrying HTML and its plain-text fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    pub html: String,
}

/// One line of a report: who, and how many days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub holder_id: String,
    pub display_name: String,
    pub days: DayCount,
}

pub struct MessageFormatter {
    tags: Regex,
}

impl MessageFormatter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            tags: Regex::new(r"<[^>]*>")?,
        })
    }

    fn formatted(&self, html: String) -> Formatted {
        Formatted {
            text: self.plain(&html),
            html,
        }
    }

    /// Strip markup for clients that do not render HTML.
    pub fn plain(&self, html: &str) -> String {
        let spaced = html
            .replace("<li>", "\n• ")
            .replace("<br>", "\n")
            .replace("</h2>", "\n");
        unescape_html(&self.tags.replace_all(&spaced, "")).trim().to_string()
    }

    pub fn shift_started(&self, start: DateTime<Utc>, holders: &[String]) -> Formatted {
        let holders = holders
            .iter()
            .map(|id| mention(id, id))
            .collect::<Vec<_>>()
            .join(", ");
        self.formatted(format!(
            "Shift started at {}. Holders are <b>{}</b>.",
            start.format(DISPLAY_TIME_FORMAT),
            holders
        ))
    }

    pub fn shift_ended(&self, shift_id: i64) -> Formatted {
        self.formatted(format!("Shift with id: <b>{}</b> ended. Good job! :)", shift_id))
    }

    pub fn unknown_holders(&self, tokens: &[String]) -> String {
        format!(
            "Can't start a shift for {}. Mention the on call people or list their user ids (@user:server).",
            tokens.join(", ")
        )
    }

    pub fn shift_not_ended(&self, shift_id: i64) -> String {
        format!("There's no active shift with id {} in this room.", shift_id)
    }

    pub fn shift_list(&self, shifts: &[Shift]) -> Formatted {
        let mut items = String::new();
        for shift in shifts {
            let (glyph, end) = match shift.end() {
                Some(end) => (CLOSED_SHIFT, end.format(DISPLAY_TIME_FORMAT).to_string()),
                None => (OPEN_SHIFT, "-".to_string()),
            };
            items.push_str(&format!(
                "<li>{} <b>Start time</b>: {} | <b>End time</b>: {} | <b>Holder</b>: {} | <b>id</b>: {}</li>",
                glyph,
                shift.start().format(DISPLAY_TIME_FORMAT),
                end,
                mention(&shift.holder, &shift.holder),
                shift.id
            ));
        }
        self.formatted(format!("<ol>{}</ol>", items))
    }

    pub fn follow_up_created(&self, id: i64) -> Formatted {
        self.formatted(format!(
            "Follow up created. List all follow ups with {} or mark this follow up as resolved by {} {}",
            Head::ListFollowUps,
            Head::ResolveFollowUp,
            id
        ))
    }

    pub fn follow_up_list(&self, items: &[FollowUp]) -> Formatted {
        let mut list = String::new();
        for item in items {
            let glyph = if item.done { DONE_FOLLOW_UP } else { OPEN_FOLLOW_UP };
            list.push_str(&format!(
                "<li>{} <b>id</b>: {} | <b>Category</b>: {} | <b>Initiator</b>: {} | <b>Description</b>: {} | <b>Created at</b>: {}</li>",
                glyph,
                item.id,
                escape_html(&item.category),
                escape_html(&item.initiator),
                escape_html(&item.description),
                item.created().format(DISPLAY_TIME_FORMAT)
            ));
        }
        self.formatted(format!("<ol>{}</ol>", list))
    }

    pub fn follow_up_resolved(&self, id: i64) -> Formatted {
        self.formatted(format!("Follow up with id: <b>{}</b>, marked as resolved.", id))
    }

    pub fn invalid_report_command(&self, reason: Option<&str>) -> String {
        match reason {
            Some(reason) => format!("{} Error: {}", INVALID_REPORT_COMMAND, reason),
            None => INVALID_REPORT_COMMAND.to_string(),
        }
    }

    pub fn report(&self, from: DateTime<Utc>, to: DateTime<Utc>, lines: &[ReportLine]) -> Formatted {
        let mut html = format!(
            "<h2>On-call report</h2><p>From <b>{}</b> to <b>{}</b></p>",
            from.format(REPORT_TIME_FORMAT),
            to.format(REPORT_TIME_FORMAT)
        );

        if lines.is_empty() {
            html.push_str("<p>No shifts in this period.</p>");
        } else {
            html.push_str("<ul>");
            for line in lines {
                html.push_str(&format!(
                    "<li>{}: <b>{}</b> working days, <b>{}</b> holidays</li>",
                    mention(&line.holder_id, &line.display_name),
                    line.days.working,
                    line.days.holiday
                ));
            }
            html.push_str("</ul>");
        }

        self.formatted(html)
    }

    pub fn help(&self) -> Formatted {
        self.formatted(
            "<h2>Shift commands:</h2>\
             <ul>\
             <li>!startshift [mentions or comma separated user ids] <b>=&gt;</b> start a new shift (yourself when nobody is named)</li>\
             <li>!listshifts <b>=&gt;</b> list all shifts</li>\
             <li>!endshift &lt;shift id&gt; <b>=&gt;</b> end a shift</li>\
             </ul>\
             <h2>Follow up commands:</h2>\
             <ul>\
             <li>!followup &lt;category: incoming|outgoing&gt; &lt;initiator&gt; &lt;description&gt; <b>=&gt;</b> create a new follow up</li>\
             <li>!listfollowups <b>=&gt;</b> list follow ups of the active shift</li>\
             <li>!resolvefollowup &lt;id&gt; <b>=&gt;</b> resolve a follow up</li>\
             </ul>\
             <h2>Report commands:</h2>\
             <ul>\
             <li>!report <b>=&gt;</b> on-call days since the start of this month</li>\
             <li>!report from YYYY-MM-DD <b>=&gt;</b> on-call days since a date</li>\
             <li>!report from YYYY-MM-DD to YYYY-MM-DD <b>=&gt;</b> on-call days between two dates</li>\
             </ul>\
             <p>!help <b>=&gt;</b> show this message</p>"
                .to_string(),
        )
    }
}

/// `matrix.to` pill for a user.
pub fn mention(user_id: &str, name: &str) -> String {
    format!(
        r#"<a href="https://matrix.to/#/{}">{}</a>"#,
        escape_html(user_id),
        escape_html(name)
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_html(escaped: &str) -> String {
    escaped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
