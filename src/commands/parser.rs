use super::{Command, CommandError, Head, ReportRange, COMMAND_PREFIX};
use crate::models::FollowUpCategory;
use chrono::NaiveDate;
use regex::Regex;

const MENTION_PATTERN: &str = r#"<a href="https://matrix\.to/#/([^"]*?)">(.*?)</a>"#;
const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Splits message bodies into tokens and builds [`Command`]s.
pub struct CommandParser {
    mention: Regex,
}

impl CommandParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            mention: Regex::new(MENTION_PATTERN)?,
        })
    }

    /// Parse one message.
    ///
    /// Returns `Ok(None)` for ordinary chat (first token lacks the `!` prefix).
    pub fn parse(
        &self,
        body: Option<&str>,
        formatted_body: Option<&str>,
    ) -> Result<Option<Command>, CommandError> {
        let body = body.ok_or(CommandError::InvalidBody)?;
        let parts: Vec<&str> = body.split(' ').collect();

        if !parts[0].starts_with(COMMAND_PREFIX) {
            return Ok(None);
        }

        let head = Head::from_token(parts[0])
            .ok_or_else(|| CommandError::UnknownCommand(parts[0].to_string()))?;

        if parts.len() < head.min_tokens() {
            return Err(CommandError::InvalidCommand {
                head,
                min: head.min_tokens(),
                got: parts.len(),
            });
        }

        let command = match head {
            Head::StartShift => {
                let (holders, unknown) = self.holders(&parts[1..], formatted_body);
                Command::StartShift { holders, unknown }
            }
            Head::EndShift => Command::EndShift {
                shift_id: parse_id(parts[1])?,
            },
            Head::ListShifts => Command::ListShifts,
            Head::FollowUp => Command::FollowUp {
                category: FollowUpCategory::from_token(parts[1]),
                initiator: parts[2].to_string(),
                description: parts[3..].join(" ").trim().to_string(),
            },
            Head::ListFollowUps => Command::ListFollowUps,
            Head::ResolveFollowUp => Command::ResolveFollowUp {
                id: parse_id(parts[1])?,
            },
            Head::Report => Command::Report(parse_report_range(&parts)),
            Head::Help => Command::Help,
        };

        Ok(Some(command))
    }

    /// User ids from `matrix.to` anchors, in order of appearance, without repeats.
    pub fn mentions(&self, html: &str) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for caps in self.mention.captures_iter(html) {
            let id = caps[1].trim();
            if !id.is_empty() && !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        ids
    }

    /// Mentions win over the plain list; neither means "myself".
    ///
    /// The plain list is split on commas and whitespace. Tokens that are not
    /// `@user:server` ids come back in the second vector.
    fn holders(&self, args: &[&str], formatted_body: Option<&str>) -> (Vec<String>, Vec<String>) {
        if let Some(html) = formatted_body {
            let mentioned = self.mentions(html);
            if !mentioned.is_empty() {
                return (mentioned, Vec::new());
            }
        }

        let mut holders: Vec<String> = Vec::new();
        let mut unknown: Vec<String> = Vec::new();
        let tokens = args
            .iter()
            .flat_map(|arg| arg.split(|c: char| c == ',' || c.is_whitespace()))
            .filter(|token| !token.is_empty());
        for token in tokens {
            let bucket = if is_user_id(token) { &mut holders } else { &mut unknown };
            if !bucket.iter().any(|known| known == token) {
                bucket.push(token.to_string());
            }
        }
        (holders, unknown)
    }
}

/// `@localpart:server`, both parts non-empty.
fn is_user_id(token: &str) -> bool {
    match token.strip_prefix('@').and_then(|rest| rest.split_once(':')) {
        Some((localpart, server)) => !localpart.is_empty() && !server.is_empty(),
        None => false,
    }
}

fn parse_id(token: &str) -> Result<i64, CommandError> {
    token.parse::<i64>().map_err(|_| CommandError::InvalidType {
        token: token.to_string(),
        expected: "integer id",
    })
}

fn parse_date(token: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(token, REPORT_DATE_FORMAT)
        .map_err(|e| format!("cannot parse {:?} as YYYY-MM-DD: {}", token, e))
}

fn parse_report_range(parts: &[&str]) -> ReportRange {
    let malformed = |reason| ReportRange::Malformed { reason: Some(reason) };

    match parts {
        [_] => ReportRange::CurrentMonth,
        [_, from_kw, from] if from_kw.eq_ignore_ascii_case("from") => match parse_date(from) {
            Ok(from) => ReportRange::Since(from),
            Err(reason) => malformed(reason),
        },
        [_, from_kw, from, to_kw, to]
            if from_kw.eq_ignore_ascii_case("from") && to_kw.eq_ignore_ascii_case("to") =>
        {
            match (parse_date(from), parse_date(to)) {
                (Ok(from), Ok(to)) => ReportRange::Between(from, to),
                (Err(reason), _) | (_, Err(reason)) => malformed(reason),
            }
        }
        _ => ReportRange::Malformed { reason: None },
    }
}
