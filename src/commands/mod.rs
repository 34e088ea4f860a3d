//! Turning chat message bodies into typed commands.

mod error;
mod parser;

pub use error::CommandError;
pub use parser::CommandParser;

use crate::models::FollowUpCategory;
use chrono::NaiveDate;
use std::fmt;

/// Character every command head starts with
pub const COMMAND_PREFIX: char = '!';

/// Recognized command heads, matched exactly and case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Head {
    StartShift,
    EndShift,
    ListShifts,
    FollowUp,
    ListFollowUps,
    ResolveFollowUp,
    Report,
    Help,
}

impl Head {
    pub const ALL: [Head; 8] = [
        Head::StartShift,
        Head::EndShift,
        Head::ListShifts,
        Head::FollowUp,
        Head::ListFollowUps,
        Head::ResolveFollowUp,
        Head::Report,
        Head::Help,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Head::StartShift => "!startshift",
            Head::EndShift => "!endshift",
            Head::ListShifts => "!listshifts",
            Head::FollowUp => "!followup",
            Head::ListFollowUps => "!listfollowups",
            Head::ResolveFollowUp => "!resolvefollowup",
            Head::Report => "!report",
            Head::Help => "!help",
        }
    }

    /// Exact lookup; `!follow` or `!followups` do not match `!followup`.
    pub fn from_token(token: &str) -> Option<Head> {
        Head::ALL.into_iter().find(|head| head.as_str() == token)
    }

    /// Fewest space-separated tokens, head included.
    pub fn min_tokens(&self) -> usize {
        match self {
            Head::EndShift | Head::ResolveFollowUp => 2,
            Head::FollowUp => 4,
            Head::StartShift | Head::ListShifts | Head::ListFollowUps | Head::Report | Head::Help => 1,
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Date window requested by `!report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRange {
    /// First day of the current month until now
    CurrentMonth,
    /// `from <date>` until now
    Since(NaiveDate),
    /// `from <date> to <date>`
    Between(NaiveDate, NaiveDate),
    /// Wrong shape or an unparsable date; answered with usage help
    Malformed { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty `holders` means the sender goes on call. `unknown` keeps listed
    /// tokens that are not user ids.
    StartShift { holders: Vec<String>, unknown: Vec<String> },
    EndShift { shift_id: i64 },
    ListShifts,
    FollowUp {
        category: FollowUpCategory,
        initiator: String,
        description: String,
    },
    ListFollowUps,
    ResolveFollowUp { id: i64 },
    Report(ReportRange),
    Help,
}

impl Command {
    pub fn head(&self) -> Head {
        match self {
            Command::StartShift { .. } => Head::StartShift,
            Command::EndShift { .. } => Head::EndShift,
            Command::ListShifts => Head::ListShifts,
            Command::FollowUp { .. } => Head::FollowUp,
            Command::ListFollowUps => Head::ListFollowUps,
            Command::ResolveFollowUp { .. } => Head::ResolveFollowUp,
            Command::Report(_) => Head::Report,
            Command::Help => Head::Help,
        }
    }
}
