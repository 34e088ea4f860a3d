//! On-call day accounting for `!report`.
//!
//! Every shift overlapping the requested window is clipped to it, split into
//! working days and weekly holiday days, and summed per holder.

use crate::commands::ReportRange;
use crate::models::Shift;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use std::collections::BTreeMap;

const WEEK_DAYS: i64 = 7;
const DAY_HOURS: i64 = 24;

/// Weekdays that count as holidays every week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekHolidays {
    days: Vec<Weekday>,
}

impl Default for WeekHolidays {
    fn default() -> Self {
        Self {
            days: vec![Weekday::Thu, Weekday::Fri],
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid weekday {0:?} in holiday list")]
pub struct InvalidWeekday(String);

impl WeekHolidays {
    /// Repeated weekdays are kept once, in first-seen order.
    pub fn new(days: Vec<Weekday>) -> Self {
        let mut unique: Vec<Weekday> = Vec::with_capacity(days.len());
        for day in days {
            if !unique.contains(&day) {
                unique.push(day);
            }
        }
        Self { days: unique }
    }

    /// Parse a comma separated list such as `thu,fri` or `Saturday, Sunday`.
    pub fn parse(list: &str) -> Result<Self, InvalidWeekday> {
        let days = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Weekday>().map_err(|_| InvalidWeekday(s.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(days))
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    /// Split the inclusive day count of `[start, end]` into working and holiday days.
    ///
    /// Whole weeks contribute one holiday per designated weekday. The leftover
    /// partial week is checked by comparing weekday numbers (Sunday = 0) of its
    /// first and last day, not by walking the calendar. When that leftover wraps
    /// past Saturday no holiday is counted for it, and a span shorter than a day
    /// that crosses midnight can count more holidays than days. Reports depend on
    /// these numbers, so the rule is kept as is.
    pub fn date_diff(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DayCount {
        if end < start {
            return DayCount::default();
        }

        let diff_days = (end - start).num_hours() / DAY_HOURS + 1;
        let full_weeks = diff_days / WEEK_DAYS;
        let mut holiday = full_weeks * self.days.len() as i64;

        if diff_days % WEEK_DAYS != 0 {
            let remainder_start = start + Duration::days(full_weeks * WEEK_DAYS);
            let first = remainder_start.weekday().num_days_from_sunday();
            let last = end.weekday().num_days_from_sunday();

            holiday += self
                .days
                .iter()
                .map(Weekday::num_days_from_sunday)
                .filter(|day| first <= *day && *day <= last)
                .count() as i64;
        }

        DayCount {
            working: diff_days - holiday,
            holiday,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCount {
    pub working: i64,
    pub holiday: i64,
}

impl std::ops::AddAssign for DayCount {
    fn add_assign(&mut self, other: Self) {
        self.working += other.working;
        self.holiday += other.holiday;
    }
}

/// A shift cut down to the report window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftSpan {
    pub holder: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ShiftSpan {
    /// Clip `shift` to `[from, to]`. A shift that is still open runs until `to`.
    pub fn clip(shift: &Shift, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let end = shift.end().map_or(to, |end| end.min(to));
        Self {
            holder: shift.holder.clone(),
            start: shift.start().max(from),
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderTotals {
    pub holder: String,
    pub days: DayCount,
}

/// Sum clipped day counts per holder, ordered by holder id.
pub fn aggregate(
    shifts: &[Shift],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    holidays: &WeekHolidays,
) -> Vec<HolderTotals> {
    let mut totals: BTreeMap<String, DayCount> = BTreeMap::new();

    for shift in shifts {
        let span = ShiftSpan::clip(shift, from, to);
        *totals.entry(span.holder).or_default() += holidays.date_diff(span.start, span.end);
    }

    totals
        .into_iter()
        .map(|(holder, days)| HolderTotals { holder, days })
        .collect()
}

/// Why a report request has no usable window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidWindow {
    #[error("malformed report command")]
    Malformed { reason: Option<String> },
    #[error("report start {from} is after its end {to}")]
    Reversed { from: NaiveDate, to: NaiveDate },
}

impl InvalidWindow {
    /// Detail to show next to the usage text, if any.
    pub fn reason(&self) -> Option<String> {
        match self {
            InvalidWindow::Malformed { reason } => reason.clone(),
            InvalidWindow::Reversed { .. } => Some(self.to_string()),
        }
    }
}

/// Concrete `[from, to]` bounds for a report request.
///
/// Dates are taken as midnight UTC of that day; open-ended forms run until `now`.
/// A window that starts after it ends is rejected.
pub fn window(
    range: &ReportRange,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), InvalidWindow> {
    let bounds = match range {
        ReportRange::CurrentMonth => NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .and_then(midnight)
            .map(|from| (from, now)),
        ReportRange::Since(from) => midnight(*from).map(|from| (from, now)),
        ReportRange::Between(from, to) => midnight(*from).zip(midnight(*to)),
        ReportRange::Malformed { reason } => {
            return Err(InvalidWindow::Malformed { reason: reason.clone() })
        }
    };

    let (from, to) = bounds.ok_or(InvalidWindow::Malformed { reason: None })?;
    if from > to {
        return Err(InvalidWindow::Reversed {
            from: from.date_naive(),
            to: to.date_naive(),
        });
    }
    Ok((from, to))
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}
