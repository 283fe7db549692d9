//! Named time windows for events.
//!
//! All comparisons are inclusive at the boundaries. A missing end date means
//! the event is open-ended; a missing begin date means it has not been
//! scheduled yet and is treated as upcoming.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BagError, ErrorCode};

/// A named time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeFrame {
    Past,
    PastAndCurrent,
    Current,
    CurrentAndUpcoming,
    Upcoming,
    UpcomingWithBeginDate,
    DeadlineNotOver,
    Today,
    All,
}

impl TimeFrame {
    /// Every window, in documentation order.
    pub const ALL: [TimeFrame; 9] = [
        TimeFrame::Past,
        TimeFrame::PastAndCurrent,
        TimeFrame::Current,
        TimeFrame::CurrentAndUpcoming,
        TimeFrame::Upcoming,
        TimeFrame::UpcomingWithBeginDate,
        TimeFrame::DeadlineNotOver,
        TimeFrame::Today,
        TimeFrame::All,
    ];

    /// The key callers use to select this window.
    pub fn key(self) -> &'static str {
        match self {
            TimeFrame::Past => "past",
            TimeFrame::PastAndCurrent => "pastAndCurrent",
            TimeFrame::Current => "current",
            TimeFrame::CurrentAndUpcoming => "currentAndUpcoming",
            TimeFrame::Upcoming => "upcoming",
            TimeFrame::UpcomingWithBeginDate => "upcomingWithBeginDate",
            TimeFrame::DeadlineNotOver => "deadlineNotOver",
            TimeFrame::Today => "today",
            TimeFrame::All => "all",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for TimeFrame {
    type Err = BagError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        TimeFrame::ALL
            .into_iter()
            .find(|frame| frame.key() == key)
            .ok_or_else(|| {
                BagError::invalid_argument(
                    ErrorCode::UnknownTimeFrame,
                    format!("\"{key}\" is not a valid time-frame key"),
                )
            })
    }
}

/// The date fields a window looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDates {
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub registration_deadline: Option<DateTime<Utc>>,
}

/// First and last instant of the UTC day containing `now`.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_days(Days::new(1))
        .map_or(start, |next| next - chrono::Duration::seconds(1));
    (start, end)
}

fn is_current(dates: &EventDates, now: DateTime<Utc>) -> bool {
    match dates.begin {
        Some(begin) => begin <= now && dates.end.is_none_or(|end| end >= now),
        None => false,
    }
}

fn is_past(dates: &EventDates, now: DateTime<Utc>) -> bool {
    dates.end.is_some_and(|end| end < now)
}

fn is_upcoming(dates: &EventDates, now: DateTime<Utc>) -> bool {
    dates.begin.is_none_or(|begin| begin > now)
}

/// Whether an event with `dates` falls into `frame` at `now`.
pub fn matches(frame: TimeFrame, dates: &EventDates, now: DateTime<Utc>) -> bool {
    match frame {
        TimeFrame::Past => is_past(dates, now),
        TimeFrame::PastAndCurrent => is_past(dates, now) || is_current(dates, now),
        TimeFrame::Current => is_current(dates, now),
        TimeFrame::CurrentAndUpcoming => is_current(dates, now) || is_upcoming(dates, now),
        TimeFrame::Upcoming => is_upcoming(dates, now),
        TimeFrame::UpcomingWithBeginDate => dates.begin.is_some_and(|begin| begin > now),
        TimeFrame::DeadlineNotOver => match dates.registration_deadline {
            Some(deadline) => deadline > now,
            None => is_upcoming(dates, now),
        },
        TimeFrame::Today => {
            let (start_of_day, end_of_day) = day_bounds(now);
            match dates.begin {
                Some(begin) => {
                    begin <= end_of_day && dates.end.is_none_or(|end| end >= start_of_day)
                }
                None => false,
            }
        }
        TimeFrame::All => true,
    }
}
