//! Event records: topics, single events and dates.
//!
//! A `Date` points at its `Topic` and borrows the topic's descriptive and
//! price fields whenever its own value is empty. [`Event::effective`] is
//! the one place that fallback is resolved.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};
use crate::error::{BagError, ErrorCode};

/// The three mutually exclusive event variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventKind {
    /// Self-contained event.
    #[default]
    Single,
    /// Shared description for a series of dates.
    Topic,
    /// One concrete occurrence of a topic.
    Date,
}

impl EventKind {
    /// Stored `object_type` value.
    pub fn code(self) -> u8 {
        match self {
            EventKind::Single => 0,
            EventKind::Topic => 1,
            EventKind::Date => 2,
        }
    }
}

impl From<EventKind> for u8 {
    fn from(kind: EventKind) -> Self {
        kind.code()
    }
}

impl TryFrom<u8> for EventKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventKind::Single),
            1 => Ok(EventKind::Topic),
            2 => Ok(EventKind::Date),
            other => Err(format!("unknown event object_type {other}")),
        }
    }
}

/// Planning status of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EventStatus {
    #[default]
    Planned,
    Canceled,
    Confirmed,
}

impl EventStatus {
    /// Stored `cancelled` column value.
    pub fn code(self) -> u8 {
        match self {
            EventStatus::Planned => 0,
            EventStatus::Canceled => 1,
            EventStatus::Confirmed => 2,
        }
    }
}

impl From<EventStatus> for u8 {
    fn from(status: EventStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for EventStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventStatus::Planned),
            1 => Ok(EventStatus::Canceled),
            2 => Ok(EventStatus::Confirmed),
            other => Err(format!("unknown event status {other}")),
        }
    }
}

impl FromStr for EventStatus {
    type Err = BagError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key.trim() {
            "planned" => Ok(EventStatus::Planned),
            "canceled" => Ok(EventStatus::Canceled),
            "confirmed" => Ok(EventStatus::Confirmed),
            other => Err(BagError::invalid_argument(
                ErrorCode::UnknownStatus,
                format!("unknown event status \"{other}\", expected planned, canceled or confirmed"),
            )),
        }
    }
}

/// An event record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub meta: RecordMeta,

    pub object_type: EventKind,

    /// Parent topic uid (dates only).
    #[serde(default)]
    pub topic: Option<u32>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub subtitle: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub accreditation_number: String,

    #[serde(default)]
    pub event_type: Option<u32>,

    /// ISO language code of the event.
    #[serde(default)]
    pub language: String,

    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub begin_date: Option<DateTime<Utc>>,

    /// `None` means the event is open-ended.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub deadline_registration: Option<DateTime<Utc>>,

    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub deadline_early_bird: Option<DateTime<Utc>>,

    #[serde(default)]
    pub price_regular: f64,

    #[serde(default)]
    pub price_regular_early: f64,

    #[serde(default)]
    pub price_special: f64,

    #[serde(default)]
    pub price_special_early: f64,

    #[serde(default)]
    pub needs_registration: bool,

    /// 0 means unlimited.
    #[serde(default)]
    pub attendees_max: u32,

    #[serde(default)]
    pub offline_attendees: u32,

    /// Whether a waiting list is kept once the event is full.
    #[serde(default)]
    pub queue_size: bool,

    #[serde(default)]
    pub cancelled: EventStatus,

    /// Front-end user who owns the record.
    #[serde(default)]
    pub owner_feuser: Option<u32>,
}

impl Event {
    /// A single event.
    pub fn single(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            object_type: EventKind::Single,
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// A topic record.
    pub fn topic(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            object_type: EventKind::Topic,
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// A date belonging to `topic`; all descriptive fields start empty.
    pub fn date(uid: u32, topic: u32) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            object_type: EventKind::Date,
            topic: Some(topic),
            ..Default::default()
        }
    }

    pub fn is_date(&self) -> bool {
        self.object_type == EventKind::Date
    }

    /// Field view with topic fallback applied.
    ///
    /// `topic` is only consulted when this record is a date; passing the
    /// topic for other kinds is harmless.
    pub fn effective<'a>(&'a self, topic: Option<&'a Event>) -> Effective<'a> {
        let topic = if self.is_date() { topic } else { None };
        Effective { event: self, topic }
    }
}

/// Fields of an event after date-to-topic fallback.
#[derive(Debug, Clone, Copy)]
pub struct Effective<'a> {
    event: &'a Event,
    topic: Option<&'a Event>,
}

impl<'a> Effective<'a> {
    fn text(&self, pick: impl Fn(&'a Event) -> &'a str) -> &'a str {
        let own = pick(self.event);
        match self.topic {
            Some(topic) if own.is_empty() => pick(topic),
            _ => own,
        }
    }

    fn price(&self, pick: impl Fn(&Event) -> f64) -> f64 {
        let own = pick(self.event);
        match self.topic {
            Some(topic) if own == 0.0 => pick(topic),
            _ => own,
        }
    }

    pub fn title(&self) -> &'a str {
        self.text(|e| e.title.as_str())
    }

    pub fn subtitle(&self) -> &'a str {
        self.text(|e| e.subtitle.as_str())
    }

    pub fn description(&self) -> &'a str {
        self.text(|e| e.description.as_str())
    }

    pub fn accreditation_number(&self) -> &'a str {
        self.text(|e| e.accreditation_number.as_str())
    }

    pub fn event_type(&self) -> Option<u32> {
        self.event
            .event_type
            .or_else(|| self.topic.and_then(|t| t.event_type))
    }

    pub fn price_regular(&self) -> f64 {
        self.price(|e| e.price_regular)
    }

    pub fn price_regular_early(&self) -> f64 {
        self.price(|e| e.price_regular_early)
    }

    pub fn price_special(&self) -> f64 {
        self.price(|e| e.price_special)
    }

    pub fn price_special_early(&self) -> f64 {
        self.price(|e| e.price_special_early)
    }

    pub fn deadline_early_bird(&self) -> Option<DateTime<Utc>> {
        self.event
            .deadline_early_bird
            .or_else(|| self.topic.and_then(|t| t.deadline_early_bird))
    }

    /// The record the fallback resolved against, if any.
    pub fn topic(&self) -> Option<&'a Event> {
        self.topic
    }
}

impl Record for Event {
    const TABLE: &'static str = "seminars";
    const SORTABLE: &'static [&'static str] = &[
        "object_type",
        "topic",
        "title",
        "subtitle",
        "accreditation_number",
        "event_type",
        "language",
        "begin_date",
        "end_date",
        "deadline_registration",
        "deadline_early_bird",
        "price_regular",
        "price_special",
        "attendees_max",
        "cancelled",
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "object_type" => SortValue::Int(i64::from(self.object_type.code())),
            "topic" => SortValue::from(self.topic),
            "title" => SortValue::from(self.title.as_str()),
            "subtitle" => SortValue::from(self.subtitle.as_str()),
            "accreditation_number" => SortValue::from(self.accreditation_number.as_str()),
            "event_type" => SortValue::from(self.event_type),
            "language" => SortValue::from(self.language.as_str()),
            "begin_date" => SortValue::from(self.begin_date),
            "end_date" => SortValue::from(self.end_date),
            "deadline_registration" => SortValue::from(self.deadline_registration),
            "deadline_early_bird" => SortValue::from(self.deadline_early_bird),
            "price_regular" => SortValue::from(self.price_regular),
            "price_special" => SortValue::from(self.price_special),
            "attendees_max" => SortValue::from(self.attendees_max),
            "cancelled" => SortValue::Int(i64::from(self.cancelled.code())),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}
