//! Record models.
//!
//! Every record type shares a [`RecordMeta`] header (uid, container,
//! soft-delete and visibility flags) and implements [`Record`], which gives
//! the engine its table name, sortable columns and column values.

pub mod category;
pub mod event;
pub mod event_type;
pub mod organizer;
pub mod place;
pub mod registration;
pub mod relation;
pub mod speaker;
pub mod target_group;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use category::Category;
pub use event::{Effective, Event, EventKind, EventStatus};
pub use event_type::EventType;
pub use organizer::Organizer;
pub use place::Place;
pub use registration::Registration;
pub use relation::{Relation, RelationRow};
pub use speaker::Speaker;
pub use target_group::TargetGroup;

/// Columns every record carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Positive identifier, unique per record type.
    pub uid: u32,

    /// Container (page) the record lives in.
    #[serde(default)]
    pub pid: u32,

    /// Soft-delete flag.
    #[serde(default)]
    pub deleted: bool,

    /// Hidden flag.
    #[serde(default)]
    pub hidden: bool,

    /// Record becomes visible at this instant.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub starttime: Option<DateTime<Utc>>,

    /// Record stops being visible at this instant.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub endtime: Option<DateTime<Utc>>,

    /// Unix timestamp when created.
    #[serde(default)]
    pub crdate: i64,
}

impl RecordMeta {
    /// Header for a fresh record in container 0.
    pub fn new(uid: u32) -> Self {
        Self {
            uid,
            ..Default::default()
        }
    }

    /// Whether the record passes the default visibility rules at `now`.
    ///
    /// Deleted records never pass. Hidden records and records outside their
    /// visibility window pass only when `show_hidden` is set.
    pub fn is_visible(&self, now: DateTime<Utc>, show_hidden: bool) -> bool {
        if self.deleted {
            return false;
        }
        if show_hidden {
            return true;
        }
        !self.hidden
            && self.starttime.is_none_or(|start| start <= now)
            && self.endtime.is_none_or(|end| end > now)
    }

    /// Value of one of the shared columns.
    pub fn column(&self, name: &str) -> Option<SortValue> {
        let value = match name {
            "uid" => SortValue::Int(i64::from(self.uid)),
            "pid" => SortValue::Int(i64::from(self.pid)),
            "crdate" => SortValue::Int(self.crdate),
            "starttime" => SortValue::from(self.starttime),
            "endtime" => SortValue::from(self.endtime),
            _ => return None,
        };
        Some(value)
    }
}

/// Columns shared by every table that may appear in an ORDER BY.
pub const META_SORTABLE: &[&str] = &["uid", "pid", "crdate", "starttime", "endtime"];

/// A record type the engine can query.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Table holding the records.
    const TABLE: &'static str;

    /// Record-specific sortable columns (shared ones come from [`META_SORTABLE`]).
    const SORTABLE: &'static [&'static str];

    /// Shared header.
    fn meta(&self) -> &RecordMeta;

    /// Value of a sortable column; `SortValue::Null` for unknown names.
    fn column(&self, name: &str) -> SortValue;

    /// The record uid.
    fn uid(&self) -> u32 {
        self.meta().uid
    }

    /// Resolve a column name to its static form if it may be sorted on.
    fn sortable_column(name: &str) -> Option<&'static str> {
        META_SORTABLE
            .iter()
            .chain(Self::SORTABLE.iter())
            .find(|column| **column == name)
            .copied()
    }
}

/// A single column value, ordered the way PostgreSQL orders it
/// (NULL sorts after every value in ascending order).
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            SortValue::Int(_) | SortValue::Float(_) => 0,
            SortValue::Text(_) => 1,
            SortValue::Null => 2,
        }
    }
}

impl Eq for SortValue {}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Int(a), SortValue::Int(b)) => a.cmp(b),
            (SortValue::Float(a), SortValue::Float(b)) => a.total_cmp(b),
            (SortValue::Int(a), SortValue::Float(b)) => (*a as f64).total_cmp(b),
            (SortValue::Float(a), SortValue::Int(b)) => a.total_cmp(&(*b as f64)),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<Option<DateTime<Utc>>> for SortValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(SortValue::Null, |at| SortValue::Int(at.timestamp()))
    }
}

impl From<Option<u32>> for SortValue {
    fn from(value: Option<u32>) -> Self {
        value.map_or(SortValue::Null, |v| SortValue::Int(i64::from(v)))
    }
}

impl From<u32> for SortValue {
    fn from(value: u32) -> Self {
        SortValue::Int(i64::from(value))
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        SortValue::Int(i64::from(value))
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        SortValue::Float(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Text(value.to_string())
    }
}
