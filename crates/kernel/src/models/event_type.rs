//! Event types.

use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// The type of an event (workshop, lecture, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    #[serde(flatten)]
    pub meta: RecordMeta,

    #[serde(default)]
    pub title: String,
}

impl EventType {
    pub fn new(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            title: title.to_string(),
        }
    }
}

impl Record for EventType {
    const TABLE: &'static str = "event_types";
    const SORTABLE: &'static [&'static str] = &["title"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "title" => SortValue::from(self.title.as_str()),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}
