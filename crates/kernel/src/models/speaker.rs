//! Speakers.

use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// A person speaking at events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    #[serde(flatten)]
    pub meta: RecordMeta,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub organization: String,
}

impl Speaker {
    pub fn new(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            title: title.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Speaker {
    const TABLE: &'static str = "speakers";
    const SORTABLE: &'static [&'static str] = &["title", "organization"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "title" => SortValue::from(self.title.as_str()),
            "organization" => SortValue::from(self.organization.as_str()),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}
