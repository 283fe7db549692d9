//! Organizers.

use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// An organization or person running events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    #[serde(flatten)]
    pub meta: RecordMeta,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub email: String,
}

impl Organizer {
    pub fn new(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            title: title.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Organizer {
    const TABLE: &'static str = "organizers";
    const SORTABLE: &'static [&'static str] = &["title", "email"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "title" => SortValue::from(self.title.as_str()),
            "email" => SortValue::from(self.email.as_str()),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}
