//! Event categories.

use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// A category events can be filed under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    pub meta: RecordMeta,

    #[serde(default)]
    pub title: String,
}

impl Category {
    pub fn new(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            title: title.to_string(),
        }
    }
}

impl Record for Category {
    const TABLE: &'static str = "categories";
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
