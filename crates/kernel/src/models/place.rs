//! Places (venues).

use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// A venue events take place at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub meta: RecordMeta,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub country: String,
}

impl Place {
    pub fn new(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            title: title.to_string(),
            ..Default::default()
        }
    }
}

impl Record for Place {
    const TABLE: &'static str = "places";
    const SORTABLE: &'static [&'static str] = &["title", "city", "country"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "title" => SortValue::from(self.title.as_str()),
            "city" => SortValue::from(self.city.as_str()),
            "country" => SortValue::from(self.country.as_str()),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}
