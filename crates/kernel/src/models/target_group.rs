//! Target groups.

use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// An audience an event addresses, with an inclusive age range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetGroup {
    #[serde(flatten)]
    pub meta: RecordMeta,

    #[serde(default)]
    pub title: String,

    /// Youngest age addressed; 0 means no lower bound.
    #[serde(default)]
    pub minimum_age: u32,

    /// Oldest age addressed; 0 means no upper bound.
    #[serde(default)]
    pub maximum_age: u32,
}

impl TargetGroup {
    pub fn new(uid: u32, title: &str) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Group with an age range; 0 on either side leaves that side open.
    pub fn aged(uid: u32, title: &str, minimum_age: u32, maximum_age: u32) -> Self {
        Self {
            minimum_age,
            maximum_age,
            ..Self::new(uid, title)
        }
    }

    /// Whether `age` lies inside the inclusive range.
    pub fn contains_age(&self, age: u32) -> bool {
        (self.minimum_age == 0 || self.minimum_age <= age)
            && (self.maximum_age == 0 || age <= self.maximum_age)
    }
}

impl Record for TargetGroup {
    const TABLE: &'static str = "target_groups";
    const SORTABLE: &'static [&'static str] = &["title", "minimum_age", "maximum_age"];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "title" => SortValue::from(self.title.as_str()),
            "minimum_age" => SortValue::from(self.minimum_age),
            "maximum_age" => SortValue::from(self.maximum_age),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_range_is_inclusive() {
        let group = TargetGroup::aged(1, "teens", 5, 15);
        assert!(group.contains_age(5));
        assert!(group.contains_age(15));
        assert!(!group.contains_age(16));
        assert!(!group.contains_age(4));
    }

    #[test]
    fn zero_bounds_are_open() {
        assert!(TargetGroup::aged(1, "adults", 18, 0).contains_age(99));
        assert!(TargetGroup::aged(2, "kids", 0, 12).contains_age(1));
        assert!(TargetGroup::new(3, "everyone").contains_age(40));
    }
}
