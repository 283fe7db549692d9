//! Many-to-many relation catalogue.

use serde::{Deserialize, Serialize};

/// A many-to-many association table.
///
/// Rows link `uid_local` (the owning side) to `uid_foreign` and carry an
/// explicit `sorting` used for "relation order" sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Event -> category.
    Categories,
    /// Event -> organizer.
    Organizers,
    /// Event -> speaker.
    Speakers,
    /// Event -> place.
    Places,
    /// Event -> target group.
    TargetGroups,
    /// Event -> managing front-end user.
    Managers,
    /// Topic -> topic it requires.
    Requirements,
    /// Registration -> additional attending front-end user.
    AdditionalPersons,
}

impl Relation {
    /// Name of the mm table.
    pub fn table(self) -> &'static str {
        match self {
            Relation::Categories => "seminars_categories_mm",
            Relation::Organizers => "seminars_organizers_mm",
            Relation::Speakers => "seminars_speakers_mm",
            Relation::Places => "seminars_place_mm",
            Relation::TargetGroups => "seminars_target_groups_mm",
            Relation::Managers => "seminars_managers_mm",
            Relation::Requirements => "seminars_requirements_mm",
            Relation::AdditionalPersons => "registrations_additional_persons_mm",
        }
    }

    /// Whether a date record without own rows uses its topic's rows instead.
    pub fn inherits_from_topic(self) -> bool {
        matches!(
            self,
            Relation::Categories | Relation::Organizers | Relation::TargetGroups
        )
    }
}

/// One row of an mm table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRow {
    pub uid_local: u32,
    pub uid_foreign: u32,
    #[serde(default)]
    pub sorting: u32,
}

impl RelationRow {
    pub fn new(uid_local: u32, uid_foreign: u32, sorting: u32) -> Self {
        Self {
            uid_local,
            uid_foreign,
            sorting,
        }
    }
}
