//! Predicate fragments and the named-fragment composer.
//!
//! Builders never concatenate SQL. Each filter call stores one typed
//! [`Predicate`] under a fixed fragment name; compiling folds every stored
//! fragment plus the default visibility rule into one conjunction. Store
//! backends either evaluate the tree directly or render it to SQL.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::timeframe::TimeFrame;
use crate::models::{EventKind, EventStatus, Relation};

/// Fragment names used by the builders.
pub mod fragment {
    pub const CONTAINERS: &str = "containers";
    pub const UIDS: &str = "uids";
    pub const EXCLUDED_UIDS: &str = "excluded_uids";

    pub const TIME_FRAME: &str = "time_frame";
    pub const TOPICS_ONLY: &str = "topic_records";
    pub const DATES_AND_SINGLES: &str = "date_and_single_records";
    pub const CATEGORIES: &str = "categories";
    pub const ORGANIZERS: &str = "organizers";
    pub const PLACES: &str = "places";
    pub const SPEAKERS: &str = "speakers";
    pub const EVENT_TYPES: &str = "event_types";
    pub const CITIES: &str = "cities";
    pub const COUNTRIES: &str = "countries";
    pub const LANGUAGES: &str = "languages";
    pub const FULL_TEXT: &str = "full_text";
    pub const MAXIMUM_PRICE: &str = "maximum_price";
    pub const MINIMUM_PRICE: &str = "minimum_price";
    pub const VACANCIES: &str = "vacancies";
    pub const AGE: &str = "age";
    pub const STATUS: &str = "status";
    pub const OWNER: &str = "owner";
    pub const MANAGER: &str = "event_manager";
    pub const TOPIC_DATES: &str = "topic_dates";
    pub const OTHER_DATES: &str = "other_dates_for_topic";
    pub const REQUIREMENTS: &str = "requirements";
    pub const EARLIEST_DATE: &str = "earliest_begin_or_end";
    pub const LATEST_DATE: &str = "latest_begin_or_end";
    pub const DAYS_BEFORE_BEGIN: &str = "days_before_begin";

    pub const EVENT: &str = "event";
    pub const PAYMENT: &str = "payment";
    pub const QUEUE: &str = "queue";
    pub const SEATS: &str = "seats";
    pub const ATTENDEE: &str = "attendee";
    pub const EXISTING_USERS: &str = "existing_users";

    pub const RELATED_EVENTS: &str = "related_events";
}

/// Place column a place-attribute filter matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceAttribute {
    City,
    Country,
}

impl PlaceAttribute {
    pub fn column(self) -> &'static str {
        match self {
            PlaceAttribute::City => "city",
            PlaceAttribute::Country => "country",
        }
    }
}

/// A typed filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches no record.
    Nothing,
    /// Every child must match.
    All(Vec<Predicate>),

    /// Default visibility: never deleted; hidden or out-of-window records
    /// only with `show_hidden`.
    Visible {
        now: DateTime<Utc>,
        show_hidden: bool,
    },
    UidIn(BTreeSet<u32>),
    UidNotIn(BTreeSet<u32>),
    /// Records in `roots` or in containers up to `depth` child hops below them.
    ContainerTree { roots: BTreeSet<u32>, depth: u32 },
    /// Records in exactly these containers.
    ContainerIn(BTreeSet<u32>),

    // Events.
    KindIn(BTreeSet<EventKind>),
    TimeFrame {
        frame: TimeFrame,
        now: DateTime<Utc>,
    },
    /// Linked through `relation` to any of `ids` (topic rows used for dates
    /// without own rows when the relation inherits).
    Related {
        relation: Relation,
        ids: BTreeSet<u32>,
    },
    EventTypeIn(BTreeSet<u32>),
    PlaceAttributeIn {
        attribute: PlaceAttribute,
        values: Vec<String>,
    },
    LanguageIn(Vec<String>),
    /// Every token must occur in at least one searchable field.
    FullText(Vec<String>),
    PriceAtMost {
        bound: f64,
        now: DateTime<Utc>,
    },
    PriceAtLeast {
        bound: f64,
        now: DateTime<Utc>,
    },
    HasVacancy,
    AgeWithin(u32),
    StatusIn(BTreeSet<EventStatus>),
    Owner(u32),
    DatesOfTopic(u32),
    /// Topics the anchor topic requires.
    RequiredBy(u32),
    /// Topics requiring the anchor topic, minus the anchor's own requirements.
    DependingOn(u32),
    BeginOrEndAtLeast(DateTime<Utc>),
    BeginOrEndAtMost(DateTime<Utc>),
    BeginWithin {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    // Registrations.
    ForEvents(BTreeSet<u32>),
    Paid(bool),
    OnQueue(bool),
    SeatsAtMost(u32),
    Attendee(u32),
    HasUser,

    // Records linked to events (categories, organizers, ...).
    RelatedToEvents {
        relation: Relation,
        events: BTreeSet<u32>,
    },
}

impl Predicate {
    /// Children of a conjunction, or the predicate itself.
    pub fn conjuncts(&self) -> &[Predicate] {
        match self {
            Predicate::All(children) => children,
            other => std::slice::from_ref(other),
        }
    }

    /// Whether evaluating this predicate reads the parent topic of a date.
    pub fn reads_topic(&self) -> bool {
        match self {
            Predicate::All(children) => children.iter().any(Predicate::reads_topic),
            Predicate::EventTypeIn(_)
            | Predicate::FullText(_)
            | Predicate::PriceAtMost { .. }
            | Predicate::PriceAtLeast { .. } => true,
            _ => false,
        }
    }

    /// Rewrite every container-tree leaf with `resolve`.
    pub fn map_container_trees(
        self,
        resolve: &mut impl FnMut(BTreeSet<u32>, u32) -> Predicate,
    ) -> Predicate {
        match self {
            Predicate::All(children) => Predicate::All(
                children
                    .into_iter()
                    .map(|child| child.map_container_trees(&mut *resolve))
                    .collect(),
            ),
            Predicate::ContainerTree { roots, depth } => resolve(roots, depth),
            other => other,
        }
    }

    /// Container-tree leaves still waiting for resolution.
    pub fn container_trees(&self) -> Vec<(&BTreeSet<u32>, u32)> {
        match self {
            Predicate::All(children) => children
                .iter()
                .flat_map(Predicate::container_trees)
                .collect(),
            Predicate::ContainerTree { roots, depth } => vec![(roots, *depth)],
            _ => Vec::new(),
        }
    }
}

/// Named, independently replaceable predicate fragments.
///
/// Setting a name replaces whatever was stored under it; removing a name
/// drops its contribution entirely. Compilation order is irrelevant because
/// the fragments are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct PredicateComposer {
    fragments: BTreeMap<String, Predicate>,
}

impl PredicateComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the fragment stored under `name`.
    pub fn set(&mut self, name: &str, fragment: Predicate) {
        self.fragments.insert(name.to_string(), fragment);
    }

    /// Store `fragment` under `name`, or remove the name when `None`.
    pub fn set_or_remove(&mut self, name: &str, fragment: Option<Predicate>) {
        match fragment {
            Some(fragment) => self.set(name, fragment),
            None => self.remove(name),
        }
    }

    /// Drop the fragment stored under `name`, if any.
    pub fn remove(&mut self, name: &str) {
        self.fragments.remove(name);
    }

    /// The fragment currently stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.fragments.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// Names of all stored fragments, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Conjunction of `visibility` and every stored fragment.
    pub fn compile(&self, visibility: Predicate) -> Predicate {
        let mut conjuncts = Vec::with_capacity(self.fragments.len() + 1);
        conjuncts.push(visibility);
        conjuncts.extend(self.fragments.values().cloned());
        Predicate::All(conjuncts)
    }
}
