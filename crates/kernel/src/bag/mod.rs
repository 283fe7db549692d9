//! Bag query engine.
//!
//! A [`BagBuilder`] collects named filter fragments, ordering and a limit,
//! compiles them into a [`CompiledQuery`] and hands that to a store, which
//! returns the rows as a [`Bag`].

mod builder;
pub mod containers;
mod cursor;
mod event_builder;
pub mod predicate;
pub mod price;
pub mod query;
mod registration_builder;
mod relation_builder;
pub mod sql;
pub mod timeframe;
pub mod tokens;
pub mod vacancy;

pub use builder::BagBuilder;
pub use cursor::Bag;
pub use predicate::{PlaceAttribute, Predicate, PredicateComposer, fragment};
pub use query::{CompiledQuery, Join, Limit, SortDirection, SortKey, SortTarget};
pub use relation_builder::EventRelated;
pub use timeframe::TimeFrame;

use crate::models::{
    Category, Event, EventType, Organizer, Place, Registration, Speaker, TargetGroup,
};

pub type EventBagBuilder = BagBuilder<Event>;
pub type RegistrationBagBuilder = BagBuilder<Registration>;
pub type CategoryBagBuilder = BagBuilder<Category>;
pub type OrganizerBagBuilder = BagBuilder<Organizer>;
pub type SpeakerBagBuilder = BagBuilder<Speaker>;
pub type PlaceBagBuilder = BagBuilder<Place>;
pub type TargetGroupBagBuilder = BagBuilder<TargetGroup>;
pub type EventTypeBagBuilder = BagBuilder<EventType>;
