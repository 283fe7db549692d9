//! Filters for records linked to events through an mm relation.
//!
//! Event uid lists on these builders are validated strictly: any malformed
//! token fails the call.

use std::collections::BTreeSet;

use super::builder::{BagBuilder, RelationScope};
use super::predicate::{Predicate, fragment};
use super::tokens::{Policy, parse_uid_list, require_positive_uid};
use crate::error::{BagError, BagResult};
use crate::models::{Category, Organizer, Place, Record, Relation, Speaker, TargetGroup};

/// A record type linked to events through `RELATION`.
pub trait EventRelated: Record {
    const RELATION: Relation;
}

impl EventRelated for Category {
    const RELATION: Relation = Relation::Categories;
}

impl EventRelated for Organizer {
    const RELATION: Relation = Relation::Organizers;
}

impl EventRelated for Speaker {
    const RELATION: Relation = Relation::Speakers;
}

impl EventRelated for Place {
    const RELATION: Relation = Relation::Places;
}

impl EventRelated for TargetGroup {
    const RELATION: Relation = Relation::TargetGroups;
}

impl<R: EventRelated> BagBuilder<R> {
    /// Records linked to event `event`.
    pub fn limit_to_event(&mut self, event: i64) -> BagResult<&mut Self> {
        let event = require_positive_uid(event, "event uid")?;
        self.scope_to_events(BTreeSet::from([event]));
        Ok(self)
    }

    /// Records linked to any of the events in `raw`, e.g. `"1,2,3"`.
    ///
    /// Empty input removes the limit.
    pub fn limit_to_events(&mut self, raw: &str) -> BagResult<&mut Self> {
        let events = parse_uid_list(raw, Policy::Strict)?;
        if events.is_empty() {
            self.composer.remove(fragment::RELATED_EVENTS);
            self.relation_scope = None;
            self.sort_by_relation = false;
        } else {
            self.scope_to_events(events);
        }
        Ok(self)
    }

    /// Order by the position the records have on their event.
    ///
    /// Requires a prior [`limit_to_event`](Self::limit_to_event) or
    /// [`limit_to_events`](Self::limit_to_events).
    pub fn sort_by_relation_order(&mut self) -> BagResult<&mut Self> {
        if self.relation_scope.is_none() {
            return Err(BagError::InvalidOperation(format!(
                "sorting {} by relation order requires limiting to an event first",
                R::TABLE
            )));
        }
        self.sort_by_relation = true;
        Ok(self)
    }

    fn scope_to_events(&mut self, events: BTreeSet<u32>) {
        self.composer.set(
            fragment::RELATED_EVENTS,
            Predicate::RelatedToEvents {
                relation: R::RELATION,
                events: events.clone(),
            },
        );
        self.relation_scope = Some(RelationScope {
            relation: R::RELATION,
            events,
        });
    }
}
