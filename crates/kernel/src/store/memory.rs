//! In-memory record store.
//!
//! Evaluates compiled predicates directly against records held in a
//! [`Dataset`]. Semantics match the SQL produced by [`crate::bag::sql`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ContainerHierarchy, RecordStore, Selection};
use crate::bag::containers::expand_containers;
use crate::bag::predicate::{PlaceAttribute, Predicate};
use crate::bag::price::{PriceSheet, maximum_allowed, minimum_allowed};
use crate::bag::query::{CompiledQuery, SortDirection, SortKey, SortTarget};
use crate::bag::timeframe::{self, EventDates};
use crate::bag::vacancy::has_vacancy;
use crate::error::StoreError;
use crate::models::{
    Category, Event, EventType, Organizer, Place, Record, Registration, Relation, RelationRow,
    SortValue, Speaker, TargetGroup,
};

/// All records and relations of one in-memory store.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub events: BTreeMap<u32, Event>,
    pub registrations: BTreeMap<u32, Registration>,
    pub categories: BTreeMap<u32, Category>,
    pub organizers: BTreeMap<u32, Organizer>,
    pub speakers: BTreeMap<u32, Speaker>,
    pub places: BTreeMap<u32, Place>,
    pub event_types: BTreeMap<u32, EventType>,
    pub target_groups: BTreeMap<u32, TargetGroup>,
    pub relations: BTreeMap<Relation, Vec<RelationRow>>,
    /// Container uid to parent container uid.
    pub containers: BTreeMap<u32, u32>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record, keyed by its uid.
    pub fn insert<R: MemoryRecord>(&mut self, record: R) -> &mut Self {
        R::table_mut(self).insert(record.uid(), record);
        self
    }

    /// Link `local` to `foreign` through `relation` at position `sorting`.
    pub fn relate(&mut self, relation: Relation, local: u32, foreign: u32, sorting: u32) -> &mut Self {
        self.relations
            .entry(relation)
            .or_default()
            .push(RelationRow::new(local, foreign, sorting));
        self
    }

    /// Register container `uid` below `parent` (0 for a root).
    pub fn add_container(&mut self, uid: u32, parent: u32) -> &mut Self {
        self.containers.insert(uid, parent);
        self
    }

    fn rows(&self, relation: Relation) -> &[RelationRow] {
        self.relations
            .get(&relation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Foreign uids linked to `local`.
    fn foreign_of(&self, relation: Relation, local: u32) -> impl Iterator<Item = u32> + '_ {
        self.rows(relation)
            .iter()
            .filter(move |row| row.uid_local == local)
            .map(|row| row.uid_foreign)
    }

    /// Local uids linked to `foreign`.
    fn local_of(&self, relation: Relation, foreign: u32) -> impl Iterator<Item = u32> + '_ {
        self.rows(relation)
            .iter()
            .filter(move |row| row.uid_foreign == foreign)
            .map(|row| row.uid_local)
    }

    fn children_of(&self, container: u32) -> Vec<u32> {
        self.containers
            .iter()
            .filter(|(_, parent)| **parent == container)
            .map(|(uid, _)| *uid)
            .collect()
    }

    fn topic_of(&self, event: &Event) -> Option<&Event> {
        if !event.is_date() {
            return None;
        }
        event.topic.and_then(|topic| self.events.get(&topic))
    }

    /// Uid whose rows count for `relation`. Dates without own rows of an
    /// inheriting relation use their topic's rows.
    fn relation_owner(&self, event: &Event, relation: Relation) -> Option<u32> {
        let uid = event.meta.uid;
        if event.is_date()
            && relation.inherits_from_topic()
            && self.foreign_of(relation, uid).next().is_none()
        {
            return event.topic;
        }
        Some(uid)
    }

    fn related_to_event(&self, event: &Event, relation: Relation) -> Vec<u32> {
        self.relation_owner(event, relation)
            .map(|owner| self.foreign_of(relation, owner).collect())
            .unwrap_or_default()
    }
}

/// A record type the in-memory store can hold and filter.
pub trait MemoryRecord: Record {
    fn table(data: &Dataset) -> &BTreeMap<u32, Self>;

    fn table_mut(data: &mut Dataset) -> &mut BTreeMap<u32, Self>;

    /// Evaluate a predicate leaf specific to this record type.
    ///
    /// Leaves that do not apply to the type match nothing.
    fn matches_leaf(&self, _leaf: &Predicate, _data: &Dataset) -> bool {
        false
    }

    /// Event the record belongs to, for ordering by event columns.
    fn event_uid(&self) -> Option<u32> {
        None
    }
}

macro_rules! memory_record {
    ($record:ty, $field:ident) => {
        impl MemoryRecord for $record {
            fn table(data: &Dataset) -> &BTreeMap<u32, Self> {
                &data.$field
            }

            fn table_mut(data: &mut Dataset) -> &mut BTreeMap<u32, Self> {
                &mut data.$field
            }
        }
    };
}

memory_record!(Category, categories);
memory_record!(Organizer, organizers);
memory_record!(Speaker, speakers);
memory_record!(Place, places);
memory_record!(EventType, event_types);
memory_record!(TargetGroup, target_groups);

impl MemoryRecord for Event {
    fn table(data: &Dataset) -> &BTreeMap<u32, Self> {
        &data.events
    }

    fn table_mut(data: &mut Dataset) -> &mut BTreeMap<u32, Self> {
        &mut data.events
    }

    fn matches_leaf(&self, leaf: &Predicate, data: &Dataset) -> bool {
        let uid = self.meta.uid;
        match leaf {
            Predicate::KindIn(kinds) => kinds.contains(&self.object_type),
            Predicate::TimeFrame { frame, now } => timeframe::matches(
                *frame,
                &EventDates {
                    begin: self.begin_date,
                    end: self.end_date,
                    registration_deadline: self.deadline_registration,
                },
                *now,
            ),
            Predicate::Related { relation, ids } => data
                .related_to_event(self, *relation)
                .iter()
                .any(|id| ids.contains(id)),
            Predicate::EventTypeIn(ids) => self
                .effective(data.topic_of(self))
                .event_type()
                .is_some_and(|event_type| ids.contains(&event_type)),
            Predicate::PlaceAttributeIn { attribute, values } => data
                .foreign_of(Relation::Places, uid)
                .filter_map(|place| data.places.get(&place))
                .filter(|place| !place.meta.deleted)
                .any(|place| {
                    let value = match attribute {
                        PlaceAttribute::City => &place.city,
                        PlaceAttribute::Country => &place.country,
                    };
                    values.contains(value)
                }),
            Predicate::LanguageIn(languages) => languages.contains(&self.language),
            Predicate::FullText(tokens) => {
                let fields = searchable_fields(self, data);
                tokens
                    .iter()
                    .all(|token| fields.iter().any(|field| field.contains(token.as_str())))
            }
            Predicate::PriceAtMost { bound, now } => {
                let prices = PriceSheet::of(&self.effective(data.topic_of(self)));
                maximum_allowed(&prices, *bound, *now)
            }
            Predicate::PriceAtLeast { bound, now } => {
                let prices = PriceSheet::of(&self.effective(data.topic_of(self)));
                minimum_allowed(&prices, *bound, *now)
            }
            Predicate::HasVacancy => has_vacancy(self, data.registrations.values()),
            Predicate::AgeWithin(age) => {
                let groups: Vec<&TargetGroup> = data
                    .related_to_event(self, Relation::TargetGroups)
                    .iter()
                    .filter_map(|group| data.target_groups.get(group))
                    .filter(|group| !group.meta.deleted)
                    .collect();
                groups.is_empty() || groups.iter().any(|group| group.contains_age(*age))
            }
            Predicate::StatusIn(statuses) => statuses.contains(&self.cancelled),
            Predicate::Owner(user) => self.owner_feuser == Some(*user),
            Predicate::DatesOfTopic(topic) => self.is_date() && self.topic == Some(*topic),
            Predicate::RequiredBy(anchor) => data
                .foreign_of(Relation::Requirements, *anchor)
                .any(|required| required == uid),
            Predicate::DependingOn(anchor) => {
                uid != *anchor
                    && data
                        .local_of(Relation::Requirements, *anchor)
                        .any(|depending| depending == uid)
                    && !data
                        .foreign_of(Relation::Requirements, *anchor)
                        .any(|required| required == uid)
            }
            Predicate::BeginOrEndAtLeast(at) => {
                self.begin_date.is_some_and(|begin| begin >= *at)
                    || self.end_date.is_some_and(|end| end >= *at)
            }
            Predicate::BeginOrEndAtMost(at) => {
                self.begin_date.is_some_and(|begin| begin <= *at)
                    || self.end_date.is_some_and(|end| end <= *at)
            }
            Predicate::BeginWithin { from, to } => self
                .begin_date
                .is_some_and(|begin| *from <= begin && begin <= *to),
            _ => false,
        }
    }
}

/// Lowercased values every full-text token is matched against.
fn searchable_fields(event: &Event, data: &Dataset) -> Vec<String> {
    let effective = event.effective(data.topic_of(event));
    let mut fields = vec![
        effective.title().to_lowercase(),
        effective.subtitle().to_lowercase(),
        effective.description().to_lowercase(),
        effective.accreditation_number().to_lowercase(),
    ];

    let uid = event.meta.uid;
    fields.extend(
        data.foreign_of(Relation::Speakers, uid)
            .filter_map(|speaker| data.speakers.get(&speaker))
            .filter(|speaker| !speaker.meta.deleted)
            .map(|speaker| speaker.title.to_lowercase()),
    );
    for place in data
        .foreign_of(Relation::Places, uid)
        .filter_map(|place| data.places.get(&place))
        .filter(|place| !place.meta.deleted)
    {
        fields.push(place.title.to_lowercase());
        fields.push(place.city.to_lowercase());
    }
    if let Some(event_type) = effective
        .event_type()
        .and_then(|event_type| data.event_types.get(&event_type))
        .filter(|event_type| !event_type.meta.deleted)
    {
        fields.push(event_type.title.to_lowercase());
    }
    fields.extend(
        data.related_to_event(event, Relation::Categories)
            .iter()
            .filter_map(|category| data.categories.get(category))
            .filter(|category| !category.meta.deleted)
            .map(|category| category.title.to_lowercase()),
    );
    fields
}

impl MemoryRecord for Registration {
    fn table(data: &Dataset) -> &BTreeMap<u32, Self> {
        &data.registrations
    }

    fn table_mut(data: &mut Dataset) -> &mut BTreeMap<u32, Self> {
        &mut data.registrations
    }

    fn matches_leaf(&self, leaf: &Predicate, data: &Dataset) -> bool {
        match leaf {
            Predicate::ForEvents(events) => events.contains(&self.seminar),
            Predicate::Paid(paid) => self.paid == *paid,
            Predicate::OnQueue(queued) => self.registration_queue == *queued,
            Predicate::SeatsAtMost(seats) => self.seats <= *seats,
            Predicate::Attendee(user) => {
                self.user == Some(*user)
                    || data
                        .foreign_of(Relation::AdditionalPersons, self.meta.uid)
                        .any(|person| person == *user)
            }
            Predicate::HasUser => self.user.is_some(),
            _ => false,
        }
    }

    fn event_uid(&self) -> Option<u32> {
        Some(self.seminar)
    }
}

fn matches<R: MemoryRecord>(record: &R, predicate: &Predicate, data: &Dataset) -> bool {
    let meta = record.meta();
    match predicate {
        Predicate::Nothing => false,
        Predicate::All(children) => children.iter().all(|child| matches(record, child, data)),
        Predicate::Visible { now, show_hidden } => meta.is_visible(*now, *show_hidden),
        Predicate::UidIn(uids) => uids.contains(&meta.uid),
        Predicate::UidNotIn(uids) => !uids.contains(&meta.uid),
        Predicate::ContainerIn(containers) => containers.contains(&meta.pid),
        Predicate::ContainerTree { roots, depth } => {
            expand_containers(roots, *depth, |container| data.children_of(container))
                .contains(&meta.pid)
        }
        Predicate::RelatedToEvents { relation, events } => data
            .local_of(*relation, meta.uid)
            .any(|event| events.contains(&event)),
        leaf => record.matches_leaf(leaf, data),
    }
}

fn sort_value<R: MemoryRecord>(record: &R, target: &SortTarget, data: &Dataset) -> SortValue {
    match target {
        SortTarget::Column(column) => record.column(column),
        SortTarget::EventColumn(column) => record
            .event_uid()
            .and_then(|event| data.events.get(&event))
            .map_or(SortValue::Null, |event| event.column(column)),
        SortTarget::RelationOrder { relation, events } => data
            .rows(*relation)
            .iter()
            .filter(|row| row.uid_foreign == record.uid() && events.contains(&row.uid_local))
            .map(|row| row.sorting)
            .min()
            .map_or(SortValue::Null, SortValue::from),
    }
}

fn compare<R: MemoryRecord>(a: &R, b: &R, order: &[SortKey], data: &Dataset) -> Ordering {
    for key in order {
        let ordering = sort_value(a, &key.target, data).cmp(&sort_value(b, &key.target, data));
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Store keeping every record in memory behind a read-write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
}

impl MemoryStore {
    pub fn new(data: Dataset) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Mutate the stored data.
    pub fn update<T>(&self, change: impl FnOnce(&mut Dataset) -> T) -> T {
        change(&mut self.data.write())
    }

    /// Run `query` synchronously.
    pub fn select_now<R: MemoryRecord>(&self, query: &CompiledQuery) -> Selection<R> {
        let data = self.data.read();
        let mut rows: Vec<R> = R::table(&data)
            .values()
            .filter(|record| matches(*record, &query.predicate, &data))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare(a, b, &query.order, &data));

        let total = rows.len() as u64;
        if let Some(limit) = query.limit {
            rows = rows
                .into_iter()
                .skip(usize::try_from(limit.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit.count).unwrap_or(usize::MAX))
                .collect();
        }
        Selection { rows, total }
    }
}

#[async_trait]
impl<R: MemoryRecord> RecordStore<R> for MemoryStore {
    async fn select(&self, query: &CompiledQuery) -> Result<Selection<R>, StoreError> {
        Ok(self.select_now(query))
    }
}

#[async_trait]
impl ContainerHierarchy for MemoryStore {
    async fn children_of(&self, container: u32) -> Result<Vec<u32>, StoreError> {
        Ok(self.data.read().children_of(container))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::bag::query::Limit;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn uids<R: Record>(rows: &[R]) -> BTreeSet<u32> {
        rows.iter().map(Record::uid).collect()
    }

    fn query(predicate: Predicate) -> CompiledQuery {
        CompiledQuery {
            table: Event::TABLE,
            predicate,
            order: vec![SortKey::tie_breaker()],
            limit: None,
            joins: BTreeSet::new(),
        }
    }

    #[test]
    fn dates_inherit_topic_relations_only_without_own_rows() {
        let mut data = Dataset::new();
        data.insert(Event::topic(1, "Topic"))
            .insert(Event::date(2, 1))
            .insert(Event::date(3, 1))
            .relate(Relation::Categories, 1, 10, 1)
            .relate(Relation::Categories, 3, 11, 1);
        let store = MemoryStore::new(data);

        let selection: Selection<Event> = store.select_now(&query(Predicate::Related {
            relation: Relation::Categories,
            ids: BTreeSet::from([10]),
        }));
        assert_eq!(uids(&selection.rows), BTreeSet::from([1, 2]));
    }

    #[test]
    fn limit_keeps_total() {
        let mut data = Dataset::new();
        for uid in 1..=5 {
            data.insert(Category::new(uid, "c"));
        }
        let store = MemoryStore::new(data);
        let mut q = query(Predicate::All(Vec::new()));
        q.limit = Some(Limit {
            offset: 1,
            count: 2,
        });

        let selection: Selection<Category> = store.select_now(&q);
        assert_eq!(selection.total, 5);
        assert_eq!(
            selection.rows.iter().map(Record::uid).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[test]
    fn desc_order_puts_missing_values_first() {
        let mut data = Dataset::new();
        let mut dated = Event::single(1, "a");
        dated.begin_date = Utc.timestamp_opt(100, 0).single();
        data.insert(dated).insert(Event::single(2, "b"));
        let store = MemoryStore::new(data);

        let mut q = query(Predicate::All(Vec::new()));
        q.order = vec![
            SortKey {
                target: SortTarget::Column("begin_date"),
                direction: SortDirection::Desc,
            },
            SortKey::tie_breaker(),
        ];
        let selection: Selection<Event> = store.select_now(&q);
        assert_eq!(
            selection.rows.iter().map(Record::uid).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }

    #[tokio::test]
    async fn children_come_from_the_container_map() {
        let mut data = Dataset::new();
        data.add_container(2, 1).add_container(3, 1).add_container(4, 2);
        let store = MemoryStore::new(data);
        assert_eq!(store.children_of(1).await.unwrap(), vec![2, 3]);
    }
}
