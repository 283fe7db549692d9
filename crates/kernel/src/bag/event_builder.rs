//! Event-specific filters.
//!
//! Relation filters on events (categories, organizers, places, speakers,
//! event types) are permissive: malformed tokens are dropped, the valid
//! ones kept. Scalar arguments that must be positive are rejected at the
//! call.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use super::builder::BagBuilder;
use super::predicate::{PlaceAttribute, Predicate, fragment};
use super::price::validate_bound;
use super::timeframe::TimeFrame;
use super::tokens::{parse_positive_integer_list, parse_safe_string_list, require_positive_uid};
use crate::error::{BagError, BagResult, ErrorCode};
use crate::models::{Event, EventKind, EventStatus, Relation};

/// Minimum length of a full-text search token, in characters.
const MIN_SEARCH_TOKEN_CHARS: usize = 2;

impl BagBuilder<Event> {
    // -------------------------------------------------------------------------
    // Kinds
    // -------------------------------------------------------------------------

    /// Only topic records.
    pub fn limit_to_topic_records(&mut self) -> &mut Self {
        self.composer.set(
            fragment::TOPICS_ONLY,
            Predicate::KindIn(BTreeSet::from([EventKind::Topic])),
        );
        self
    }

    pub fn remove_limit_to_topic_records(&mut self) -> &mut Self {
        self.composer.remove(fragment::TOPICS_ONLY);
        self
    }

    /// Only single events and dates.
    pub fn limit_to_date_and_single_records(&mut self) -> &mut Self {
        self.composer.set(
            fragment::DATES_AND_SINGLES,
            Predicate::KindIn(BTreeSet::from([EventKind::Single, EventKind::Date])),
        );
        self
    }

    pub fn remove_limit_to_date_and_single_records(&mut self) -> &mut Self {
        self.composer.remove(fragment::DATES_AND_SINGLES);
        self
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    /// Limit to a time frame given by its key, e.g. `"currentAndUpcoming"`.
    pub fn set_time_frame(&mut self, key: &str) -> BagResult<&mut Self> {
        let frame = key.parse::<TimeFrame>()?;
        Ok(self.set_time_frame_kind(frame))
    }

    /// Limit to `frame`, evaluated at the current clock instant.
    /// [`TimeFrame::All`] removes the limit.
    pub fn set_time_frame_kind(&mut self, frame: TimeFrame) -> &mut Self {
        let fragment = (frame != TimeFrame::All).then(|| Predicate::TimeFrame {
            frame,
            now: self.clock.now(),
        });
        self.composer.set_or_remove(fragment::TIME_FRAME, fragment);
        self
    }

    /// Events beginning or ending at or after `earliest`. `None` clears.
    pub fn limit_to_earliest_begin_or_end_date(
        &mut self,
        earliest: Option<DateTime<Utc>>,
    ) -> &mut Self {
        self.composer.set_or_remove(
            fragment::EARLIEST_DATE,
            earliest.map(Predicate::BeginOrEndAtLeast),
        );
        self
    }

    /// Events beginning or ending at or before `latest`. `None` clears.
    pub fn limit_to_latest_begin_or_end_date(
        &mut self,
        latest: Option<DateTime<Utc>>,
    ) -> &mut Self {
        self.composer
            .set_or_remove(fragment::LATEST_DATE, latest.map(Predicate::BeginOrEndAtMost));
        self
    }

    /// Events beginning between now and `days` days from now. 0 clears.
    pub fn limit_to_days_before_begin_date(&mut self, days: u32) -> &mut Self {
        let fragment = (days > 0).then(|| {
            let from = self.clock.now();
            Predicate::BeginWithin {
                from,
                to: from + Duration::days(i64::from(days)),
            }
        });
        self.composer.set_or_remove(fragment::DAYS_BEFORE_BEGIN, fragment);
        self
    }

    // -------------------------------------------------------------------------
    // Relations
    // -------------------------------------------------------------------------

    /// Events in any of the given categories (inherited from the topic for dates).
    pub fn limit_to_categories(&mut self, raw: &str) -> &mut Self {
        self.set_permissive(fragment::CATEGORIES, raw, |ids| Predicate::Related {
            relation: Relation::Categories,
            ids,
        })
    }

    /// Events organized by any of the given organizers.
    pub fn limit_to_organizers(&mut self, raw: &str) -> &mut Self {
        self.set_permissive(fragment::ORGANIZERS, raw, |ids| Predicate::Related {
            relation: Relation::Organizers,
            ids,
        })
    }

    /// Events held at any of the given places.
    pub fn limit_to_places(&mut self, raw: &str) -> &mut Self {
        self.set_permissive(fragment::PLACES, raw, |ids| Predicate::Related {
            relation: Relation::Places,
            ids,
        })
    }

    pub fn limit_to_speakers(&mut self, raw: &str) -> &mut Self {
        self.set_permissive(fragment::SPEAKERS, raw, |ids| Predicate::Related {
            relation: Relation::Speakers,
            ids,
        })
    }

    /// Events of any of the given event types (the topic's type for dates
    /// without their own).
    pub fn limit_to_event_types(&mut self, raw: &str) -> &mut Self {
        self.set_permissive(fragment::EVENT_TYPES, raw, Predicate::EventTypeIn)
    }

    fn set_permissive(
        &mut self,
        name: &str,
        raw: &str,
        make: impl FnOnce(BTreeSet<u32>) -> Predicate,
    ) -> &mut Self {
        let list = parse_positive_integer_list(raw);
        let fragment = if list.is_empty() {
            None
        } else if list.ids.is_empty() {
            tracing::warn!(filter = name, raw = %raw, "no valid uid left, matching nothing");
            Some(Predicate::Nothing)
        } else {
            if !list.all_valid {
                tracing::warn!(filter = name, raw = %raw, "dropped malformed uid tokens");
            }
            Some(make(list.ids))
        };
        self.composer.set_or_remove(name, fragment);
        self
    }

    // -------------------------------------------------------------------------
    // Place and language attributes
    // -------------------------------------------------------------------------

    /// Events at a place in any of the given cities.
    pub fn limit_to_cities(&mut self, raw: &str) -> &mut Self {
        self.set_place_attribute(fragment::CITIES, PlaceAttribute::City, raw)
    }

    /// Events at a place in any of the given countries (ISO codes).
    pub fn limit_to_countries(&mut self, raw: &str) -> &mut Self {
        self.set_place_attribute(fragment::COUNTRIES, PlaceAttribute::Country, raw)
    }

    pub fn limit_to_languages(&mut self, raw: &str) -> &mut Self {
        let fragment = safe_list_fragment(raw, Predicate::LanguageIn);
        self.composer.set_or_remove(fragment::LANGUAGES, fragment);
        self
    }

    fn set_place_attribute(&mut self, name: &str, attribute: PlaceAttribute, raw: &str) -> &mut Self {
        let fragment = safe_list_fragment(raw, |values| Predicate::PlaceAttributeIn {
            attribute,
            values,
        });
        self.composer.set_or_remove(name, fragment);
        self
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Every token of `query` must occur in at least one searchable field.
    ///
    /// Tokens are separated by commas or whitespace; tokens shorter than two
    /// characters are ignored. A query without usable tokens clears the filter.
    pub fn limit_to_full_text_search(&mut self, query: &str) -> &mut Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in query
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| token.chars().count() >= MIN_SEARCH_TOKEN_CHARS)
        {
            let token = token.to_lowercase();
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        let fragment = (!tokens.is_empty()).then_some(Predicate::FullText(tokens));
        self.composer.set_or_remove(fragment::FULL_TEXT, fragment);
        self
    }

    // -------------------------------------------------------------------------
    // Prices, vacancies, age
    // -------------------------------------------------------------------------

    /// Events with an applicable price of at most `bound`. 0 clears.
    pub fn limit_to_maximum_price(&mut self, bound: f64) -> BagResult<&mut Self> {
        let bound = validate_bound(bound)?;
        let fragment = (bound > 0.0).then(|| Predicate::PriceAtMost {
            bound,
            now: self.clock.now(),
        });
        self.composer.set_or_remove(fragment::MAXIMUM_PRICE, fragment);
        Ok(self)
    }

    /// Events with an applicable price of at least `bound`. 0 clears.
    pub fn limit_to_minimum_price(&mut self, bound: f64) -> BagResult<&mut Self> {
        let bound = validate_bound(bound)?;
        let fragment = (bound > 0.0).then(|| Predicate::PriceAtLeast {
            bound,
            now: self.clock.now(),
        });
        self.composer.set_or_remove(fragment::MINIMUM_PRICE, fragment);
        Ok(self)
    }

    /// Events with at least one free, non-waitlist seat.
    pub fn limit_to_events_with_vacancies(&mut self) -> &mut Self {
        self.composer.set(fragment::VACANCIES, Predicate::HasVacancy);
        self
    }

    pub fn remove_limit_to_events_with_vacancies(&mut self) -> &mut Self {
        self.composer.remove(fragment::VACANCIES);
        self
    }

    /// Events without target groups or with a target group admitting `age`.
    /// 0 clears.
    pub fn limit_to_age(&mut self, age: i64) -> BagResult<&mut Self> {
        let age = u32::try_from(age).map_err(|_| {
            BagError::invalid_argument(
                ErrorCode::NegativeAge,
                format!("age must be zero or positive, got {age}"),
            )
        })?;
        let fragment = (age > 0).then_some(Predicate::AgeWithin(age));
        self.composer.set_or_remove(fragment::AGE, fragment);
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Requirements
    // -------------------------------------------------------------------------

    /// Topics the topic `uid` requires.
    pub fn limit_to_required_event_topics(&mut self, uid: i64) -> BagResult<&mut Self> {
        let uid = require_positive_uid(uid, "event topic uid")?;
        self.composer
            .set(fragment::REQUIREMENTS, Predicate::RequiredBy(uid));
        Ok(self)
    }

    /// Topics requiring the topic `uid`, minus `uid`'s own requirements.
    pub fn limit_to_depending_event_topics(&mut self, uid: i64) -> BagResult<&mut Self> {
        let uid = require_positive_uid(uid, "event topic uid")?;
        self.composer
            .set(fragment::REQUIREMENTS, Predicate::DependingOn(uid));
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Status and people
    // -------------------------------------------------------------------------

    /// Planned and confirmed events only.
    pub fn ignore_canceled_events(&mut self) -> &mut Self {
        self.composer.set(
            fragment::STATUS,
            Predicate::StatusIn(BTreeSet::from([EventStatus::Planned, EventStatus::Confirmed])),
        );
        self
    }

    pub fn allow_canceled_events(&mut self) -> &mut Self {
        self.composer.remove(fragment::STATUS);
        self
    }

    /// Events in any of the given statuses, e.g. `"planned,confirmed"`.
    /// Empty input clears.
    pub fn limit_to_status(&mut self, raw: &str) -> BagResult<&mut Self> {
        let statuses = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::parse::<EventStatus>)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let fragment = (!statuses.is_empty()).then_some(Predicate::StatusIn(statuses));
        self.composer.set_or_remove(fragment::STATUS, fragment);
        Ok(self)
    }

    /// Events owned by front-end user `user`. 0 clears.
    pub fn limit_to_owner(&mut self, user: i64) -> BagResult<&mut Self> {
        let fragment = optional_uid(user, "owner uid")?.map(Predicate::Owner);
        self.composer.set_or_remove(fragment::OWNER, fragment);
        Ok(self)
    }

    /// Events managed by front-end user `user`. 0 clears.
    pub fn limit_to_event_manager(&mut self, user: i64) -> BagResult<&mut Self> {
        let fragment = optional_uid(user, "event manager uid")?.map(|user| Predicate::Related {
            relation: Relation::Managers,
            ids: BTreeSet::from([user]),
        });
        self.composer.set_or_remove(fragment::MANAGER, fragment);
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Topic dates
    // -------------------------------------------------------------------------

    /// Dates belonging to topic `topic`.
    pub fn limit_to_dates_of_topic(&mut self, topic: i64) -> BagResult<&mut Self> {
        let topic = require_positive_uid(topic, "topic uid")?;
        self.composer
            .set(fragment::TOPIC_DATES, Predicate::DatesOfTopic(topic));
        Ok(self)
    }

    /// Dates sharing a topic with `event`, excluding `event` itself.
    pub fn limit_to_other_dates_for_topic(&mut self, event: &Event) -> BagResult<&mut Self> {
        let topic = match event.object_type {
            EventKind::Topic => event.meta.uid,
            EventKind::Date => event.topic.filter(|topic| *topic > 0).ok_or_else(|| {
                BagError::InvalidOperation(format!(
                    "date {} is not linked to a topic",
                    event.meta.uid
                ))
            })?,
            EventKind::Single => {
                return Err(BagError::InvalidOperation(format!(
                    "event {} is a single event and has no topic",
                    event.meta.uid
                )));
            }
        };
        self.composer.set(
            fragment::OTHER_DATES,
            Predicate::All(vec![
                Predicate::DatesOfTopic(topic),
                Predicate::UidNotIn(BTreeSet::from([event.meta.uid])),
            ]),
        );
        Ok(self)
    }

    pub fn remove_limit_to_other_dates_for_topic(&mut self) -> &mut Self {
        self.composer.remove(fragment::OTHER_DATES);
        self
    }
}

fn safe_list_fragment(raw: &str, make: impl FnOnce(Vec<String>) -> Predicate) -> Option<Predicate> {
    if raw.trim().is_empty() {
        return None;
    }
    let values = parse_safe_string_list(raw);
    Some(if values.is_empty() {
        Predicate::Nothing
    } else {
        make(values)
    })
}

fn optional_uid(uid: i64, what: &str) -> BagResult<Option<u32>> {
    if uid == 0 {
        return Ok(None);
    }
    require_positive_uid(uid, what).map(Some)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::bag::query::Join;
    use crate::clock::FixedClock;
    use std::sync::Arc;

    fn builder() -> BagBuilder<Event> {
        BagBuilder::with_clock(Arc::new(FixedClock::at_timestamp(1_700_000_000)))
    }

    #[test]
    fn kind_limits_are_independent() {
        let mut b = builder();
        b.limit_to_topic_records().limit_to_date_and_single_records();
        assert!(b.fragment(fragment::TOPICS_ONLY).is_some());
        assert!(b.fragment(fragment::DATES_AND_SINGLES).is_some());

        b.remove_limit_to_topic_records();
        assert!(b.fragment(fragment::TOPICS_ONLY).is_none());
        assert!(b.fragment(fragment::DATES_AND_SINGLES).is_some());
    }

    #[test]
    fn unknown_time_frame_names_the_key() {
        let err = builder().set_time_frame("someday").err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::UnknownTimeFrame));
        assert!(err.to_string().contains("someday"));
    }

    #[test]
    fn time_frame_all_removes_the_filter() {
        let mut b = builder();
        b.set_time_frame("past").unwrap();
        assert!(b.fragment(fragment::TIME_FRAME).is_some());
        b.set_time_frame("all").unwrap();
        assert!(b.fragment(fragment::TIME_FRAME).is_none());
    }

    #[test]
    fn permissive_relations_keep_valid_tokens() {
        let mut b = builder();
        b.limit_to_organizers("5,abc");
        assert_eq!(
            b.fragment(fragment::ORGANIZERS),
            Some(&Predicate::Related {
                relation: Relation::Organizers,
                ids: BTreeSet::from([5]),
            })
        );

        b.limit_to_organizers("abc");
        assert_eq!(b.fragment(fragment::ORGANIZERS), Some(&Predicate::Nothing));

        b.limit_to_organizers("");
        assert!(b.fragment(fragment::ORGANIZERS).is_none());
    }

    #[test]
    fn full_text_tokens_are_split_and_filtered() {
        let mut b = builder();
        b.limit_to_full_text_search("Avocado,  a  paprika,,avocado");
        assert_eq!(
            b.fragment(fragment::FULL_TEXT),
            Some(&Predicate::FullText(vec![
                "avocado".to_string(),
                "paprika".to_string()
            ]))
        );
        assert!(b.compile().joins.contains(&Join::Topic));

        b.limit_to_full_text_search(" x , y ");
        assert!(b.fragment(fragment::FULL_TEXT).is_none());
    }

    #[test]
    fn price_bounds() {
        let mut b = builder();
        let err = b.limit_to_maximum_price(-1.0).err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::NegativePrice));

        b.limit_to_maximum_price(50.0).unwrap();
        assert!(b.fragment(fragment::MAXIMUM_PRICE).is_some());
        assert!(b.limit_to_maximum_price(f64::INFINITY).is_err());
        assert!(b.limit_to_minimum_price(f64::INFINITY).is_err());
        assert!(b.fragment(fragment::MINIMUM_PRICE).is_none());
        b.limit_to_maximum_price(0.0).unwrap();
        assert!(b.fragment(fragment::MAXIMUM_PRICE).is_none());
    }

    #[test]
    fn age_zero_clears_and_negative_fails() {
        let mut b = builder();
        b.limit_to_age(15).unwrap();
        assert_eq!(b.fragment(fragment::AGE), Some(&Predicate::AgeWithin(15)));
        b.limit_to_age(0).unwrap();
        assert!(b.fragment(fragment::AGE).is_none());

        let err = b.limit_to_age(-3).err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::NegativeAge));
    }

    #[test]
    fn requirement_anchor_must_be_positive() {
        let err = builder().limit_to_required_event_topics(0).err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::NonPositiveUid));
    }

    #[test]
    fn status_list() {
        let mut b = builder();
        b.limit_to_status("planned, confirmed").unwrap();
        assert_eq!(
            b.fragment(fragment::STATUS),
            Some(&Predicate::StatusIn(BTreeSet::from([
                EventStatus::Planned,
                EventStatus::Confirmed
            ])))
        );
        let err = b.limit_to_status("postponed").err().unwrap();
        assert_eq!(err.code(), Some(ErrorCode::UnknownStatus));

        b.allow_canceled_events();
        assert!(b.fragment(fragment::STATUS).is_none());
    }

    #[test]
    fn unsafe_city_tokens_are_dropped() {
        let mut b = builder();
        b.limit_to_cities("Bonn, K'oln");
        assert_eq!(
            b.fragment(fragment::CITIES),
            Some(&Predicate::PlaceAttributeIn {
                attribute: PlaceAttribute::City,
                values: vec!["Bonn".to_string()],
            })
        );
        b.limit_to_cities("';--");
        assert_eq!(b.fragment(fragment::CITIES), Some(&Predicate::Nothing));
    }

    #[test]
    fn other_dates_need_a_topic() {
        let mut b = builder();
        assert!(matches!(
            b.limit_to_other_dates_for_topic(&Event::single(1, "solo")),
            Err(BagError::InvalidOperation(_))
        ));

        b.limit_to_other_dates_for_topic(&Event::date(7, 3)).unwrap();
        assert_eq!(
            b.fragment(fragment::OTHER_DATES),
            Some(&Predicate::All(vec![
                Predicate::DatesOfTopic(3),
                Predicate::UidNotIn(BTreeSet::from([7])),
            ]))
        );
    }

    #[test]
    fn days_before_begin_spans_from_now() {
        let mut b = builder();
        b.limit_to_days_before_begin_date(2);
        match b.fragment(fragment::DAYS_BEFORE_BEGIN) {
            Some(Predicate::BeginWithin { from, to }) => {
                assert_eq!(from.timestamp(), 1_700_000_000);
                assert_eq!(*to - *from, Duration::days(2));
            }
            other => panic!("unexpected fragment {other:?}"),
        }
    }
}
