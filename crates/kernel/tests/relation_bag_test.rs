#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Bags of records linked to events: categories, organizers, speakers and
//! places.

mod common;

use common::{builder, store, uids};
use seminars_kernel::models::{Category, Event, Place, Relation, Speaker};
use seminars_kernel::store::Dataset;
use seminars_kernel::{BagError, ErrorCode};

fn speaker_dataset() -> Dataset {
    let mut data = Dataset::new();
    data.insert(Event::single(10, "first"))
        .insert(Event::single(11, "second"))
        .insert(Speaker::new(1, "Ada"))
        .insert(Speaker::new(2, "Grace"))
        .insert(Speaker::new(3, "Edsger"))
        .insert(Speaker::new(4, "unassigned"))
        .relate(Relation::Speakers, 10, 3, 1)
        .relate(Relation::Speakers, 10, 1, 2)
        .relate(Relation::Speakers, 10, 2, 3)
        .relate(Relation::Speakers, 11, 4, 1);
    data
}

#[tokio::test]
async fn speakers_of_one_event() {
    let store = store(speaker_dataset());
    let mut b = builder::<Speaker>();
    b.limit_to_event(10).unwrap();
    assert_eq!(uids(&b, &store).await, vec![1, 2, 3]);

    b.limit_to_events("10,11").unwrap();
    assert_eq!(uids(&b, &store).await, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn relation_order_follows_the_mm_sorting() {
    let store = store(speaker_dataset());
    let mut b = builder::<Speaker>();
    b.limit_to_event(10).unwrap().sort_by_relation_order().unwrap();
    assert_eq!(uids(&b, &store).await, vec![3, 1, 2]);

    b.set_order_by("title").unwrap();
    assert_eq!(uids(&b, &store).await, vec![1, 3, 2]);
}

#[tokio::test]
async fn strict_event_lists_reject_malformed_input() {
    for raw in ["0", "1,;,2"] {
        let err = builder::<Category>().limit_to_events(raw).err().unwrap();
        assert!(matches!(err, BagError::InvalidArgument { .. }), "{raw}");
        assert_eq!(err.code(), Some(ErrorCode::MalformedUidList), "{raw}");
    }
}

#[tokio::test]
async fn clearing_the_event_list_restores_all_records() {
    let mut data = Dataset::new();
    data.insert(Place::new(1, "Hall"))
        .insert(Place::new(2, "Garden"))
        .relate(Relation::Places, 50, 1, 1);
    let store = store(data);

    let mut b = builder::<Place>();
    b.limit_to_events("50").unwrap();
    assert_eq!(uids(&b, &store).await, vec![1]);

    b.limit_to_events("").unwrap();
    assert_eq!(uids(&b, &store).await, vec![1, 2]);
}

#[tokio::test]
async fn bag_cursor_walks_and_rewinds() {
    let store = store(speaker_dataset());
    let mut bag = builder::<Speaker>().build(&store).await.unwrap();

    assert_eq!(bag.current().map(|s| s.meta.uid), Some(1));
    assert_eq!(bag.next().map(|s| s.meta.uid), Some(2));
    bag.next();
    bag.next();
    assert!(bag.valid());
    bag.next();
    assert!(!bag.valid());
    assert!(bag.next().is_none());

    bag.rewind();
    assert!(bag.valid());
    assert_eq!(bag.uid_list(), "1,2,3,4");
}
