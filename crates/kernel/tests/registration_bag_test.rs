#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Registration bag integration tests.

mod common;

use common::{builder, scheduled, store, uids};
use seminars_kernel::ErrorCode;
use seminars_kernel::models::{Registration, Relation};
use seminars_kernel::store::Dataset;

fn registration_dataset() -> Dataset {
    let mut paid = Registration::new(101, 1, Some(7));
    paid.paid = true;
    let mut queued = Registration::new(102, 1, Some(8));
    queued.registration_queue = true;
    queued.seats = 3;
    let placeholder = Registration::new(103, 2, None);
    let other_event = Registration::new(104, 2, Some(9));

    let mut data = Dataset::new();
    data.insert(scheduled(1, "later", Some(10), Some(11)))
        .insert(scheduled(2, "sooner", Some(2), Some(3)))
        .insert(paid)
        .insert(queued)
        .insert(placeholder)
        .insert(other_event)
        // user 7 also attends registration 104 as an additional person
        .relate(Relation::AdditionalPersons, 104, 7, 1);
    data
}

#[tokio::test]
async fn registrations_of_one_event() {
    let store = store(registration_dataset());
    let mut b = builder::<Registration>();
    b.limit_to_seminar(1).unwrap();
    assert_eq!(uids(&b, &store).await, vec![101, 102]);

    let err = b.limit_to_seminar(0).err().unwrap();
    assert_eq!(err.code(), Some(ErrorCode::NonPositiveUid));
}

#[tokio::test]
async fn payment_and_queue_filters() {
    let store = store(registration_dataset());
    let mut b = builder::<Registration>();

    b.limit_to_paid();
    assert_eq!(uids(&b, &store).await, vec![101]);

    b.limit_to_unpaid();
    assert_eq!(uids(&b, &store).await, vec![102, 103, 104]);

    b.remove_payment_limitation().limit_to_on_queue();
    assert_eq!(uids(&b, &store).await, vec![102]);

    b.limit_to_regular();
    assert_eq!(uids(&b, &store).await, vec![101, 103, 104]);

    b.remove_queue_limitation();
    assert_eq!(uids(&b, &store).await.len(), 4);
}

#[tokio::test]
async fn seat_limit_and_existing_users() {
    let store = store(registration_dataset());
    let mut b = builder::<Registration>();

    b.limit_to_seats_at_most(1);
    assert_eq!(uids(&b, &store).await, vec![101, 103, 104]);

    b.limit_to_seats_at_most(0).limit_to_existing_users();
    assert_eq!(uids(&b, &store).await, vec![101, 102, 104]);
}

#[tokio::test]
async fn attendee_includes_additional_persons() {
    let store = store(registration_dataset());
    let mut b = builder::<Registration>();

    b.limit_to_attendee(Some(7));
    assert_eq!(uids(&b, &store).await, vec![101, 104]);

    b.limit_to_attendee(None);
    assert_eq!(uids(&b, &store).await.len(), 4);
}

#[tokio::test]
async fn order_by_event_begin_date() {
    let store = store(registration_dataset());
    let mut b = builder::<Registration>();

    b.set_order_by_event_column("begin_date").unwrap();
    assert_eq!(uids(&b, &store).await, vec![103, 104, 101, 102]);

    b.set_order_by_event_column("begin_date DESC").unwrap();
    assert_eq!(uids(&b, &store).await, vec![101, 102, 103, 104]);

    let err = b.set_order_by_event_column("seats").err().unwrap();
    assert_eq!(err.code(), Some(ErrorCode::UnknownSortColumn));
}
