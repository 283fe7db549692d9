#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common fixtures for bag integration tests.
//!
//! Every test runs against a [`MemoryStore`] and a frozen clock so that time
//! windows and early-bird prices are deterministic.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use seminars_kernel::clock::{FixedClock, SharedClock};
use seminars_kernel::models::{Event, Record};
use seminars_kernel::store::{Dataset, MemoryStore};
use seminars_kernel::{Bag, BagBuilder};

/// Reference instant all fixtures are built around (2024-03-15 12:00 UTC).
pub const NOW: i64 = 1_710_504_000;

pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(NOW, 0).unwrap()
}

/// `now` shifted by `days`.
pub fn days_from_now(days: i64) -> DateTime<Utc> {
    now() + Duration::days(days)
}

pub fn clock() -> SharedClock {
    Arc::new(FixedClock::at_timestamp(NOW))
}

/// Builder pinned to the fixture clock.
pub fn builder<R: Record>() -> BagBuilder<R> {
    BagBuilder::with_clock(clock())
}

pub fn store(data: Dataset) -> MemoryStore {
    MemoryStore::new(data)
}

/// A single event running from `begin` to `end` days relative to now.
pub fn scheduled(uid: u32, title: &str, begin: Option<i64>, end: Option<i64>) -> Event {
    Event {
        begin_date: begin.map(days_from_now),
        end_date: end.map(days_from_now),
        ..Event::single(uid, title)
    }
}

/// Build `builder` against `store` and return the uids in bag order.
pub async fn uids<R>(builder: &BagBuilder<R>, store: &MemoryStore) -> Vec<u32>
where
    R: seminars_kernel::store::MemoryRecord,
{
    let bag: Bag<R> = builder.build(store).await.expect("bag builds");
    bag.uids()
}
