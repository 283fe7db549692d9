//! Registration records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, RecordMeta, SortValue};

/// A registration of a front-end user (or placeholder) for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(flatten)]
    pub meta: RecordMeta,

    /// Uid of the event registered for.
    pub seminar: u32,

    /// Registered front-end user; `None` for placeholder registrations.
    #[serde(default)]
    pub user: Option<u32>,

    /// Number of seats taken, at least 1.
    #[serde(default = "default_seats")]
    pub seats: u32,

    #[serde(default)]
    pub paid: bool,

    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub datepaid: Option<DateTime<Utc>>,

    /// Waitlisted registrations do not occupy seats.
    #[serde(default)]
    pub registration_queue: bool,

    #[serde(default)]
    pub title: String,
}

fn default_seats() -> u32 {
    1
}

impl Registration {
    /// A confirmed one-seat registration of `user` for `seminar`.
    pub fn new(uid: u32, seminar: u32, user: Option<u32>) -> Self {
        Self {
            meta: RecordMeta::new(uid),
            seminar,
            user,
            seats: default_seats(),
            paid: false,
            datepaid: None,
            registration_queue: false,
            title: String::new(),
        }
    }

    /// Seats this registration occupies on its event.
    pub fn occupied_seats(&self) -> u32 {
        if self.registration_queue {
            0
        } else {
            self.seats.max(1)
        }
    }
}

impl Record for Registration {
    const TABLE: &'static str = "registrations";
    const SORTABLE: &'static [&'static str] = &[
        "seminar",
        "user",
        "seats",
        "paid",
        "datepaid",
        "registration_queue",
        "title",
    ];

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn column(&self, name: &str) -> SortValue {
        match name {
            "seminar" => SortValue::from(self.seminar),
            "user" => SortValue::from(self.user),
            "seats" => SortValue::from(self.seats),
            "paid" => SortValue::from(self.paid),
            "datepaid" => SortValue::from(self.datepaid),
            "registration_queue" => SortValue::from(self.registration_queue),
            "title" => SortValue::from(self.title.as_str()),
            other => self.meta.column(other).unwrap_or(SortValue::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_registrations_occupy_nothing() {
        let mut registration = Registration::new(1, 10, Some(3));
        registration.seats = 2;
        assert_eq!(registration.occupied_seats(), 2);

        registration.registration_queue = true;
        assert_eq!(registration.occupied_seats(), 0);
    }
}
