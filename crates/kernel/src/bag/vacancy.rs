//! Remaining capacity of events.

use crate::models::{Event, Registration};

/// Seats occupied on `event` by offline attendees and non-queued registrations.
///
/// Registrations for other events are ignored, so callers may pass a
/// superset.
pub fn occupied_seats<'a>(
    event: &Event,
    registrations: impl IntoIterator<Item = &'a Registration>,
) -> u64 {
    let online: u64 = registrations
        .into_iter()
        .filter(|registration| {
            registration.seminar == event.meta.uid && !registration.meta.deleted
        })
        .map(|registration| u64::from(registration.occupied_seats()))
        .sum();
    u64::from(event.offline_attendees) + online
}

/// Whether `event` still has a free, non-waitlist seat.
///
/// Events without registration and events with `attendees_max == 0` always
/// have vacancies.
pub fn has_vacancy<'a>(
    event: &Event,
    registrations: impl IntoIterator<Item = &'a Registration>,
) -> bool {
    if !event.needs_registration || event.attendees_max == 0 {
        return true;
    }
    occupied_seats(event, registrations) < u64::from(event.attendees_max)
}
