//! Registration-specific filters.

use std::collections::BTreeSet;

use super::builder::BagBuilder;
use super::predicate::{Predicate, fragment};
use super::query::{Join, SortTarget, parse_related_order_by};
use super::tokens::require_positive_uid;
use crate::error::BagResult;
use crate::models::{Event, Registration};

impl BagBuilder<Registration> {
    /// Registrations for event `event`.
    pub fn limit_to_seminar(&mut self, event: i64) -> BagResult<&mut Self> {
        let event = require_positive_uid(event, "event uid")?;
        self.composer
            .set(fragment::EVENT, Predicate::ForEvents(BTreeSet::from([event])));
        Ok(self)
    }

    pub fn limit_to_paid(&mut self) -> &mut Self {
        self.composer.set(fragment::PAYMENT, Predicate::Paid(true));
        self
    }

    pub fn limit_to_unpaid(&mut self) -> &mut Self {
        self.composer.set(fragment::PAYMENT, Predicate::Paid(false));
        self
    }

    pub fn remove_payment_limitation(&mut self) -> &mut Self {
        self.composer.remove(fragment::PAYMENT);
        self
    }

    /// Waitlisted registrations only.
    pub fn limit_to_on_queue(&mut self) -> &mut Self {
        self.composer.set(fragment::QUEUE, Predicate::OnQueue(true));
        self
    }

    /// Registrations holding a regular (non-waitlist) seat.
    pub fn limit_to_regular(&mut self) -> &mut Self {
        self.composer.set(fragment::QUEUE, Predicate::OnQueue(false));
        self
    }

    pub fn remove_queue_limitation(&mut self) -> &mut Self {
        self.composer.remove(fragment::QUEUE);
        self
    }

    /// Registrations with at most `seats` seats. 0 clears.
    pub fn limit_to_seats_at_most(&mut self, seats: u32) -> &mut Self {
        let fragment = (seats > 0).then_some(Predicate::SeatsAtMost(seats));
        self.composer.set_or_remove(fragment::SEATS, fragment);
        self
    }

    /// Registrations of `user`, either as the registering user or as one of
    /// the additional persons. `None` clears.
    pub fn limit_to_attendee(&mut self, user: Option<u32>) -> &mut Self {
        let fragment = user.filter(|user| *user > 0).map(Predicate::Attendee);
        self.composer.set_or_remove(fragment::ATTENDEE, fragment);
        self
    }

    /// Registrations linked to a front-end user (no placeholders).
    pub fn limit_to_existing_users(&mut self) -> &mut Self {
        self.composer.set(fragment::EXISTING_USERS, Predicate::HasUser);
        self
    }

    /// Sort by columns of the registered event, e.g. `"begin_date DESC"`.
    ///
    /// Replaces any previous order. An empty expression restores the default
    /// order and drops the event join.
    pub fn set_order_by_event_column(&mut self, expression: &str) -> BagResult<&mut Self> {
        let keys = parse_related_order_by::<Event>(expression, SortTarget::EventColumn)?;
        if keys.is_empty() {
            self.remove_additional_table(Join::Event);
        } else {
            self.add_additional_table(Join::Event);
        }
        self.set_order(keys);
        Ok(self)
    }
}
