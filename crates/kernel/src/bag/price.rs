//! Price bracket resolution with early-bird deadlines.
//!
//! An event has a regular and a special price, each with an optional
//! early-bird variant. While the early-bird deadline lies in the future an
//! early variant that is set replaces its ordinary counterpart. A price of
//! 0 means "free" for the regular price and "not offered" for the special
//! price.

use chrono::{DateTime, Utc};

use crate::error::{BagError, ErrorCode};
use crate::models::Effective;

/// The price fields of one event, after topic fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceSheet {
    pub regular: f64,
    pub regular_early: f64,
    pub special: f64,
    pub special_early: f64,
    pub early_bird_deadline: Option<DateTime<Utc>>,
}

impl PriceSheet {
    /// Collect the effective prices of an event.
    pub fn of(event: &Effective<'_>) -> Self {
        Self {
            regular: event.price_regular(),
            regular_early: event.price_regular_early(),
            special: event.price_special(),
            special_early: event.price_special_early(),
            early_bird_deadline: event.deadline_early_bird(),
        }
    }

    fn early_bird_active(&self, now: DateTime<Utc>) -> bool {
        self.early_bird_deadline.is_some_and(|deadline| deadline > now)
    }

    /// Regular price applicable at `now` (0 = free).
    pub fn resolved_regular(&self, now: DateTime<Utc>) -> f64 {
        if self.early_bird_active(now) && self.regular_early > 0.0 {
            self.regular_early
        } else {
            self.regular
        }
    }

    /// Special price applicable at `now`, if one is offered.
    pub fn resolved_special(&self, now: DateTime<Utc>) -> Option<f64> {
        let price = if self.early_bird_active(now) && self.special_early > 0.0 {
            self.special_early
        } else {
            self.special
        };
        (price > 0.0).then_some(price)
    }

    fn applicable(&self, now: DateTime<Utc>) -> impl Iterator<Item = f64> {
        std::iter::once(self.resolved_regular(now)).chain(self.resolved_special(now))
    }
}

/// Validate a price bound. Negative and non-finite bounds are rejected.
pub fn validate_bound(bound: f64) -> Result<f64, BagError> {
    if bound < 0.0 || !bound.is_finite() {
        return Err(BagError::invalid_argument(
            ErrorCode::NegativePrice,
            format!("price bound must be a finite amount of zero or more, got {bound}"),
        ));
    }
    Ok(bound)
}

/// Whether any applicable price is at most `max`. A bound of 0 matches everything.
pub fn maximum_allowed(prices: &PriceSheet, max: f64, now: DateTime<Utc>) -> bool {
    if max == 0.0 {
        return true;
    }
    prices.applicable(now).any(|price| price <= max)
}

/// Whether any applicable price is at least `min`. A bound of 0 matches everything.
pub fn minimum_allowed(prices: &PriceSheet, min: f64, now: DateTime<Utc>) -> bool {
    if min == 0.0 {
        return true;
    }
    prices.applicable(now).any(|price| price >= min)
}
