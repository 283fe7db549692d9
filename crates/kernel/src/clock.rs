//! Reference-instant sources.
//!
//! Time windows, early-bird prices and record visibility are all evaluated
//! against an explicit instant supplied by a [`Clock`]. Builders capture the
//! instant when a filter is set, so a compiled query never reads the wall
//! clock on its own.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current reference instant.
pub trait Clock: Send + Sync {
    /// The instant filters should treat as "now".
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant, for deterministic queries and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Freeze at a unix timestamp (seconds). Out-of-range input freezes at the epoch.
    pub fn at_timestamp(seconds: i64) -> Self {
        Self(DateTime::from_timestamp(seconds, 0).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Shared clock handle held by builders.
pub type SharedClock = Arc<dyn Clock>;

/// The default clock handle.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_does_not_move() {
        let clock = FixedClock::at_timestamp(1_700_000_000);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().timestamp(), 1_700_000_000);
    }
}
