//! Clock abstraction
//!
//! The stores take "now" from a `Clock` trait object instead of calling
//! `Utc::now()` directly, so expiry behavior can be tested deterministically.

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for tests
#[cfg(test)]
pub struct ManualClock(parking_lot::RwLock<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub fn starting_at(start: DateTime<Utc>) -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self(parking_lot::RwLock::new(start)))
    }

    pub fn advance(&self, by: chrono::Duration) {
        *self.0.write() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.read()
    }
}
