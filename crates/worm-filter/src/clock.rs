//! Wall-clock source for `w_ref_date`.

use time::OffsetDateTime;

/// Supplies the reference timestamp captured after each successful lookup.
pub trait Clock {
    /// Returns the current time in whole seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> i64 {
        (**self).now()
    }
}
