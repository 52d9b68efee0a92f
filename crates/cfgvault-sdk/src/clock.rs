use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use cfgvault_types::TimestampFormat;
use chrono::NaiveDateTime;

/// Source of save timestamps.
///
/// Timestamps are local wall-clock time without a zone, which is what the
/// `modified` field records.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The host's local wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and by tools replaying saves at known times.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { now: Mutex::new(at) }
    }

    /// Start at a timestamp in the default `yyyy-MM-dd HH:mm:ss.SSS` form.
    pub fn at_str(at: &str) -> cfgvault_types::Result<Self> {
        Ok(Self::new(TimestampFormat::default().parse_timestamp(at)?))
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    /// Move the clock forward. Steps too large to represent leave it
    /// unchanged.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = chrono::Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
        {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_on_request() {
        let clock = ManualClock::at_str("2017-05-01 01:00:00.000").unwrap();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), start + chrono::Duration::milliseconds(1500));

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn manual_clock_rejects_bad_input() {
        assert!(ManualClock::at_str("yesterday").is_err());
    }

    #[test]
    fn system_clock_is_usable_as_trait_object() {
        let clock: Box<dyn Clock> = Box::new(SystemClock);
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
