//! Wall-clock collaborator.
//!
//! Every time comparison in the scheduling core goes through `Clock`
//! so that tests can substitute a fixed instant. `SystemClock` applies
//! the configured reference-timezone offset; all `NaiveDateTime`s in
//! the crate are in that reference timezone.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub trait Clock: Send + Sync {
    /// Current wall-clock time in the reference timezone.
    fn now(&self) -> NaiveDateTime;

    /// Current calendar date in the reference timezone.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current time-of-day in the reference timezone.
    fn time_of_day(&self) -> NaiveTime {
        self.now().time()
    }
}

/// Production clock: UTC shifted by the configured offset.
pub struct SystemClock {
    utc_offset_minutes: i32,
}

impl SystemClock {
    pub fn new(utc_offset_minutes: i32) -> Self {
        Self { utc_offset_minutes }
    }

    pub fn utc() -> Self {
        Self::new(0)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(i64::from(self.utc_offset_minutes))
    }
}

/// Test double pinned to one instant.
#[cfg(test)]
pub struct FixedClock(pub NaiveDateTime);

#[cfg(test)]
impl FixedClock {
    pub fn at(s: &str) -> Self {
        Self(
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .expect("fixed clock literal"),
        )
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
