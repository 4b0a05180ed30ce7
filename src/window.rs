//! Time-window matcher — pure minute arithmetic over times-of-day.
//!
//! Both the reminder path and the missed-dose detector compare the
//! current wall-clock against a medication's scheduled times in
//! minutes-since-midnight in the reference timezone.

use chrono::{NaiveTime, Timelike};

/// Minutes since midnight, minute granularity (seconds discarded).
pub fn minutes_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// True iff `now` is within `tolerance_minutes` of `scheduled`,
/// boundary included.
pub fn matches(scheduled: NaiveTime, now: NaiveTime, tolerance_minutes: i64) -> bool {
    (minutes_of_day(scheduled) - minutes_of_day(now)).abs() <= tolerance_minutes
}

/// Signed minutes elapsed from `scheduled` to `now`. Negative before
/// the scheduled time.
pub fn elapsed_since(scheduled: NaiveTime, now: NaiveTime) -> i64 {
    minutes_of_day(now) - minutes_of_day(scheduled)
}
