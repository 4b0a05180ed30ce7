use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dose: String,
    /// Distinct daily times, minute granularity, ascending.
    pub schedule_times: Vec<NaiveTime>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    /// Last successful reminder dispatch. Display/audit field; dedup
    /// is keyed per (medication, time, day) in the reminder log.
    pub last_reminder_at: Option<NaiveDateTime>,
}

impl Medication {
    /// Whether `day` falls inside the medication's active date range.
    /// An open start or end bound is unbounded on that side.
    pub fn in_date_range(&self, day: NaiveDate) -> bool {
        if let Some(start) = self.start_date {
            if day < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if day > end {
                return false;
            }
        }
        true
    }

    /// Eligible for scheduling on `day`: active flag set and inside range.
    pub fn is_schedulable(&self, day: NaiveDate) -> bool {
        self.is_active && self.in_date_range(day)
    }
}

/// Parse a stored `HH:MM` time-of-day. Minute granularity only; this is
/// the mutation-boundary check for malformed schedule entries.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, StoreError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| StoreError::InvalidTime {
        value: s.to_string(),
    })
}

/// Parse the comma-separated schedule column into sorted, deduplicated
/// times. Rejects the whole list on any malformed entry.
pub fn parse_schedule_times(raw: &str) -> Result<Vec<NaiveTime>, StoreError> {
    let mut times = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_time_of_day)
        .collect::<Result<Vec<_>, _>>()?;
    times.sort();
    times.dedup();
    Ok(times)
}

/// Serialise schedule times back to the stored `HH:MM,HH:MM` form.
pub fn format_schedule_times(times: &[NaiveTime]) -> String {
    times
        .iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect::<Vec<_>>()
        .join(",")
}
