use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
}

impl Appointment {
    /// Start of the `[start, start+duration)` interval in minutes-of-day.
    pub fn start_minutes(&self) -> i64 {
        crate::window::minutes_of_day(self.start_time)
    }

    /// Exclusive end of the interval in minutes-of-day.
    pub fn end_minutes(&self) -> i64 {
        self.start_minutes() + self.duration_minutes
    }

    /// Wall-clock end of the appointment (date + start + duration).
    pub fn end_datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time) + chrono::Duration::minutes(self.duration_minutes)
    }
}
