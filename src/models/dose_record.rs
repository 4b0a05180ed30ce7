use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DoseStatus;

/// One history entry per dose event. Immutable once created: patient
/// "taken" actions, missed-dose detection, or administrative
/// skipped/delayed entries all append, never update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseRecord {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub patient_id: Uuid,
    /// Scheduled time-of-day this event corresponds to; `None` for
    /// ad-hoc patient-reported doses.
    pub scheduled_time: Option<NaiveTime>,
    pub recorded_at: NaiveDateTime,
    pub status: DoseStatus,
    pub notes: Option<String>,
}

impl DoseRecord {
    /// Build a `missed` entry for one scheduled instant, stamped at the
    /// detection time.
    pub fn missed(
        medication_id: Uuid,
        patient_id: Uuid,
        scheduled_time: NaiveTime,
        detected_at: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            medication_id,
            patient_id,
            scheduled_time: Some(scheduled_time),
            recorded_at: detected_at,
            status: DoseStatus::Missed,
            notes: None,
        }
    }
}
