//! Appointment slot-conflict resolver and status machine.
//!
//! Invoked synchronously on the create/update path before anything is
//! persisted. Two appointments for the same doctor and date conflict
//! iff their half-open `[start, start+duration)` intervals overlap;
//! touching endpoints (10:00–10:30 then 10:30–11:00) do not conflict.

use chrono::{Duration, NaiveDate, NaiveTime};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{self, StoreError};
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;
use crate::window::minutes_of_day;

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Slot conflict for doctor {doctor_id} on {date}")]
    SlotConflict { doctor_id: Uuid, date: NaiveDate },

    #[error("Invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Half-open interval overlap: `startA < endB && endA > startB`.
pub fn intervals_overlap(start_a: i64, end_a: i64, start_b: i64, end_b: i64) -> bool {
    start_a < end_b && end_a > start_b
}

/// Does the candidate slot overlap any blocking appointment for this
/// doctor and date? `exclude` skips the appointment being updated.
pub fn has_conflict(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    duration_minutes: i64,
    exclude: Option<&Uuid>,
) -> Result<bool, StoreError> {
    let start = minutes_of_day(start_time);
    let end = start + duration_minutes;

    let existing = db::fetch_blocking_appointments(conn, doctor_id, date, exclude)?;
    Ok(existing
        .iter()
        .any(|appt| intervals_overlap(start, end, appt.start_minutes(), appt.end_minutes())))
}

/// Persist a new appointment after the conflict check. A conflict is a
/// hard rejection; nothing is committed.
pub fn book_appointment(conn: &Connection, appt: &Appointment) -> Result<(), AppointmentError> {
    if has_conflict(
        conn,
        &appt.doctor_id,
        appt.date,
        appt.start_time,
        appt.duration_minutes,
        None,
    )? {
        return Err(AppointmentError::SlotConflict {
            doctor_id: appt.doctor_id,
            date: appt.date,
        });
    }
    db::insert_appointment(conn, appt)?;
    tracing::info!(appointment_id = %appt.id, doctor_id = %appt.doctor_id, "appointment booked");
    Ok(())
}

/// Move an existing blocking appointment to a new slot, excluding
/// itself from the overlap check.
pub fn reschedule_appointment(
    conn: &Connection,
    id: &Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    duration_minutes: i64,
) -> Result<(), AppointmentError> {
    let appt = db::get_appointment(conn, id)?.ok_or_else(|| StoreError::NotFound {
        entity_type: "appointment".into(),
        id: id.to_string(),
    })?;
    if appt.status.is_terminal() {
        return Err(AppointmentError::InvalidTransition {
            from: appt.status,
            to: appt.status,
        });
    }
    if has_conflict(
        conn,
        &appt.doctor_id,
        date,
        start_time,
        duration_minutes,
        Some(id),
    )? {
        return Err(AppointmentError::SlotConflict {
            doctor_id: appt.doctor_id,
            date,
        });
    }
    db::update_appointment_slot(conn, id, date, start_time, duration_minutes)?;
    Ok(())
}

/// Legal transitions: blocking -> terminal only.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    from.is_blocking() && to.is_terminal()
        || (from == AppointmentStatus::Scheduled && to == AppointmentStatus::Confirmed)
}

fn guarded_transition(
    conn: &Connection,
    id: &Uuid,
    to: AppointmentStatus,
) -> Result<Appointment, AppointmentError> {
    let appt = db::get_appointment(conn, id)?.ok_or_else(|| StoreError::NotFound {
        entity_type: "appointment".into(),
        id: id.to_string(),
    })?;
    if !can_transition(appt.status, to) {
        return Err(AppointmentError::InvalidTransition {
            from: appt.status,
            to,
        });
    }
    Ok(appt)
}

pub fn confirm_appointment(conn: &Connection, id: &Uuid) -> Result<(), AppointmentError> {
    guarded_transition(conn, id, AppointmentStatus::Confirmed)?;
    db::update_appointment_status(conn, id, AppointmentStatus::Confirmed)?;
    Ok(())
}

pub fn complete_appointment(conn: &Connection, id: &Uuid) -> Result<(), AppointmentError> {
    guarded_transition(conn, id, AppointmentStatus::Completed)?;
    db::update_appointment_status(conn, id, AppointmentStatus::Completed)?;
    Ok(())
}

/// Manual cancellation, recording reason and timestamp.
pub fn cancel_appointment(
    conn: &Connection,
    clock: &dyn Clock,
    id: &Uuid,
    reason: &str,
) -> Result<(), AppointmentError> {
    guarded_transition(conn, id, AppointmentStatus::Cancelled)?;
    db::update_appointment_cancelled(conn, id, reason, clock.now())?;
    Ok(())
}

/// Hourly sweep: blocking appointments whose end is more than the
/// grace period in the past become no-shows. Returns the number
/// transitioned.
pub fn sweep_no_shows(
    conn: &Connection,
    clock: &dyn Clock,
    grace_minutes: i64,
) -> Result<u32, StoreError> {
    let now = clock.now();
    let cutoff = now - Duration::minutes(grace_minutes);

    let candidates = db::fetch_blocking_through(conn, now.date())?;
    let mut transitioned = 0;
    for appt in candidates {
        if appt.end_datetime() <= cutoff {
            db::update_appointment_status(conn, &appt.id, AppointmentStatus::NoShow)?;
            transitioned += 1;
            tracing::info!(appointment_id = %appt.id, "appointment marked no-show");
        }
    }
    if transitioned > 0 {
        tracing::info!(transitioned, "no-show sweep complete");
    }
    Ok(transitioned)
}
