use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::StoreError;
use crate::models::enums::{AppointmentStatus, DoseStatus};
use crate::models::*;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ═══════════════════════════════════════════
// Column codecs
// ═══════════════════════════════════════════

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    s.parse()
        .map_err(|_| StoreError::ConstraintViolation(format!("invalid uuid: {s}")))
}

fn parse_date(s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|_| StoreError::InvalidTime {
        value: s.to_string(),
    })
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, StoreError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).map_err(|_| StoreError::InvalidTime {
        value: s.to_string(),
    })
}

fn fmt_time(t: NaiveTime) -> String {
    t.format(TIME_FMT).to_string()
}

fn fmt_datetime(t: NaiveDateTime) -> String {
    t.format(DATETIME_FMT).to_string()
}

// ═══════════════════════════════════════════
// Patient store
// ═══════════════════════════════════════════

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO patients (id, name, notify_channel) VALUES (?1, ?2, ?3)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.notify_channel,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, StoreError> {
    let result = conn.query_row(
        "SELECT id, name, notify_channel FROM patients WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        },
    );
    match result {
        Ok((id, name, notify_channel)) => Ok(Some(Patient {
            id: parse_uuid(&id)?,
            name,
            notify_channel,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Patients eligible for outbound notifications (weekly report job).
pub fn fetch_patients_with_channel(conn: &Connection) -> Result<Vec<Patient>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, notify_channel FROM patients
         WHERE notify_channel IS NOT NULL AND notify_channel != ''
         ORDER BY name ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, notify_channel)| {
            Ok(Patient {
                id: parse_uuid(&id)?,
                name,
                notify_channel,
            })
        })
        .collect()
}

// ═══════════════════════════════════════════
// Medication store
// ═══════════════════════════════════════════

struct MedicationRow {
    id: String,
    patient_id: String,
    name: String,
    dose: String,
    schedule_times: String,
    start_date: Option<String>,
    end_date: Option<String>,
    is_active: i32,
    last_reminder_at: Option<String>,
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, StoreError> {
    Ok(Medication {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        name: row.name,
        dose: row.dose,
        schedule_times: parse_schedule_times(&row.schedule_times)?,
        start_date: row.start_date.as_deref().map(parse_date).transpose()?,
        end_date: row.end_date.as_deref().map(parse_date).transpose()?,
        is_active: row.is_active != 0,
        last_reminder_at: row
            .last_reminder_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
    })
}

const MEDICATION_COLUMNS: &str = "id, patient_id, name, dose, schedule_times,
         start_date, end_date, is_active, last_reminder_at";

fn map_medication_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MedicationRow> {
    Ok(MedicationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        dose: row.get(3)?,
        schedule_times: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        is_active: row.get(7)?,
        last_reminder_at: row.get(8)?,
    })
}

/// Insert a medication. Rejects an empty or malformed schedule; this is
/// the mutation boundary for time-of-day validation.
pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), StoreError> {
    if med.schedule_times.is_empty() {
        return Err(StoreError::ConstraintViolation(
            "medication requires at least one scheduled time".into(),
        ));
    }
    conn.execute(
        "INSERT INTO medications (id, patient_id, name, dose, schedule_times,
         start_date, end_date, is_active, last_reminder_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.name,
            med.dose,
            format_schedule_times(&med.schedule_times),
            med.start_date.map(|d| d.to_string()),
            med.end_date.map(|d| d.to_string()),
            med.is_active as i32,
            med.last_reminder_at.map(fmt_datetime),
        ],
    )?;
    Ok(())
}

pub fn get_medication(conn: &Connection, id: &Uuid) -> Result<Option<Medication>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], map_medication_row);
    match result {
        Ok(row) => Ok(Some(medication_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Medications eligible for the reminder pass on `day`: active flag set
/// and `day` inside the `[start_date, end_date]` range (open bounds are
/// unbounded).
pub fn fetch_schedulable_medications(
    conn: &Connection,
    day: NaiveDate,
) -> Result<Vec<Medication>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications
         WHERE is_active = 1
           AND (start_date IS NULL OR start_date <= ?1)
           AND (end_date IS NULL OR end_date >= ?1)
         ORDER BY name ASC"
    ))?;
    let rows = stmt
        .query_map(params![day.to_string()], map_medication_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(medication_from_row).collect()
}

/// Update the schedule column; timers must be rebuilt by the caller.
pub fn update_medication_schedule(
    conn: &Connection,
    id: &Uuid,
    times: &[NaiveTime],
) -> Result<(), StoreError> {
    if times.is_empty() {
        return Err(StoreError::ConstraintViolation(
            "medication requires at least one scheduled time".into(),
        ));
    }
    let updated = conn.execute(
        "UPDATE medications SET schedule_times = ?1 WHERE id = ?2",
        params![format_schedule_times(times), id.to_string()],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound {
            entity_type: "medication".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn set_medication_active(
    conn: &Connection,
    id: &Uuid,
    is_active: bool,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE medications SET is_active = ?1 WHERE id = ?2",
        params![is_active as i32, id.to_string()],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound {
            entity_type: "medication".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Refresh the per-medication display marker after a dispatch.
pub fn update_reminder_mark(
    conn: &Connection,
    id: &Uuid,
    sent_at: NaiveDateTime,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE medications SET last_reminder_at = ?1 WHERE id = ?2",
        params![fmt_datetime(sent_at), id.to_string()],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════
// Reminder log — per-instant dedup
// ═══════════════════════════════════════════

pub fn reminder_sent_exists(
    conn: &Connection,
    medication_id: &Uuid,
    scheduled_time: NaiveTime,
    day: NaiveDate,
) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reminder_log
         WHERE medication_id = ?1 AND scheduled_time = ?2 AND day = ?3",
        params![
            medication_id.to_string(),
            fmt_time(scheduled_time),
            day.to_string()
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Record a successful dispatch. Idempotent: a second insert for the
/// same (medication, time, day) is ignored.
pub fn insert_reminder_mark(
    conn: &Connection,
    medication_id: &Uuid,
    scheduled_time: NaiveTime,
    day: NaiveDate,
    sent_at: NaiveDateTime,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO reminder_log (medication_id, scheduled_time, day, sent_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            medication_id.to_string(),
            fmt_time(scheduled_time),
            day.to_string(),
            fmt_datetime(sent_at),
        ],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════
// Dose record store
// ═══════════════════════════════════════════

pub fn insert_dose_record(conn: &Connection, record: &DoseRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO dose_records (id, medication_id, patient_id, scheduled_time,
         recorded_at, status, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id.to_string(),
            record.medication_id.to_string(),
            record.patient_id.to_string(),
            record.scheduled_time.map(fmt_time),
            fmt_datetime(record.recorded_at),
            record.status.as_str(),
            record.notes,
        ],
    )?;
    Ok(())
}

/// Whether any dose record exists for (medication, scheduled time,
/// calendar day), the missed-dose dedup key.
pub fn dose_record_exists(
    conn: &Connection,
    medication_id: &Uuid,
    scheduled_time: NaiveTime,
    day: NaiveDate,
) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM dose_records
         WHERE medication_id = ?1 AND scheduled_time = ?2 AND date(recorded_at) = ?3",
        params![
            medication_id.to_string(),
            fmt_time(scheduled_time),
            day.to_string()
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn dose_record_from_row(
    row: (
        String,
        String,
        String,
        Option<String>,
        String,
        String,
        Option<String>,
    ),
) -> Result<DoseRecord, StoreError> {
    let (id, medication_id, patient_id, scheduled_time, recorded_at, status, notes) = row;
    Ok(DoseRecord {
        id: parse_uuid(&id)?,
        medication_id: parse_uuid(&medication_id)?,
        patient_id: parse_uuid(&patient_id)?,
        scheduled_time: scheduled_time
            .as_deref()
            .map(parse_time_of_day)
            .transpose()?,
        recorded_at: parse_datetime(&recorded_at)?,
        status: DoseStatus::from_str(&status)?,
        notes,
    })
}

/// Dose records for a patient recorded on or after `since`, optionally
/// narrowed to one medication. Ordered chronologically.
pub fn fetch_dose_records_since(
    conn: &Connection,
    patient_id: &Uuid,
    medication_id: Option<&Uuid>,
    since: NaiveDate,
) -> Result<Vec<DoseRecord>, StoreError> {
    let mut sql = String::from(
        "SELECT id, medication_id, patient_id, scheduled_time, recorded_at, status, notes
         FROM dose_records
         WHERE patient_id = ?1 AND date(recorded_at) >= ?2",
    );
    if medication_id.is_some() {
        sql.push_str(" AND medication_id = ?3");
    }
    sql.push_str(" ORDER BY recorded_at ASC");

    let mut stmt = conn.prepare(&sql)?;
    let map = |row: &rusqlite::Row<'_>| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    };
    let rows = match medication_id {
        Some(med_id) => stmt
            .query_map(
                params![
                    patient_id.to_string(),
                    since.to_string(),
                    med_id.to_string()
                ],
                map,
            )?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(params![patient_id.to_string(), since.to_string()], map)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    rows.into_iter().map(dose_record_from_row).collect()
}

// ═══════════════════════════════════════════
// Appointment store
// ═══════════════════════════════════════════

struct AppointmentRow {
    id: String,
    doctor_id: String,
    patient_id: String,
    date: String,
    start_time: String,
    duration_minutes: i64,
    status: String,
    cancel_reason: Option<String>,
    cancelled_at: Option<String>,
}

const APPOINTMENT_COLUMNS: &str = "id, doctor_id, patient_id, date, start_time,
         duration_minutes, status, cancel_reason, cancelled_at";

fn map_appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        doctor_id: row.get(1)?,
        patient_id: row.get(2)?,
        date: row.get(3)?,
        start_time: row.get(4)?,
        duration_minutes: row.get(5)?,
        status: row.get(6)?,
        cancel_reason: row.get(7)?,
        cancelled_at: row.get(8)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, StoreError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        doctor_id: parse_uuid(&row.doctor_id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        date: parse_date(&row.date)?,
        start_time: parse_time_of_day(&row.start_time)?,
        duration_minutes: row.duration_minutes,
        status: AppointmentStatus::from_str(&row.status)?,
        cancel_reason: row.cancel_reason,
        cancelled_at: row.cancelled_at.as_deref().map(parse_datetime).transpose()?,
    })
}

/// Raw insert. The booking path in `conflict` runs the overlap check
/// first; nothing else should insert blocking appointments.
pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), StoreError> {
    if appt.duration_minutes <= 0 {
        return Err(StoreError::ConstraintViolation(
            "appointment duration must be positive".into(),
        ));
    }
    conn.execute(
        "INSERT INTO appointments (id, doctor_id, patient_id, date, start_time,
         duration_minutes, status, cancel_reason, cancelled_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            appt.id.to_string(),
            appt.doctor_id.to_string(),
            appt.patient_id.to_string(),
            appt.date.to_string(),
            fmt_time(appt.start_time),
            appt.duration_minutes,
            appt.status.as_str(),
            appt.cancel_reason,
            appt.cancelled_at.map(fmt_datetime),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"
    ))?;
    let result = stmt.query_row(params![id.to_string()], map_appointment_row);
    match result {
        Ok(row) => Ok(Some(appointment_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Slot-occupying appointments for one doctor and calendar date,
/// optionally excluding the appointment being updated.
pub fn fetch_blocking_appointments(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    exclude: Option<&Uuid>,
) -> Result<Vec<Appointment>, StoreError> {
    let mut sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND status IN ('scheduled', 'confirmed')"
    );
    if exclude.is_some() {
        sql.push_str(" AND id != ?3");
    }
    sql.push_str(" ORDER BY start_time ASC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match exclude {
        Some(ex) => stmt
            .query_map(
                params![doctor_id.to_string(), date.to_string(), ex.to_string()],
                map_appointment_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(
                params![doctor_id.to_string(), date.to_string()],
                map_appointment_row,
            )?
            .collect::<Result<Vec<_>, _>>()?,
    };
    rows.into_iter().map(appointment_from_row).collect()
}

/// Blocking appointments dated on or before `through`: no-show sweep
/// candidates. The caller compares end times against the grace cutoff.
pub fn fetch_blocking_through(
    conn: &Connection,
    through: NaiveDate,
) -> Result<Vec<Appointment>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE status IN ('scheduled', 'confirmed') AND date <= ?1
         ORDER BY date ASC, start_time ASC"
    ))?;
    let rows = stmt
        .query_map(params![through.to_string()], map_appointment_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(appointment_from_row).collect()
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_appointment_cancelled(
    conn: &Connection,
    id: &Uuid,
    reason: &str,
    cancelled_at: NaiveDateTime,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE appointments
         SET status = 'cancelled', cancel_reason = ?1, cancelled_at = ?2
         WHERE id = ?3",
        params![reason, fmt_datetime(cancelled_at), id.to_string()],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn update_appointment_slot(
    conn: &Connection,
    id: &Uuid,
    date: NaiveDate,
    start_time: NaiveTime,
    duration_minutes: i64,
) -> Result<(), StoreError> {
    if duration_minutes <= 0 {
        return Err(StoreError::ConstraintViolation(
            "appointment duration must be positive".into(),
        ));
    }
    let updated = conn.execute(
        "UPDATE appointments SET date = ?1, start_time = ?2, duration_minutes = ?3
         WHERE id = ?4",
        params![
            date.to_string(),
            fmt_time(start_time),
            duration_minutes,
            id.to_string()
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════
// Housekeeping
// ═══════════════════════════════════════════

/// Purge history and appointments older than the retention horizon.
/// Returns (dose records deleted, appointments deleted).
pub fn purge_expired(conn: &Connection, cutoff: NaiveDate) -> Result<(usize, usize), StoreError> {
    let doses = conn.execute(
        "DELETE FROM dose_records WHERE date(recorded_at) < ?1",
        params![cutoff.to_string()],
    )?;
    let appointments = conn.execute(
        "DELETE FROM appointments WHERE date < ?1",
        params![cutoff.to_string()],
    )?;
    conn.execute(
        "DELETE FROM reminder_log WHERE day < ?1",
        params![cutoff.to_string()],
    )?;
    Ok((doses, appointments))
}

/// Counters for the daily statistics job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStatistics {
    pub reminders_sent: u32,
    pub doses_taken: u32,
    pub doses_missed: u32,
    pub appointments: u32,
}

pub fn fetch_daily_statistics(
    conn: &Connection,
    day: NaiveDate,
) -> Result<DailyStatistics, StoreError> {
    let day_str = day.to_string();
    let reminders_sent: u32 = conn.query_row(
        "SELECT COUNT(*) FROM reminder_log WHERE day = ?1",
        params![day_str],
        |row| row.get(0),
    )?;
    let doses_taken: u32 = conn.query_row(
        "SELECT COUNT(*) FROM dose_records WHERE status = 'taken' AND date(recorded_at) = ?1",
        params![day_str],
        |row| row.get(0),
    )?;
    let doses_missed: u32 = conn.query_row(
        "SELECT COUNT(*) FROM dose_records WHERE status = 'missed' AND date(recorded_at) = ?1",
        params![day_str],
        |row| row.get(0),
    )?;
    let appointments: u32 = conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE date = ?1",
        params![day_str],
        |row| row.get(0),
    )?;
    Ok(DailyStatistics {
        reminders_sent,
        doses_taken,
        doses_missed,
        appointments,
    })
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::enums::DoseStatus;

    pub fn insert_test_patient(conn: &Connection, channel: Option<&str>) -> Uuid {
        let patient = Patient {
            id: Uuid::new_v4(),
            name: "Test Patient".into(),
            notify_channel: channel.map(String::from),
        };
        insert_patient(conn, &patient).expect("insert patient");
        patient.id
    }

    pub fn insert_test_medication(conn: &Connection, patient_id: Uuid, times: &str) -> Uuid {
        let med = Medication {
            id: Uuid::new_v4(),
            patient_id,
            name: "Metformin".into(),
            dose: "500mg".into(),
            schedule_times: parse_schedule_times(times).expect("parse times"),
            start_date: None,
            end_date: None,
            is_active: true,
            last_reminder_at: None,
        };
        insert_medication(conn, &med).expect("insert medication");
        med.id
    }

    pub fn insert_test_dose(
        conn: &Connection,
        medication_id: Uuid,
        patient_id: Uuid,
        scheduled_time: Option<&str>,
        recorded_at: &str,
        status: DoseStatus,
    ) -> Uuid {
        let record = DoseRecord {
            id: Uuid::new_v4(),
            medication_id,
            patient_id,
            scheduled_time: scheduled_time.map(|t| parse_time_of_day(t).unwrap()),
            recorded_at: parse_datetime(recorded_at).unwrap(),
            status,
            notes: None,
        };
        insert_dose_record(conn, &record).expect("insert dose record");
        record.id
    }

    pub fn insert_test_appointment(
        conn: &Connection,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: &str,
        start: &str,
        duration: i64,
        status: AppointmentStatus,
    ) -> Uuid {
        let appt = Appointment {
            id: Uuid::new_v4(),
            doctor_id,
            patient_id,
            date: date.parse().unwrap(),
            start_time: parse_time_of_day(start).unwrap(),
            duration_minutes: duration,
            status,
            cancel_reason: None,
            cancelled_at: None,
        };
        insert_appointment(conn, &appt).expect("insert appointment");
        appt.id
    }
}
