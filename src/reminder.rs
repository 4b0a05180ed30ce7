//! Reminder pass — one evaluation of all schedulable medications.
//!
//! Invoked every five minutes by the task runner. For each medication
//! that is active and inside its date range, two independent checks run
//! per scheduled time-of-day:
//!
//! - reminder: the current tick falls inside the tolerance window, no
//!   reminder has gone out for this instant today, and the patient has
//!   a notification channel → dispatch, then mark the ledger. A failed
//!   dispatch changes no state so the next tick retries.
//! - missed dose: the scheduled time is `offset` minutes in the past
//!   (plus an optional widening window), no dose record exists for this
//!   instant today → append a `missed` history entry.
//!
//! A failure on one medication never aborts the rest of the pass.

use chrono::NaiveTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::db::{self, StoreError};
use crate::dispatch::{NotificationDispatcher, NotificationPayload};
use crate::ledger;
use crate::models::{DoseRecord, Medication, Patient};
use crate::window;

/// Counters for one pass, logged at the end.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    /// Reminders dispatched successfully.
    pub sent: u32,
    /// Medications skipped (no linked notification channel).
    pub skipped: u32,
    /// Missed-dose records created.
    pub missed_logged: u32,
    /// Medications whose processing failed and was isolated.
    pub failed: u32,
}

/// Run one reminder pass over every schedulable medication.
pub fn run_reminder_pass(
    conn: &Connection,
    clock: &dyn Clock,
    dispatcher: &dyn NotificationDispatcher,
    config: &SchedulerConfig,
) -> Result<PassOutcome, StoreError> {
    let today = clock.today();
    let medications = db::fetch_schedulable_medications(conn, today)?;

    let mut outcome = PassOutcome::default();
    for medication in &medications {
        match process_medication(conn, clock, dispatcher, config, medication) {
            Ok(unit) => {
                outcome.sent += unit.sent;
                outcome.skipped += unit.skipped;
                outcome.missed_logged += unit.missed_logged;
            }
            Err(e) => {
                outcome.failed += 1;
                tracing::warn!(
                    medication_id = %medication.id,
                    error = %e,
                    "reminder pass: medication skipped after error"
                );
            }
        }
    }

    tracing::info!(
        sent = outcome.sent,
        skipped = outcome.skipped,
        missed = outcome.missed_logged,
        failed = outcome.failed,
        total = medications.len(),
        "reminder pass complete"
    );
    Ok(outcome)
}

fn process_medication(
    conn: &Connection,
    clock: &dyn Clock,
    dispatcher: &dyn NotificationDispatcher,
    config: &SchedulerConfig,
    medication: &Medication,
) -> Result<PassOutcome, StoreError> {
    let patient = db::get_patient(conn, &medication.patient_id)?.ok_or(StoreError::NotFound {
        entity_type: "patient".into(),
        id: medication.patient_id.to_string(),
    })?;

    let mut outcome = PassOutcome::default();
    let now = clock.now();

    let mut channel_missing_counted = false;
    for &scheduled in &medication.schedule_times {
        // Reminder path: requires a channel, dedup per instant.
        if window::matches(scheduled, now.time(), config.tolerance_minutes) {
            if !patient.has_channel() {
                if !channel_missing_counted {
                    outcome.skipped += 1;
                    channel_missing_counted = true;
                    tracing::debug!(
                        medication_id = %medication.id,
                        "no notification channel, reminder skipped"
                    );
                }
            } else if !ledger::already_sent_today(conn, &medication.id, scheduled, now.date())? {
                let payload = reminder_payload(medication, scheduled);
                let channel = patient.notify_channel.as_deref().unwrap_or_default();
                if dispatcher.send(channel, &payload) {
                    ledger::mark_sent(conn, &medication.id, scheduled, now.date(), now)?;
                    outcome.sent += 1;
                } else {
                    // No state change: the next tick retries.
                    tracing::debug!(
                        medication_id = %medication.id,
                        scheduled = %scheduled.format("%H:%M"),
                        "dispatch failed, will retry next tick"
                    );
                }
            }
        }

        // Missed-dose path: independent of the channel.
        if detect_missed(conn, clock, config, medication, &patient, scheduled)? {
            outcome.missed_logged += 1;
        }
    }

    Ok(outcome)
}

/// Check one scheduled instant for a missed dose and log it. Returns
/// true when a new `missed` record was created.
fn detect_missed(
    conn: &Connection,
    clock: &dyn Clock,
    config: &SchedulerConfig,
    medication: &Medication,
    patient: &Patient,
    scheduled: NaiveTime,
) -> Result<bool, StoreError> {
    let now = clock.now();
    let elapsed = window::elapsed_since(scheduled, now.time());
    let offset = config.missed_dose_offset_minutes;
    let in_window = elapsed >= offset && elapsed <= offset + config.missed_dose_window_minutes;
    if !in_window {
        return Ok(false);
    }

    if db::dose_record_exists(conn, &medication.id, scheduled, now.date())? {
        return Ok(false);
    }

    let record = DoseRecord::missed(medication.id, patient.id, scheduled, now);
    db::insert_dose_record(conn, &record)?;
    tracing::info!(
        medication_id = %medication.id,
        scheduled = %scheduled.format("%H:%M"),
        "missed dose recorded"
    );
    Ok(true)
}

fn reminder_payload(medication: &Medication, scheduled: NaiveTime) -> NotificationPayload {
    NotificationPayload::dose_reminder(
        &medication.name,
        &medication.dose,
        &scheduled.format("%H:%M").to_string(),
    )
}

/// Record a patient-reported taken dose (ad-hoc entries carry no
/// scheduled time). Exposed to the host's record-mutation path.
pub fn record_taken_dose(
    conn: &Connection,
    clock: &dyn Clock,
    medication_id: &Uuid,
    scheduled_time: Option<NaiveTime>,
    notes: Option<String>,
) -> Result<DoseRecord, StoreError> {
    let medication =
        db::get_medication(conn, medication_id)?.ok_or_else(|| StoreError::NotFound {
            entity_type: "medication".into(),
            id: medication_id.to_string(),
        })?;
    let record = DoseRecord {
        id: Uuid::new_v4(),
        medication_id: medication.id,
        patient_id: medication.patient_id,
        scheduled_time,
        recorded_at: clock.now(),
        status: crate::models::enums::DoseStatus::Taken,
        notes,
    };
    db::insert_dose_record(conn, &record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::repository::test_support::*;
    use crate::db::sqlite::open_memory_database;
    use crate::dispatch::testing::RecordingDispatcher;
    use crate::models::enums::DoseStatus;
    use chrono::NaiveDate;

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    #[test]
    fn dispatches_inside_tolerance_window() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:02:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();

        assert_eq!(outcome.sent, 1);
        assert_eq!(dispatcher.sent_count(), 1);
        let (channel, payload) = dispatcher.sent.lock().unwrap()[0].clone();
        assert_eq!(channel, "chan-1");
        assert!(payload.body.contains("08:00"));
    }

    #[test]
    fn no_dispatch_outside_tolerance_window() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:03:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();

        assert_eq!(outcome.sent, 0);
        assert_eq!(dispatcher.sent_count(), 0);
    }

    #[test]
    fn second_tick_same_instant_is_deduped() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");
        let dispatcher = RecordingDispatcher::new();

        let first = FixedClock::at("2024-01-15 07:58:00");
        run_reminder_pass(&conn, &first, &dispatcher, &config()).unwrap();
        let second = FixedClock::at("2024-01-15 08:02:00");
        let outcome = run_reminder_pass(&conn, &second, &dispatcher, &config()).unwrap();

        assert_eq!(outcome.sent, 0);
        assert_eq!(dispatcher.sent_count(), 1);
    }

    #[test]
    fn both_daily_times_fire_on_the_same_day() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00,20:00");
        let dispatcher = RecordingDispatcher::new();

        let morning = FixedClock::at("2024-01-15 08:00:00");
        run_reminder_pass(&conn, &morning, &dispatcher, &config()).unwrap();
        let evening = FixedClock::at("2024-01-15 20:00:00");
        let outcome = run_reminder_pass(&conn, &evening, &dispatcher, &config()).unwrap();

        assert_eq!(outcome.sent, 1);
        assert_eq!(dispatcher.sent_count(), 2);
    }

    #[test]
    fn next_day_fires_again() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");
        let dispatcher = RecordingDispatcher::new();

        run_reminder_pass(
            &conn,
            &FixedClock::at("2024-01-15 08:00:00"),
            &dispatcher,
            &config(),
        )
        .unwrap();
        let outcome = run_reminder_pass(
            &conn,
            &FixedClock::at("2024-01-16 08:00:00"),
            &dispatcher,
            &config(),
        )
        .unwrap();

        assert_eq!(outcome.sent, 1);
        assert_eq!(dispatcher.sent_count(), 2);
    }

    #[test]
    fn patient_without_channel_is_skipped() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, None);
        insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:00:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();

        assert_eq!(outcome.sent, 0);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(dispatcher.sent_count(), 0);
    }

    #[test]
    fn failed_dispatch_leaves_no_marker_and_retries() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:00:00");
        let failing = RecordingDispatcher::failing();
        let outcome = run_reminder_pass(&conn, &clock, &failing, &config()).unwrap();
        assert_eq!(outcome.sent, 0);

        // Next tick, a working channel succeeds; nothing was marked.
        let working = RecordingDispatcher::new();
        let retry = run_reminder_pass(
            &conn,
            &FixedClock::at("2024-01-15 08:02:00"),
            &working,
            &config(),
        )
        .unwrap();
        assert_eq!(retry.sent, 1);
    }

    #[test]
    fn missed_dose_logged_at_exact_offset() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        let med_id = insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:30:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();

        assert_eq!(outcome.missed_logged, 1);
        let day: NaiveDate = "2024-01-15".parse().unwrap();
        assert!(db::dose_record_exists(
            &conn,
            &med_id,
            crate::models::parse_time_of_day("08:00").unwrap(),
            day
        )
        .unwrap());
    }

    #[test]
    fn missed_dose_not_logged_off_exact_offset_with_zero_window() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");

        let dispatcher = RecordingDispatcher::new();
        // 32 minutes elapsed, window 0 → exact-equality policy misses it.
        let clock = FixedClock::at("2024-01-15 08:32:00");
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();
        assert_eq!(outcome.missed_logged, 0);
    }

    #[test]
    fn missed_dose_window_tolerates_tick_drift() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        insert_test_medication(&conn, patient_id, "08:00");

        let mut config = config();
        config.missed_dose_window_minutes = 5;
        let dispatcher = RecordingDispatcher::new();

        // 33 minutes elapsed falls inside [30, 35].
        let clock = FixedClock::at("2024-01-15 08:33:00");
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config).unwrap();
        assert_eq!(outcome.missed_logged, 1);

        // 36 minutes elapsed falls outside.
        let conn2 = open_memory_database().unwrap();
        let patient2 = insert_test_patient(&conn2, Some("chan-1"));
        insert_test_medication(&conn2, patient2, "08:00");
        let late = FixedClock::at("2024-01-15 08:36:00");
        let outcome = run_reminder_pass(&conn2, &late, &dispatcher, &config).unwrap();
        assert_eq!(outcome.missed_logged, 0);
    }

    #[test]
    fn missed_dose_logged_once_across_repeated_passes() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        let med_id = insert_test_medication(&conn, patient_id, "08:00");

        let mut config = config();
        config.missed_dose_window_minutes = 5;
        let dispatcher = RecordingDispatcher::new();

        for minute in ["08:30:00", "08:31:00", "08:34:00"] {
            let clock = FixedClock::at(&format!("2024-01-15 {minute}"));
            run_reminder_pass(&conn, &clock, &dispatcher, &config).unwrap();
        }

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM dose_records WHERE medication_id = ?1",
                rusqlite::params![med_id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn taken_dose_suppresses_missed_entry() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        let med_id = insert_test_medication(&conn, patient_id, "08:00");
        insert_test_dose(
            &conn,
            med_id,
            patient_id,
            Some("08:00"),
            "2024-01-15 08:05:00",
            DoseStatus::Taken,
        );

        let clock = FixedClock::at("2024-01-15 08:30:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();
        assert_eq!(outcome.missed_logged, 0);
    }

    #[test]
    fn missed_dose_runs_for_patients_without_channel() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, None);
        insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:30:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();
        assert_eq!(outcome.missed_logged, 1);
    }

    #[test]
    fn out_of_range_medication_not_evaluated() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        let med_id = insert_test_medication(&conn, patient_id, "08:00");
        conn.execute(
            "UPDATE medications SET end_date = '2024-01-01' WHERE id = ?1",
            rusqlite::params![med_id.to_string()],
        )
        .unwrap();

        let clock = FixedClock::at("2024-01-15 08:00:00");
        let dispatcher = RecordingDispatcher::new();
        let outcome = run_reminder_pass(&conn, &clock, &dispatcher, &config()).unwrap();
        assert_eq!(outcome, PassOutcome::default());
    }

    #[test]
    fn record_taken_dose_appends_history() {
        let conn = open_memory_database().unwrap();
        let patient_id = insert_test_patient(&conn, Some("chan-1"));
        let med_id = insert_test_medication(&conn, patient_id, "08:00");

        let clock = FixedClock::at("2024-01-15 08:10:00");
        let record = record_taken_dose(&conn, &clock, &med_id, None, Some("with food".into()))
            .unwrap();
        assert_eq!(record.status, DoseStatus::Taken);
        assert!(record.scheduled_time.is_none());

        let since: NaiveDate = "2024-01-15".parse().unwrap();
        let records = db::fetch_dose_records_since(&conn, &patient_id, None, since).unwrap();
        assert_eq!(records.len(), 1);
    }
}
