//! Adherence calculator — pure aggregation over dose history.
//!
//! Rate is `taken / total × 100` rounded half-up (5 of 7 → 71), `0`
//! when there is no history in the window. The weekday pattern uses
//! the same filter and the same ratio per bucket, zero-filled.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rusqlite::Connection;
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::{self, StoreError};
use crate::dispatch::{NotificationDispatcher, NotificationPayload};
use crate::models::enums::DoseStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdherenceSummary {
    /// Percentage of doses taken, rounded half-up. Always in `[0, 100]`.
    pub rate: u32,
    pub total: u32,
    pub taken: u32,
    pub missed: u32,
    pub skipped: u32,
    pub delayed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekdayBucket {
    pub weekday: Weekday,
    pub total: u32,
    pub taken: u32,
    pub rate: u32,
}

/// Round-half-up percentage. For non-negative operands `f64::round`
/// rounds halves away from zero, which is half-up here.
fn percent(taken: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((f64::from(taken) / f64::from(total)) * 100.0).round() as u32
}

/// Adherence over the trailing `window_days`, optionally narrowed to
/// one medication.
pub fn adherence_rate(
    conn: &Connection,
    patient_id: &Uuid,
    medication_id: Option<&Uuid>,
    window_days: i64,
    today: NaiveDate,
) -> Result<AdherenceSummary, StoreError> {
    let since = today - Duration::days(window_days);
    let records = db::fetch_dose_records_since(conn, patient_id, medication_id, since)?;

    let mut summary = AdherenceSummary::default();
    for record in &records {
        summary.total += 1;
        match record.status {
            DoseStatus::Taken => summary.taken += 1,
            DoseStatus::Missed => summary.missed += 1,
            DoseStatus::Skipped => summary.skipped += 1,
            DoseStatus::Delayed => summary.delayed += 1,
        }
    }
    summary.rate = percent(summary.taken, summary.total);
    Ok(summary)
}

/// Taken/total per weekday over the same trailing window. Always
/// returns seven buckets, Monday first; weekdays with no records are
/// zero-filled.
pub fn weekday_pattern(
    conn: &Connection,
    patient_id: &Uuid,
    medication_id: Option<&Uuid>,
    window_days: i64,
    today: NaiveDate,
) -> Result<Vec<WeekdayBucket>, StoreError> {
    let since = today - Duration::days(window_days);
    let records = db::fetch_dose_records_since(conn, patient_id, medication_id, since)?;

    let mut totals = [0u32; 7];
    let mut taken = [0u32; 7];
    for record in &records {
        let idx = record.recorded_at.date().weekday().num_days_from_monday() as usize;
        totals[idx] += 1;
        if record.status == DoseStatus::Taken {
            taken[idx] += 1;
        }
    }

    let weekdays = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    Ok(weekdays
        .iter()
        .enumerate()
        .map(|(i, &weekday)| WeekdayBucket {
            weekday,
            total: totals[i],
            taken: taken[i],
            rate: percent(taken[i], totals[i]),
        })
        .collect())
}

/// Weekly report job body: one 7-day summary per patient with a
/// linked channel. Delivery failures are logged and do not stop the
/// remaining patients; the count of dispatched reports is returned.
pub fn run_weekly_adherence_report(
    conn: &Connection,
    clock: &dyn Clock,
    dispatcher: &dyn NotificationDispatcher,
) -> Result<u32, StoreError> {
    let today = clock.today();
    let patients = db::fetch_patients_with_channel(conn)?;

    let mut sent = 0;
    for patient in &patients {
        let summary = match adherence_rate(conn, &patient.id, None, 7, today) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(patient_id = %patient.id, error = %e, "adherence report skipped");
                continue;
            }
        };
        if summary.total == 0 {
            continue;
        }
        let payload = NotificationPayload::adherence_report(
            &patient.name,
            summary.rate,
            summary.taken,
            summary.total,
        );
        let channel = patient.notify_channel.as_deref().unwrap_or_default();
        if dispatcher.send(channel, &payload) {
            sent += 1;
        } else {
            tracing::debug!(patient_id = %patient.id, "adherence report delivery failed");
        }
    }

    tracing::info!(sent, patients = patients.len(), "weekly adherence reports");
    Ok(sent)
}
