//! Dedup ledger — at most one reminder per scheduled instant per day.
//!
//! The dedup key is the triple (medication, scheduled time, calendar
//! day), persisted in `reminder_log`. The persisted row — not any
//! in-memory state — is the source of truth, so the periodic tick and
//! the per-medication timer registry agree even though they fire
//! independently. The medication's `last_reminder_at` column is kept
//! as a display field and refreshed alongside the log row.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, StoreError};

/// Has a reminder for this scheduled instant already gone out today?
pub fn already_sent_today(
    conn: &Connection,
    medication_id: &Uuid,
    scheduled_time: NaiveTime,
    day: NaiveDate,
) -> Result<bool, StoreError> {
    db::reminder_sent_exists(conn, medication_id, scheduled_time, day)
}

/// Record a successful dispatch: per-instant log row plus the
/// per-medication display marker. Idempotent on the log row.
pub fn mark_sent(
    conn: &Connection,
    medication_id: &Uuid,
    scheduled_time: NaiveTime,
    day: NaiveDate,
    sent_at: NaiveDateTime,
) -> Result<(), StoreError> {
    db::insert_reminder_mark(conn, medication_id, scheduled_time, day, sent_at)?;
    db::update_reminder_mark(conn, medication_id, sent_at)?;
    Ok(())
}
