//! Per-medication timer registry — event-driven reminder triggers.
//!
//! The chat-notification integration path: one live recurring trigger
//! per (medication, scheduled time-of-day), firing at that wall-clock
//! instant daily. Entries are process-memory only, keyed by medication
//! id, and rebuilt from persisted records on process start. Record
//! mutations drive the lifecycle: create/update replaces the entry
//! atomically (old triggers are aborted before new ones register),
//! deactivation or deletion cancels it.
//!
//! Fire handlers re-read the medication's persisted state before
//! acting and share the per-instant reminder ledger with the periodic
//! tick, so the two independent schedulers never double-send.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rusqlite::Connection;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::Clock;
use crate::context::SchedulerContext;
use crate::db::{self, StoreError};
use crate::dispatch::{NotificationDispatcher, NotificationPayload};
use crate::ledger;
use crate::models::{Medication, Patient};

/// Outcome of one trigger firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Reminder dispatched and marked.
    Sent,
    /// The periodic tick (or an earlier firing) already handled this
    /// instant today.
    AlreadySent,
    /// Patient has no linked channel.
    Skipped,
    /// Delivery failed; nothing marked.
    DispatchFailed,
    /// Medication deleted, deactivated, or out of its date range;
    /// the trigger should cancel itself.
    Deactivated,
}

struct TriggerEntry {
    time: NaiveTime,
    task: JoinHandle<()>,
}

struct MedicationTimers {
    patient_id: Uuid,
    triggers: Vec<TriggerEntry>,
}

pub struct TimerRegistry {
    ctx: Arc<SchedulerContext>,
    entries: Mutex<HashMap<Uuid, MedicationTimers>>,
}

impl TimerRegistry {
    pub fn new(ctx: Arc<SchedulerContext>) -> Self {
        Self {
            ctx,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Create (or atomically replace) the trigger set for one
    /// medication. Must run inside a tokio runtime.
    pub fn schedule_for_medication(&self, medication: &Medication, patient: &Patient) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        // Stop the old set before registering the new one so both can
        // never fire for the same medication.
        if let Some(old) = entries.remove(&medication.id) {
            abort_all(&medication.id, old);
        }

        let mut triggers = Vec::with_capacity(medication.schedule_times.len());
        for &time in &medication.schedule_times {
            match self.spawn_trigger(medication.id, time) {
                Ok(task) => triggers.push(TriggerEntry { time, task }),
                Err(e) => {
                    // One bad time-of-day must not abort the rest.
                    tracing::warn!(
                        medication_id = %medication.id,
                        time = %time.format("%H:%M"),
                        error = %e,
                        "trigger not created, skipping this time"
                    );
                }
            }
        }

        tracing::debug!(
            medication_id = %medication.id,
            triggers = triggers.len(),
            "reminder triggers scheduled"
        );
        entries.insert(
            medication.id,
            MedicationTimers {
                patient_id: patient.id,
                triggers,
            },
        );
    }

    fn spawn_trigger(
        &self,
        medication_id: Uuid,
        time: NaiveTime,
    ) -> Result<JoinHandle<()>, StoreError> {
        // Seconds on a stored time would drift the daily target.
        if time.second() != 0 {
            return Err(StoreError::InvalidTime {
                value: time.format("%H:%M:%S").to_string(),
            });
        }
        let ctx = self.ctx.clone();
        Ok(tokio::spawn(async move {
            loop {
                let delay = next_fire_delay(ctx.clock.now(), time);
                tokio::time::sleep(delay).await;

                let outcome = fire_once(&ctx, &medication_id, time);
                match outcome {
                    Ok(FireOutcome::Deactivated) => {
                        tracing::debug!(
                            medication_id = %medication_id,
                            "medication no longer schedulable, trigger exiting"
                        );
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Store outage: stay alive and retry at the
                        // next daily occurrence.
                        tracing::warn!(
                            medication_id = %medication_id,
                            error = %e,
                            "trigger firing failed"
                        );
                    }
                }
            }
        }))
    }

    /// Stop and discard every trigger owned by this medication.
    /// No-op when no entry exists.
    pub fn cancel_for_medication(&self, medication_id: &Uuid) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timers) = entries.remove(medication_id) {
            abort_all(medication_id, timers);
        }
    }

    /// Cancel every medication entry owned by one patient (account
    /// deletion / channel unlink).
    pub fn cancel_for_patient(&self, patient_id: &Uuid) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let owned: Vec<Uuid> = entries
            .iter()
            .filter(|(_, timers)| timers.patient_id == *patient_id)
            .map(|(id, _)| *id)
            .collect();
        for id in owned {
            if let Some(timers) = entries.remove(&id) {
                abort_all(&id, timers);
            }
        }
    }

    /// Rebuild the whole registry from persisted state (process start).
    pub fn rebuild(&self, conn: &Connection) -> Result<usize, StoreError> {
        let today = self.ctx.clock.today();
        let medications = db::fetch_schedulable_medications(conn, today)?;

        let mut scheduled = 0;
        for medication in &medications {
            match db::get_patient(conn, &medication.patient_id)? {
                Some(patient) => {
                    self.schedule_for_medication(medication, &patient);
                    scheduled += 1;
                }
                None => {
                    tracing::warn!(
                        medication_id = %medication.id,
                        patient_id = %medication.patient_id,
                        "rebuild: owning patient missing, entry skipped"
                    );
                }
            }
        }
        tracing::info!(scheduled, "timer registry rebuilt");
        Ok(scheduled)
    }

    /// Live trigger count for one medication.
    pub fn trigger_count(&self, medication_id: &Uuid) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(medication_id)
            .map(|t| t.triggers.len())
            .unwrap_or(0)
    }

    /// Scheduled times with a live trigger, for diagnostics.
    pub fn trigger_times(&self, medication_id: &Uuid) -> Vec<NaiveTime> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(medication_id)
            .map(|t| t.triggers.iter().map(|e| e.time).collect())
            .unwrap_or_default()
    }

    /// Number of medications with a live entry.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (id, timers) in entries.drain() {
            abort_all(&id, timers);
        }
    }
}

fn abort_all(medication_id: &Uuid, timers: MedicationTimers) {
    for entry in timers.triggers {
        entry.task.abort();
    }
    tracing::debug!(medication_id = %medication_id, "reminder triggers cancelled");
}

fn fire_once(
    ctx: &SchedulerContext,
    medication_id: &Uuid,
    time: NaiveTime,
) -> Result<FireOutcome, StoreError> {
    let conn = ctx.open_store()?;
    fire_trigger(
        &conn,
        ctx.clock.as_ref(),
        ctx.dispatcher.as_ref(),
        medication_id,
        time,
    )
}

/// One firing of a registry trigger. Re-reads persisted state so a
/// medication deactivated after scheduling never sends a stale
/// reminder, and defers to the shared per-instant ledger for dedup.
pub fn fire_trigger(
    conn: &Connection,
    clock: &dyn Clock,
    dispatcher: &dyn NotificationDispatcher,
    medication_id: &Uuid,
    time: NaiveTime,
) -> Result<FireOutcome, StoreError> {
    let Some(medication) = db::get_medication(conn, medication_id)? else {
        return Ok(FireOutcome::Deactivated);
    };
    let today = clock.today();
    if !medication.is_schedulable(today) {
        return Ok(FireOutcome::Deactivated);
    }

    let Some(patient) = db::get_patient(conn, &medication.patient_id)? else {
        return Ok(FireOutcome::Deactivated);
    };
    if !patient.has_channel() {
        return Ok(FireOutcome::Skipped);
    }

    if ledger::already_sent_today(conn, medication_id, time, today)? {
        return Ok(FireOutcome::AlreadySent);
    }

    let payload = NotificationPayload::dose_reminder(
        &medication.name,
        &medication.dose,
        &time.format("%H:%M").to_string(),
    );
    let channel = patient.notify_channel.as_deref().unwrap_or_default();
    if !dispatcher.send(channel, &payload) {
        return Ok(FireOutcome::DispatchFailed);
    }

    ledger::mark_sent(conn, medication_id, time, today, clock.now())?;
    Ok(FireOutcome::Sent)
}

/// Delay until the next daily occurrence of `time`: later today if
/// still ahead, otherwise the same instant tomorrow.
pub fn next_fire_delay(now: NaiveDateTime, time: NaiveTime) -> Duration {
    let today_target = now.date().and_time(time);
    let target = if today_target > now {
        today_target
    } else {
        today_target + chrono::Duration::days(1)
    };
    (target - now).to_std().unwrap_or(Duration::ZERO)
}
