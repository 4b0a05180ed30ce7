//! Periodic task runner — process-wide fixed triggers.
//!
//! Orchestration only: every job body opens a store connection, calls
//! into one core module, and logs the result. Each job is a sequential
//! loop (sleep until due, run, loop), so a firing that would start
//! before the previous one finished is queued behind it rather than
//! overlapping it — two passes can never race on the dedup ledger.
//! A failing body is logged and the job survives to its next
//! occurrence; nothing here is fatal to the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use tokio::task::JoinHandle;

use crate::adherence;
use crate::config::REMINDER_TICK_MINUTES;
use crate::conflict;
use crate::context::SchedulerContext;
use crate::db;
use crate::reminder;

/// Sleep granularity for responsive shutdown.
const SHUTDOWN_POLL_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    EveryMinutes(u64),
    DailyAt(NaiveTime),
    WeeklyAt(Weekday, NaiveTime),
}

/// Delay from `now` until the schedule's next occurrence.
pub fn next_delay(schedule: JobSchedule, now: NaiveDateTime) -> Duration {
    match schedule {
        JobSchedule::EveryMinutes(minutes) => Duration::from_secs(minutes * 60),
        JobSchedule::DailyAt(time) => {
            let today = now.date().and_time(time);
            let target = if today > now {
                today
            } else {
                today + chrono::Duration::days(1)
            };
            (target - now).to_std().unwrap_or(Duration::ZERO)
        }
        JobSchedule::WeeklyAt(weekday, time) => {
            let days_ahead = (7 + weekday.num_days_from_monday() as i64
                - now.date().weekday().num_days_from_monday() as i64)
                % 7;
            let candidate = (now.date() + chrono::Duration::days(days_ahead)).and_time(time);
            let target = if candidate > now {
                candidate
            } else {
                candidate + chrono::Duration::days(7)
            };
            (target - now).to_std().unwrap_or(Duration::ZERO)
        }
    }
}

/// Handle for the running scheduler. Supports graceful shutdown via
/// `shutdown()` or automatic cleanup on `Drop`.
pub struct RunnerHandle {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl RunnerHandle {
    /// Request shutdown: a firing already in flight completes, no
    /// further firings start.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl Drop for RunnerHandle {
    fn drop(&mut self) {
        self.shutdown();
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

/// Start the full fixed job set. Must run inside a tokio runtime.
pub fn start(ctx: Arc<SchedulerContext>) -> RunnerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::new();

    let jobs: Vec<(&'static str, JobSchedule)> = vec![
        (
            "reminder-pass",
            JobSchedule::EveryMinutes(REMINDER_TICK_MINUTES),
        ),
        ("no-show-sweep", JobSchedule::EveryMinutes(60)),
        ("health-ping", JobSchedule::EveryMinutes(60)),
        (
            "retention-cleanup",
            JobSchedule::DailyAt(ctx.config.cleanup_at),
        ),
        (
            "daily-statistics",
            JobSchedule::DailyAt(ctx.config.statistics_at),
        ),
        (
            "weekly-adherence-report",
            JobSchedule::WeeklyAt(Weekday::Mon, ctx.config.weekly_report_at),
        ),
    ];

    for (name, schedule) in jobs {
        handles.push(spawn_job(name, schedule, ctx.clone(), shutdown.clone()));
    }

    tracing::info!(jobs = handles.len(), "periodic task runner started");
    RunnerHandle { shutdown, handles }
}

fn spawn_job(
    name: &'static str,
    schedule: JobSchedule,
    ctx: Arc<SchedulerContext>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay = next_delay(schedule, ctx.clock.now());
            if !interruptible_sleep(delay, &shutdown).await {
                tracing::info!(job = name, "job loop shutting down");
                return;
            }
            run_job(name, &ctx);
        }
    })
}

/// Sleep in small increments so shutdown is picked up promptly.
/// Returns false when shutdown was requested.
async fn interruptible_sleep(total: Duration, shutdown: &AtomicBool) -> bool {
    let mut remaining = total;
    let step = Duration::from_secs(SHUTDOWN_POLL_SECS);
    while remaining > Duration::ZERO {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let chunk = remaining.min(step);
        tokio::time::sleep(chunk).await;
        remaining = remaining.saturating_sub(chunk);
    }
    !shutdown.load(Ordering::Relaxed)
}

fn run_job(name: &'static str, ctx: &SchedulerContext) {
    let result = dispatch_job(name, ctx);
    if let Err(e) = result {
        // PersistenceFailure policy: log, skip this cycle, the next
        // scheduled occurrence retries.
        tracing::warn!(job = name, error = %e, "job failed, retrying next cycle");
    }
}

fn dispatch_job(name: &str, ctx: &SchedulerContext) -> Result<(), Box<dyn std::error::Error>> {
    match name {
        "reminder-pass" => {
            let conn = ctx.open_store()?;
            reminder::run_reminder_pass(
                &conn,
                ctx.clock.as_ref(),
                ctx.dispatcher.as_ref(),
                &ctx.config,
            )?;
        }
        "no-show-sweep" => {
            let conn = ctx.open_store()?;
            conflict::sweep_no_shows(&conn, ctx.clock.as_ref(), ctx.config.no_show_grace_minutes)?;
        }
        "health-ping" => {
            tracing::info!(
                version = crate::config::APP_VERSION,
                "scheduler heartbeat"
            );
        }
        "retention-cleanup" => {
            let conn = ctx.open_store()?;
            let cutoff = ctx.clock.today() - chrono::Duration::days(ctx.config.retention_days);
            let (doses, appointments) = db::purge_expired(&conn, cutoff)?;
            tracing::info!(doses, appointments, %cutoff, "retention cleanup complete");
        }
        "daily-statistics" => {
            let conn = ctx.open_store()?;
            let stats = db::fetch_daily_statistics(&conn, ctx.clock.today())?;
            tracing::info!(
                reminders_sent = stats.reminders_sent,
                doses_taken = stats.doses_taken,
                doses_missed = stats.doses_missed,
                appointments = stats.appointments,
                "daily statistics"
            );
        }
        "weekly-adherence-report" => {
            let conn = ctx.open_store()?;
            adherence::run_weekly_adherence_report(
                &conn,
                ctx.clock.as_ref(),
                ctx.dispatcher.as_ref(),
            )?;
        }
        other => {
            tracing::warn!(job = other, "unknown job name");
        }
    }
    Ok(())
}
