pub mod adherence; // Adherence rate + weekday pattern + weekly report
pub mod clock; // Wall-clock collaborator (test-substitutable)
pub mod config;
pub mod conflict; // Appointment slot conflicts + status machine
pub mod context; // Shared scheduler context
pub mod db;
pub mod dispatch; // Outbound notification collaborator
pub mod ledger; // Per-instant reminder dedup
pub mod models;
pub mod registry; // Per-medication recurring triggers
pub mod reminder; // Periodic reminder pass + missed-dose detection
pub mod runner; // Process-wide periodic jobs
pub mod window; // Time-window matcher

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::context::SchedulerContext;
use crate::dispatch::LogDispatcher;

/// Initialize tracing
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Build the default production context at the standard data location.
pub fn default_context(config: config::SchedulerConfig) -> SchedulerContext {
    let clock = Arc::new(SystemClock::new(config.utc_offset_minutes));
    SchedulerContext::new(
        config::default_db_path(),
        clock,
        Arc::new(LogDispatcher),
        config,
    )
}

/// Start the scheduling engine: rebuild the timer registry from
/// persisted state, then launch the periodic job set. The returned
/// handles stop their triggers on drop.
pub fn start(
    ctx: Arc<SchedulerContext>,
) -> Result<(registry::TimerRegistry, runner::RunnerHandle), db::StoreError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let timers = registry::TimerRegistry::new(ctx.clone());
    let conn = ctx.open_store()?;
    timers.rebuild(&conn)?;

    let handle = runner::start(ctx);
    Ok((timers, handle))
}
