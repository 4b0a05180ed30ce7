use std::path::PathBuf;

use chrono::NaiveTime;

/// Application-level constants
pub const APP_NAME: &str = "Adhera";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reminder pass cadence in minutes.
pub const REMINDER_TICK_MINUTES: u64 = 5;

/// Default `tracing` filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory
/// ~/Adhera/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join("Adhera")
}

/// Default location of the record store.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("adhera.db")
}

/// Tunables for the scheduling core. Constructed once at process start
/// and carried in the `SchedulerContext`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Symmetric half-window around a scheduled time within which a
    /// tick counts as a match. 2 minutes against a 5-minute tick means
    /// every scheduled time lands inside exactly one tick.
    pub tolerance_minutes: i64,
    /// A dose with no record this long after its scheduled time is
    /// considered missed.
    pub missed_dose_offset_minutes: i64,
    /// Width of the missed-dose detection window after the offset.
    /// `0` requires the exact-minute equality; the tick cadence (5)
    /// tolerates a skipped tick.
    pub missed_dose_window_minutes: i64,
    /// Grace period after an appointment's end before the sweep marks
    /// it a no-show.
    pub no_show_grace_minutes: i64,
    /// Dose history and appointments older than this are purged.
    pub retention_days: i64,
    /// Offset of the reference timezone from UTC, in minutes.
    pub utc_offset_minutes: i32,
    /// Daily time of the retention cleanup job.
    pub cleanup_at: NaiveTime,
    /// Daily time of the statistics job.
    pub statistics_at: NaiveTime,
    /// Weekly adherence report: fires Mondays at this time.
    pub weekly_report_at: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tolerance_minutes: 2,
            missed_dose_offset_minutes: 30,
            missed_dose_window_minutes: 0,
            no_show_grace_minutes: 120,
            retention_days: 365,
            utc_offset_minutes: 0,
            cleanup_at: NaiveTime::from_hms_opt(3, 30, 0).unwrap_or_default(),
            statistics_at: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
            weekly_report_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
        }
    }
}
