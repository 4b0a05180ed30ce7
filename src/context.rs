//! Scheduler context — the one shared state object.
//!
//! Constructed once at process start and passed to the task runner and
//! timer registry, replacing any global scheduler state. The clock and
//! dispatcher are trait objects so tests substitute doubles; the store
//! is opened per operation (connections are cheap, single-record
//! operations are atomic).

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::db::{self, StoreError};
use crate::dispatch::NotificationDispatcher;

pub struct SchedulerContext {
    pub db_path: PathBuf,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub config: SchedulerConfig,
}

impl SchedulerContext {
    pub fn new(
        db_path: PathBuf,
        clock: Arc<dyn Clock>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            db_path,
            clock,
            dispatcher,
            config,
        }
    }

    /// Open a store connection for one operation or pass.
    pub fn open_store(&self) -> Result<Connection, StoreError> {
        db::open_database(&self.db_path)
    }
}
