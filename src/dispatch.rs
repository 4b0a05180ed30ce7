//! Outbound notification collaborator.
//!
//! The core only decides *when* and *whether* to attempt delivery.
//! Implementations return `false` for ordinary delivery failure —
//! the scheduling core leaves state untouched and the next periodic
//! firing retries naturally.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DoseReminder,
    AdherenceReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

impl NotificationPayload {
    pub fn dose_reminder(medication_name: &str, dose: &str, scheduled_time: &str) -> Self {
        Self {
            kind: NotificationKind::DoseReminder,
            title: format!("Time for {medication_name}"),
            body: format!("{dose} scheduled at {scheduled_time}"),
        }
    }

    pub fn adherence_report(patient_name: &str, rate: u32, taken: u32, total: u32) -> Self {
        Self {
            kind: NotificationKind::AdherenceReport,
            title: format!("Weekly adherence for {patient_name}"),
            body: format!("{taken} of {total} doses taken ({rate}%)"),
        }
    }
}

pub trait NotificationDispatcher: Send + Sync {
    /// Attempt delivery to `channel`. `false` means ordinary delivery
    /// failure; implementations must not panic for that case.
    fn send(&self, channel: &str, payload: &NotificationPayload) -> bool;
}

/// Default stub: logs the payload and reports success. Hosts wire a
/// real transport here.
pub struct LogDispatcher;

impl NotificationDispatcher for LogDispatcher {
    fn send(&self, channel: &str, payload: &NotificationPayload) -> bool {
        match serde_json::to_string(payload) {
            Ok(json) => {
                tracing::info!(channel, payload = %json, "notification dispatched");
                true
            }
            Err(e) => {
                tracing::warn!(channel, error = %e, "failed to encode notification");
                false
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every send; configurable success.
    pub struct RecordingDispatcher {
        pub sent: Mutex<Vec<(String, NotificationPayload)>>,
        pub succeed: bool,
    }

    impl RecordingDispatcher {
        pub fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                succeed: true,
            }
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                succeed: false,
            }
        }

        pub fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl NotificationDispatcher for RecordingDispatcher {
        fn send(&self, channel: &str, payload: &NotificationPayload) -> bool {
            self.sent
                .lock()
                .unwrap()
                .push((channel.to_string(), payload.clone()));
            self.succeed
        }
    }
}
