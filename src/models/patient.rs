use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    /// Outbound notification channel id. `None` means no channel is
    /// linked and the reminder path skips this patient.
    pub notify_channel: Option<String>,
}

impl Patient {
    pub fn has_channel(&self) -> bool {
        self.notify_channel
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}
