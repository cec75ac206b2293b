use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single issue/PR timeline event (`cross-referenced`, `labeled`,
/// `closed`, `reopened`, ...) as reported by the provider's timeline
/// endpoint. Staged verbatim so the Grapher's cross-reference pattern
/// never has to re-fetch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub repo_id: Uuid,
    pub issue_number: u64,
    pub event_type: String,
    pub actor_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl TimelineEvent {
    pub fn id(&self) -> Uuid {
        crate::ids::uuid_v5_from_key(&format!(
            "timeline|{}|{}|{}|{}",
            self.repo_id,
            self.issue_number,
            self.event_type,
            self.created_at.timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    /// Whether this event's `event_type` is a cross-reference from another
    /// issue/PR — the only kind pattern 5 (cross-reference) consults.
    pub fn is_cross_referenced(&self) -> bool {
        self.event_type == "cross-referenced"
    }
}
