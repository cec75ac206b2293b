use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

/// Reason an issue or PR was closed. `Completed` is the only reason that
/// feeds the Grapher's temporal pattern; `NotPlanned` and
/// `WontFix` are explicitly excluded from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Completed,
    NotPlanned,
    WontFix,
    Duplicate,
    Other,
}

impl CloseReason {
    /// Whether the temporal link-resolution pattern is allowed to consider
    /// this closure at all.
    pub fn eligible_for_temporal_pattern(self) -> bool {
        matches!(self, CloseReason::Completed)
    }
}

/// Number-unique within a repo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub repo_id: Uuid,
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: IssueState,
    pub close_reason: Option<CloseReason>,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn id(&self) -> Uuid {
        crate::ids::uuid_v5_from_key(&format!("issue|{}|{}", self.repo_id, self.number))
    }
}
