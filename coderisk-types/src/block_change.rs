use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
    Renamed,
}

/// One commit's effect on one code block, as produced by the Atomizer.
/// `(block_id, commit_id)`-unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockChange {
    pub block_id: Uuid,
    pub commit_id: Uuid,
    pub repo_id: Uuid,
    pub change_type: ChangeType,
    pub lines_added: u32,
    pub lines_removed: u32,
    pub committed_at: DateTime<Utc>,
    /// Set when the change is judged to be whitespace/formatting/rename
    /// churn rather than a semantic edit. Excluded from the risk indexer's
    /// incident and coupling passes.
    pub is_refactor_only: bool,
}

impl BlockChange {
    pub fn id(&self) -> Uuid {
        crate::ids::block_change_id(self.block_id, self.commit_id)
    }
}
