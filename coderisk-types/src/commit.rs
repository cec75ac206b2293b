use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diff::FilePatch;

/// Identity information for whoever authored or committed a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

/// Per-pipeline-stage idempotency watermark for a single commit. `None`
/// means "not yet processed by this stage"; stages only advance their own
/// field, and only for commits that fully committed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedAt {
    pub staged_at: Option<DateTime<Utc>>,
    pub graphed_at: Option<DateTime<Utc>>,
    pub atomized_at: Option<DateTime<Utc>>,
    pub indexed_at: Option<DateTime<Utc>>,
}

/// `(repo_id, sha)`-unique. Invariant: within a repo, `topological_index`
/// forms a linear extension of the parent-DAG — every parent has a
/// strictly smaller index than its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub repo_id: Uuid,
    pub sha: String,
    pub author: Identity,
    pub committer: Identity,
    pub parent_shas: Vec<String>,
    pub topological_index: i64,
    pub patches: Vec<FilePatch>,
    pub message: String,
    pub processed_at: ProcessedAt,
}

impl Commit {
    pub fn id(&self) -> Uuid {
        crate::ids::commit_id(self.repo_id, &self.sha)
    }

    pub fn is_merge(&self) -> bool {
        self.parent_shas.len() > 1
    }
}
