use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::issue::{CloseReason, IssueState};

/// Shares the issue numbering space on GitHub/GitLab/Bitbucket; carries
/// everything `Issue` carries plus merge metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
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
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
    pub head_sha: Option<String>,
    pub base_branch: Option<String>,
}

impl PullRequest {
    pub fn id(&self) -> Uuid {
        crate::ids::uuid_v5_from_key(&format!("pull_request|{}|{}", self.repo_id, self.number))
    }

    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

/// A single file touched by a PR, as reported by the provider's PR-files
/// endpoint — distinct from a `Commit`'s per-commit patches since a PR's
/// file list is the squashed view across all its commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestFile {
    pub pr_id: Uuid,
    pub path: String,
    pub additions: u32,
    pub deletions: u32,
    pub is_renamed: bool,
    pub previous_path: Option<String>,
}
