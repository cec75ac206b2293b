use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of an issue/PR the commenter was standing on when they wrote
/// it. Feeds the Grapher's comment-pattern confidence weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommenterRole {
    Owner,
    Collaborator,
    Contributor,
    Bot,
}

/// Which entity a comment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentParentKind {
    Issue,
    PullRequest,
}

/// A single issue or PR comment, with enough context for comment-pattern
/// link resolution to extract SHA/issue/PR cross-references from the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub repo_id: Uuid,
    pub parent_kind: CommentParentKind,
    pub parent_number: u64,
    pub provider_comment_id: String,
    pub author_normalized_email: Option<String>,
    pub author_role: CommenterRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn id(&self) -> Uuid {
        crate::ids::uuid_v5_from_key(&format!(
            "comment|{}|{:?}|{}|{}",
            self.repo_id, self.parent_kind, self.parent_number, self.provider_comment_id
        ))
    }
}
