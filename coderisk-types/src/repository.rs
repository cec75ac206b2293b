use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Root of a multi-tenant namespace. Every other entity in this crate
/// carries `repo_id` and cascades on delete from this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub repo_id: Uuid,
    /// "owner/repo" (GitHub/Bitbucket) or numeric-id-or-path (GitLab).
    pub provider_project: String,
    pub provider: ProviderKind,
    pub default_branch: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    GitHub,
    GitLab,
    Bitbucket,
}
