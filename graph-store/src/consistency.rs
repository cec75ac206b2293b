//! Per-entity-class drift check between the relational store and its graph
//! projection. A mismatch means the
//! projection is stale, not that the relational store is wrong — it is
//! always authoritative — so the only repair action is `build::rebuild_full`.

use relational_store::{code_blocks, commits, issues, pull_requests, Pool};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;
use crate::model::NodeKind;
use crate::store::GraphStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCountCheck {
    pub kind: NodeKind,
    pub relational_count: i64,
    pub graph_count: i64,
}

impl EntityCountCheck {
    pub fn is_consistent(&self) -> bool {
        self.relational_count == self.graph_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub repo_id: Uuid,
    pub checks: Vec<EntityCountCheck>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.checks.iter().all(EntityCountCheck::is_consistent)
    }
}

/// Compares row counts per entity class. Developers and files are excluded:
/// they accrete from commits rather than being independently stageable, so
/// their counts legitimately drift between a relational snapshot taken
/// mid-stage and a graph snapshot taken after it.
pub async fn check(store: &GraphStore, pool: &Pool, repo_id: Uuid) -> Result<ConsistencyReport> {
    let commit_count = commits::count_commits(pool, repo_id).await?;
    let issue_count = issues::count_issues(pool, repo_id).await?;
    let pr_count = pull_requests::count_pull_requests(pool, repo_id).await?;
    let block_count = code_blocks::count_active_blocks(pool, repo_id).await?;

    let checks = vec![
        EntityCountCheck {
            kind: NodeKind::Commit,
            relational_count: commit_count,
            graph_count: store.nodes_of_kind(NodeKind::Commit).count() as i64,
        },
        EntityCountCheck {
            kind: NodeKind::Issue,
            relational_count: issue_count,
            graph_count: store.nodes_of_kind(NodeKind::Issue).count() as i64,
        },
        EntityCountCheck {
            kind: NodeKind::PullRequest,
            relational_count: pr_count,
            graph_count: store.nodes_of_kind(NodeKind::PullRequest).count() as i64,
        },
        EntityCountCheck {
            kind: NodeKind::CodeBlock,
            relational_count: block_count,
            graph_count: store.nodes_of_kind(NodeKind::CodeBlock).count() as i64,
        },
    ];

    Ok(ConsistencyReport { repo_id, checks })
}
