//! The entity-graph's node/edge vocabulary.
//!
//! Every node carries `repo_id` plus a provider-stable unique key so the
//! graph can be torn down and rebuilt from the relational store without
//! ever minting a different id for the same logical entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Developer,
    File,
    Commit,
    Issue,
    PullRequest,
    CodeBlock,
}

/// One graph node. `key` is the value the node is unique on within its
/// kind (normalised email, canonical path, sha, issue/PR number, or block
/// id) — used both to build the node and to look it up again when wiring
/// edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub repo_id: Uuid,
    pub kind: NodeKind,
    pub key: String,
    pub attrs: serde_json::Value,
}

impl GraphNode {
    /// The unique key petgraph/sled index on: distinguishes nodes of the
    /// same kind from each other without colliding across repos or kinds.
    pub fn unique_key(&self) -> String {
        format!("{}|{:?}|{}", self.repo_id, self.kind, self.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Authored,
    /// Commit -> File, first commit (in topological order) to touch the
    /// file's canonical path.
    Created,
    /// Commit -> File, every touch after the file's `Created` edge.
    Modified,
    /// Developer -> Issue/PullRequest, the timeline's "opened" actor.
    Opened,
    MergedAs,
    FixedBy,
    AssociatedWith,
    CoChangesWith,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Authored => "AUTHORED",
            EdgeKind::Created => "CREATED",
            EdgeKind::Modified => "MODIFIED",
            EdgeKind::Opened => "OPENED",
            EdgeKind::MergedAs => "MERGED_AS",
            EdgeKind::FixedBy => "FIXED_BY",
            EdgeKind::AssociatedWith => "ASSOCIATED_WITH",
            EdgeKind::CoChangesWith => "CO_CHANGES_WITH",
        }
    }
}

/// An edge, carrying the evidence/confidence pair that `FIXED_BY`/
/// `ASSOCIATED_WITH` need (every other edge kind leaves these empty, since
/// they are 100%-confidence structural edges with no evidence to record).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub evidence: Vec<String>,
    pub confidence: Option<f64>,
}

impl GraphEdge {
    pub fn structural(kind: EdgeKind) -> Self {
        Self {
            kind,
            evidence: Vec::new(),
            confidence: None,
        }
    }

    pub fn evidenced(kind: EdgeKind, evidence: Vec<String>, confidence: f64) -> Self {
        Self {
            kind,
            evidence,
            confidence: Some(confidence),
        }
    }
}
