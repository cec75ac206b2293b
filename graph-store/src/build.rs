//! Full rebuild of the entity graph from the relational store. Used on
//! first boot, after a force-push clears the atomizer watermark, and
//! whenever the consistency validator in `resilience` flags drift it can't
//! reconcile incrementally.

use std::collections::HashSet;

use relational_store::{
    block_changes, code_blocks, commits, developers, file_identities, issues, links,
    pull_requests, risk, Pool,
};
use uuid::Uuid;

use crate::errors::Result;
use crate::model::{EdgeKind, GraphEdge, GraphNode, NodeKind};
use crate::store::GraphStore;

/// Approximate confidence for a co-change edge when only the partner count
/// is on hand, mirroring the coupling term's saturation point in the risk
/// score (`coderisk_types::risk_index`, saturates at 20 co-changing blocks).
const COUPLING_SATURATION: f64 = 20.0;

fn node_key(repo_id: Uuid, kind: NodeKind, key: &str) -> String {
    GraphNode {
        repo_id,
        kind,
        key: key.to_string(),
        attrs: serde_json::Value::Null,
    }
    .unique_key()
}

/// Rebuilds the entire graph for one repo from scratch. Callers decide
/// whether to `GraphStore::clear` first (a full `sync`) or call this on an
/// empty store (first boot).
pub async fn rebuild_full(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    rebuild_developers(store, pool, repo_id).await?;
    rebuild_files(store, pool, repo_id).await?;
    rebuild_commits(store, pool, repo_id).await?;
    rebuild_issues(store, pool, repo_id).await?;
    rebuild_pull_requests(store, pool, repo_id).await?;
    rebuild_links(store, pool, repo_id).await?;
    rebuild_code_blocks(store, pool, repo_id).await?;
    rebuild_coupling(store, pool, repo_id).await?;
    store.flush()?;
    Ok(())
}

async fn rebuild_developers(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for dev in developers::all_developers(pool, repo_id).await? {
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::Developer,
            key: dev.normalized_email.clone(),
            attrs: serde_json::json!({
                "name": dev.name,
                "first_active": dev.first_active,
                "last_active": dev.last_active,
            }),
        })?;
    }
    Ok(())
}

async fn rebuild_files(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for identity in file_identities::all_file_identities(pool, repo_id).await? {
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::File,
            key: identity.canonical_path.clone(),
            attrs: serde_json::json!({ "historical_paths": identity.historical_paths }),
        })?;
    }
    Ok(())
}

/// Ensures a `File` node exists for `path` even when no rename was ever
/// recorded for it in `file_identities` (the common case: most files are
/// never renamed).
fn ensure_file_node(store: &mut GraphStore, repo_id: Uuid, path: &str) -> Result<()> {
    if store.get_node(&node_key(repo_id, NodeKind::File, path)).is_none() {
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::File,
            key: path.to_string(),
            attrs: serde_json::json!({ "historical_paths": [] }),
        })?;
    }
    Ok(())
}

/// Iterates commits in topological order (guaranteed by `topo::assign`
/// having already run this sync) so the first commit to touch a path is
/// unambiguous: that touch gets `CREATED`, every later one `MODIFIED`.
async fn rebuild_commits(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    let mut files_touched: HashSet<String> = HashSet::new();
    for commit in commits::all_commits_topo_order(pool, repo_id).await? {
        let commit_key = node_key(repo_id, NodeKind::Commit, &commit.sha);
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::Commit,
            key: commit.sha.clone(),
            attrs: serde_json::json!({
                "message": commit.message,
                "topological_index": commit.topological_index,
                "authored_at": commit.author.when,
                "is_merge": commit.is_merge(),
            }),
        })?;

        let dev_key = node_key(repo_id, NodeKind::Developer, &commit.author.email);
        if store.get_node(&dev_key).is_some() {
            store.upsert_edge(&dev_key, &commit_key, GraphEdge::structural(EdgeKind::Authored))?;
        }

        for patch in &commit.patches {
            let Some(path) = patch.effective_path() else {
                continue;
            };
            ensure_file_node(store, repo_id, path)?;
            let file_key = node_key(repo_id, NodeKind::File, path);
            let kind = if files_touched.insert(path.to_string()) {
                EdgeKind::Created
            } else {
                EdgeKind::Modified
            };
            store.upsert_edge(&commit_key, &file_key, GraphEdge::structural(kind))?;
        }
    }
    Ok(())
}

/// First "opened" timeline event's actor, if any — the closest thing the
/// staged data has to issue/PR authorship (neither `github_issues` nor
/// `github_pull_requests` carries an author column; see DESIGN.md).
async fn opener_email(pool: &Pool, repo_id: Uuid, number: u64) -> Result<Option<String>> {
    let events = relational_store::timeline::timeline_for_issue(pool, repo_id, number).await?;
    Ok(events
        .into_iter()
        .find(|e| e.event_type == "opened")
        .and_then(|e| e.actor_email))
}

async fn rebuild_issues(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for issue in issues::all_issues(pool, repo_id).await? {
        let issue_key = node_key(repo_id, NodeKind::Issue, &issue.number.to_string());
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::Issue,
            key: issue.number.to_string(),
            attrs: serde_json::json!({
                "title": issue.title,
                "state": issue.state,
                "close_reason": issue.close_reason,
                "labels": issue.labels,
            }),
        })?;

        if let Some(email) = opener_email(pool, repo_id, issue.number).await? {
            let dev_key = node_key(repo_id, NodeKind::Developer, &email);
            if store.get_node(&dev_key).is_some() {
                store.upsert_edge(&dev_key, &issue_key, GraphEdge::structural(EdgeKind::Opened))?;
            }
        }
    }
    Ok(())
}

async fn rebuild_pull_requests(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for pr in pull_requests::all_pull_requests(pool, repo_id).await? {
        let pr_key = node_key(repo_id, NodeKind::PullRequest, &pr.number.to_string());
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::PullRequest,
            key: pr.number.to_string(),
            attrs: serde_json::json!({
                "title": pr.title,
                "state": pr.state,
                "merged_at": pr.merged_at,
            }),
        })?;

        if let Some(email) = opener_email(pool, repo_id, pr.number).await? {
            let dev_key = node_key(repo_id, NodeKind::Developer, &email);
            if store.get_node(&dev_key).is_some() {
                store.upsert_edge(&dev_key, &pr_key, GraphEdge::structural(EdgeKind::Opened))?;
            }
        }

        if let Some(sha) = &pr.merge_commit_sha {
            let commit_key = node_key(repo_id, NodeKind::Commit, sha);
            if store.get_node(&commit_key).is_some() {
                store.upsert_edge(&pr_key, &commit_key, GraphEdge::structural(EdgeKind::MergedAs))?;
            }
        }
    }
    Ok(())
}

/// A link's confidence decides whether it becomes the strong `FIXED_BY` edge
/// or the weaker `ASSOCIATED_WITH` one; 0.7 is the point past which at least
/// two independent patterns (or one near-certain one) have agreed.
const FIXED_BY_THRESHOLD: f64 = 0.7;

async fn rebuild_links(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for link in links::links_for_repo(pool, repo_id).await? {
        let issue_key = node_key(repo_id, NodeKind::Issue, &link.issue_number.to_string());
        if store.get_node(&issue_key).is_none() {
            continue;
        }

        let target_key = if let Some(pr_number) = link.pr_number {
            let key = node_key(repo_id, NodeKind::PullRequest, &pr_number.to_string());
            if store.get_node(&key).is_none() {
                continue;
            }
            key
        } else if let Some(sha) = &link.commit_sha {
            let key = node_key(repo_id, NodeKind::Commit, sha);
            if store.get_node(&key).is_none() {
                continue;
            }
            key
        } else {
            continue;
        };

        let kind = if link.confidence >= FIXED_BY_THRESHOLD {
            EdgeKind::FixedBy
        } else {
            EdgeKind::AssociatedWith
        };
        store.upsert_edge(
            &issue_key,
            &target_key,
            GraphEdge::evidenced(kind, link.evidence.clone(), link.confidence),
        )?;
    }
    Ok(())
}

async fn rebuild_code_blocks(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for (block_id, block) in code_blocks::all_active_blocks(pool, repo_id).await? {
        let block_key = node_key(repo_id, NodeKind::CodeBlock, &block_id.to_string());
        store.upsert_node(GraphNode {
            repo_id,
            kind: NodeKind::CodeBlock,
            key: block_id.to_string(),
            attrs: serde_json::json!({
                "canonical_path": block.canonical_path,
                "name": block.name,
                "kind": block.kind,
                "start_line": block.start_line,
                "end_line": block.end_line,
            }),
        })?;

        for change in block_changes::changes_for_block(pool, block_id).await? {
            let commit_key = node_key(repo_id, NodeKind::Commit, &change.commit_sha);
            if store.get_node(&commit_key).is_some() {
                store.upsert_edge(&commit_key, &block_key, GraphEdge::structural(EdgeKind::Modified))?;
            }
        }
    }
    Ok(())
}

async fn rebuild_coupling(store: &mut GraphStore, pool: &Pool, repo_id: Uuid) -> Result<()> {
    for (block_id, _) in code_blocks::all_active_blocks(pool, repo_id).await? {
        let block_key = node_key(repo_id, NodeKind::CodeBlock, &block_id.to_string());
        for (partner_id, count, _rate) in risk::coupling_partners(pool, block_id).await? {
            let partner_key = node_key(repo_id, NodeKind::CodeBlock, &partner_id.to_string());
            if store.get_node(&partner_key).is_none() {
                continue;
            }
            let confidence = (count as f64 / COUPLING_SATURATION).min(1.0);
            store.upsert_edge(
                &block_key,
                &partner_key,
                GraphEdge::evidenced(
                    EdgeKind::CoChangesWith,
                    vec![format!("co_change_count:{count}")],
                    confidence,
                ),
            )?;
        }
    }
    Ok(())
}
