//! Force-push detection: a repo's history is only "append-only" until
//! someone rewrites it. When that happens, every `BlockChange`/`CodeBlock`
//! derived from the rewritten commits is suspect, so the Atomizer's
//! watermark gets cleared and those commits are re-atomized from scratch
//!.
//!
//! Uses the same SHA-256 content-addressed keying as any other
//! content-hash cache, applied here to fingerprint the shape of history
//! itself instead of a blob's contents.

use coderisk_types::ids::hash_content;
use relational_store::{commits, repositories, Pool};
use tracing::warn;
use uuid::Uuid;

use crate::errors::Result;

/// A single `{parent_sha -> child_sha}` edge, in the order commits were
/// staged, hashed into one fingerprint per repo. Unchanged history always
/// reproduces the same fingerprint; a force-push reorders or drops edges
/// and changes it.
pub fn fingerprint(parent_child_pairs: &[(String, String)]) -> String {
    let mut buf = String::new();
    for (parent, child) in parent_child_pairs {
        buf.push_str(parent);
        buf.push('\0');
        buf.push_str(child);
        buf.push('\n');
    }
    hash_content(buf.as_bytes())
}

/// Computes the current fingerprint from every staged commit's
/// parent-edge set, in topological order so the fingerprint is
/// reproducible across runs of the same history.
pub async fn current_fingerprint(pool: &Pool, repo_id: Uuid) -> Result<String> {
    let all = commits::all_commits_topo_order(pool, repo_id).await?;
    let pairs: Vec<(String, String)> = all
        .iter()
        .flat_map(|c| c.parent_shas.iter().map(move |p| (p.clone(), c.sha.clone())))
        .collect();
    Ok(fingerprint(&pairs))
}

/// Compares a freshly-computed fingerprint against the last known one.
/// `None` as `previous` means first run — never a force-push. Returns
/// whether history was rewritten since the fingerprint was last recorded.
pub fn detect(previous: Option<&str>, current: &str) -> bool {
    matches!(previous, Some(prev) if prev != current)
}

/// Clears the atomizer watermark for the whole repo, forcing a full
/// re-atomize on the next run. The only repair action available once a
/// force-push is detected.
pub async fn handle_force_push(pool: &Pool, repo_id: Uuid) -> Result<()> {
    commits::clear_atomizer_watermark(pool, repo_id).await?;
    Ok(())
}

/// Recomputes the repo's history fingerprint, compares it against the
/// last recorded one, clears the atomizer watermark if history moved out
/// from under us, and persists the new fingerprint either way. Called by
/// the Atomizer at the start of every run, before it processes anything.
pub async fn check_and_handle(pool: &Pool, repo_id: Uuid) -> Result<bool> {
    let previous = repositories::history_fingerprint(pool, repo_id).await?;
    let current = current_fingerprint(pool, repo_id).await?;

    let force_pushed = detect(previous.as_deref(), &current);
    if force_pushed {
        warn!(%repo_id, "force-push detected, clearing atomizer watermark");
        handle_force_push(pool, repo_id).await?;
    }
    repositories::set_history_fingerprint(pool, repo_id, &current).await?;
    Ok(force_pushed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_sensitive() {
        let a = fingerprint(&[("p1".into(), "c1".into()), ("p2".into(), "c2".into())]);
        let b = fingerprint(&[("p2".into(), "c2".into()), ("p1".into(), "c1".into())]);
        assert_ne!(a, b);
    }

    #[test]
    fn no_previous_fingerprint_is_never_a_force_push() {
        assert!(!detect(None, "anything"));
    }

    #[test]
    fn changed_fingerprint_is_a_force_push() {
        assert!(detect(Some("old"), "new"));
        assert!(!detect(Some("same"), "same"));
    }
}
