//! Local git mirror and rename-chain cache for the ingestion pipeline.
//!
//! Repos are bare-cloned once per `repo_id` and fetched incrementally on
//! every subsequent run; a `sled` database sitting alongside each clone
//! memoizes rename-chain resolutions and oversized diff blobs so repeated
//! Stager/Atomizer passes don't re-walk history or re-slice patches.

pub mod cache;
pub mod clone;
pub mod errors;
pub mod rename_chain;

pub use cache::{CachedRenameChain, RepoCache};
pub use clone::{cache_root, ensure_cloned};
pub use errors::{RepoCacheError, Result};
pub use rename_chain::resolve_rename_chain;

use std::path::PathBuf;

use tokio::task;
use tracing::instrument;
use uuid::Uuid;

/// Clones/fetches a repo, then resolves (and caches) the rename chain for
/// one canonical path. The typical call site is the Atomizer, just before
/// it commits a `FileIdentity` update for a file it has just seen renamed.
#[instrument(skip(base_dir, clone_url))]
pub async fn ensure_cloned_and_resolve(
    base_dir: PathBuf,
    repo_id: Uuid,
    clone_url: String,
    canonical_path: String,
) -> Result<Vec<String>> {
    let repo_path = ensure_cloned(base_dir.clone(), repo_id, clone_url).await?;
    let cache = RepoCache::open(&repo_path.join(".coderisk-cache"))?;

    if let Some(cached) = cache.get_rename_chain(repo_id, &canonical_path)? {
        return Ok(cached.historical_paths);
    }

    let path_for_blocking = repo_path.clone();
    let canonical_for_blocking = canonical_path.clone();
    let chain = task::spawn_blocking(move || {
        resolve_rename_chain(&path_for_blocking, &canonical_for_blocking)
    })
    .await??;

    cache.put_rename_chain(
        repo_id,
        &canonical_path,
        &CachedRenameChain {
            historical_paths: chain.clone(),
            resolved_at_head: head_sha(&repo_path)?,
        },
    )?;
    cache.flush()?;

    Ok(chain)
}

fn head_sha(repo_path: &std::path::Path) -> Result<String> {
    let repo = git2::Repository::open_bare(repo_path).or_else(|_| git2::Repository::open(repo_path))?;
    let head = repo.head()?;
    Ok(head
        .target()
        .map(|oid| oid.to_string())
        .unwrap_or_default())
}
