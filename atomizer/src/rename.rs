//! Identity tracking through file renames: a rename moves
//! every active block onto the new canonical path and archives the prior
//! path, atomically and without losing history. `repo-cache`'s local
//! key-value cache backfills the full historical-path chain via `git log
//! --follow` so chains survive gaps in what this run has itself atomized.

use std::path::PathBuf;

use coderisk_types::FileIdentity;
use relational_store::{code_blocks, file_identities, Pool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Result;

/// Where to find the local mirror `repo-cache` needs to resolve a rename
/// chain. `None` skips the chain backfill and still performs the direct
/// rename (the common case, one hop).
#[derive(Debug, Clone)]
pub struct RepoCacheConfig {
    pub base_dir: PathBuf,
    pub clone_url: String,
}

/// Moves `old_path`'s identity and every block under it onto `new_path`.
pub async fn handle_rename(
    pool: &Pool,
    repo_id: Uuid,
    old_path: &str,
    new_path: &str,
    repo_cache: Option<&RepoCacheConfig>,
) -> Result<()> {
    let mut identity = file_identities::find_by_any_path(pool, repo_id, old_path)
        .await?
        .unwrap_or_else(|| FileIdentity::new(repo_id, old_path));
    identity.rename_to(new_path);

    if let Some(cfg) = repo_cache {
        match repo_cache::ensure_cloned_and_resolve(
            cfg.base_dir.clone(),
            repo_id,
            cfg.clone_url.clone(),
            new_path.to_string(),
        )
        .await
        {
            Ok(chain) => {
                for path in chain {
                    if path != identity.canonical_path && !identity.historical_paths.contains(&path) {
                        identity.historical_paths.push(path);
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, old_path, new_path, "rename chain backfill failed, keeping the direct rename only");
            }
        }
    } else {
        debug!(old_path, new_path, "no repo cache configured, skipping rename chain backfill");
    }

    file_identities::upsert_file_identity(pool, &identity).await?;
    code_blocks::repoint_blocks_to_new_path(pool, repo_id, old_path, new_path).await?;
    Ok(())
}
