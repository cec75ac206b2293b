//! Per-commit atomization: classifies paths, chunks and parses each
//! surviving patch, resolves candidates against existing blocks, and
//! writes the resulting `CodeBlock`/`BlockChange` rows.

use ai_llm_service::LlmServiceProfiles;
use coderisk_types::{ChangeType, CodeBlock, Commit};
use relational_store::{block_changes, code_blocks, Pool};
use repo_cache::RepoCache;
use uuid::Uuid;

use crate::errors::Result;
use crate::rename::RepoCacheConfig;
use crate::{chunk, extract, prefilter, rename, resolve};

/// Opens the same per-repo `.coderisk-cache` sled tree `repo-cache` uses
/// for rename-chain memoization, reused here to memoize oversized-patch
/// excerpt sampling across retries. Best-effort: a cache that fails to
/// open just means this run recomputes excerpts instead of reusing them.
fn open_cache(repo_cache: Option<&RepoCacheConfig>, repo_id: Uuid) -> Option<RepoCache> {
    let cfg = repo_cache?;
    let path = cfg.base_dir.join(repo_id.to_string()).join(".coderisk-cache");
    RepoCache::open(&path).ok()
}

#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    pub blocks_created: u64,
    pub blocks_modified: u64,
    pub blocks_deleted: u64,
    pub blocks_renamed: u64,
    pub refactor_only_changes: u64,
}

fn language_from_path(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or_default().to_lowercase().as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "dart" => "dart",
        _ => "unknown",
    }
}

/// Processes every surviving patch in one commit. Per-commit, so a
/// failure here isolates to this one commit.
pub async fn atomize_commit(
    pool: &Pool,
    llm: Option<&LlmServiceProfiles>,
    repo_cache: Option<&RepoCacheConfig>,
    repo_id: Uuid,
    commit: &Commit,
) -> Result<CommitOutcome> {
    let mut outcome = CommitOutcome::default();
    let cache = open_cache(repo_cache, repo_id);

    let paths: Vec<String> = commit.patches.iter().filter_map(|p| p.effective_path().map(String::from)).collect();
    let classifications = prefilter::classify(llm, &paths).await;

    let mut path_index = 0usize;
    for patch in &commit.patches {
        let Some(path) = patch.effective_path().map(str::to_string) else { continue };
        let is_source = classifications.get(path_index).copied().unwrap_or(false);
        path_index += 1;
        if !is_source {
            continue;
        }

        if patch.is_renamed {
            if let (Some(old), Some(new)) = (patch.old_path.as_deref(), patch.new_path.as_deref()) {
                if old != new {
                    rename::handle_rename(pool, repo_id, old, new, repo_cache).await?;
                    outcome.blocks_renamed += 1;
                }
            }
        }

        if patch.is_deleted {
            for block in code_blocks::active_blocks_in_file(pool, repo_id, &path).await? {
                let block_id = block.id();
                code_blocks::mark_deleted(pool, block_id).await?;
                block_changes::insert_block_change(pool, repo_id, block_id, &commit.sha, ChangeType::Deleted, None, false, 1.0).await?;
                outcome.blocks_deleted += 1;
            }
            continue;
        }

        let language = language_from_path(&path);
        for excerpt in chunk::cached_excerpts_for_patch(cache.as_ref(), patch) {
            let candidates = extract::extract(llm, &excerpt).await;
            if candidates.is_empty() {
                continue;
            }
            let existing = code_blocks::active_blocks_in_file(pool, repo_id, &path).await?;

            for candidate in candidates {
                let resolution = resolve::resolve(llm, &candidate, &existing).await;
                let block = CodeBlock {
                    repo_id,
                    canonical_path: path.clone(),
                    name: resolution.canonical_name,
                    kind: candidate.kind,
                    start_line: candidate.start_line,
                    end_line: candidate.end_line,
                    resolution_confidence: resolution.confidence,
                };
                let block_id = code_blocks::upsert_code_block(pool, &block, language, &commit.sha, &path).await?;

                if candidate.change_type == ChangeType::Deleted {
                    code_blocks::mark_deleted(pool, block_id).await?;
                }

                block_changes::insert_block_change(
                    pool,
                    repo_id,
                    block_id,
                    &commit.sha,
                    candidate.change_type,
                    None,
                    candidate.is_refactor_only,
                    resolution.confidence,
                )
                .await?;

                if candidate.is_refactor_only {
                    outcome.refactor_only_changes += 1;
                }
                match candidate.change_type {
                    ChangeType::Created => outcome.blocks_created += 1,
                    ChangeType::Deleted => outcome.blocks_deleted += 1,
                    ChangeType::Renamed => outcome.blocks_renamed += 1,
                    ChangeType::Modified => outcome.blocks_modified += 1,
                }
            }
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_is_inferred_from_extension() {
        assert_eq!(language_from_path("src/lib.rs"), "rust");
        assert_eq!(language_from_path("a/b/Component.tsx"), "typescript");
        assert_eq!(language_from_path("no_extension"), "unknown");
    }
}
