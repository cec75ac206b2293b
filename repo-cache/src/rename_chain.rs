//! Rename-chain resolution: given a file's current canonical path, walk
//! commit history to recover every prior path it has had, the way `git log
//! --follow` does, so `FileIdentity.historical_paths` can be filled in.

use std::path::Path;

use git2::{Diff, DiffFindOptions, Repository, Sort};
use tracing::debug;

use crate::errors::Result;

/// Walks first-parent history from `HEAD` backwards, tracking the given
/// path through renames. Returns paths oldest-first, excluding the
/// current canonical path itself.
pub fn resolve_rename_chain(repo_path: &Path, canonical_path: &str) -> Result<Vec<String>> {
    let repo = Repository::open_bare(repo_path).or_else(|_| Repository::open(repo_path))?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let mut current_path = canonical_path.to_string();
    let mut historical = Vec::new();

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true).rename_threshold(50);

    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        if commit.parent_count() == 0 {
            break;
        }
        let parent = commit.parent(0)?;

        let tree = commit.tree()?;
        let parent_tree = parent.tree()?;

        let mut diff = repo.diff_tree_to_tree(Some(&parent_tree), Some(&tree), None)?;
        diff.find_similar(Some(&mut find_opts))?;

        if let Some(old_path) = rename_source_for(&diff, &current_path) {
            if old_path != current_path && !historical.contains(&old_path) {
                debug!(from = %old_path, to = %current_path, "found rename in history");
                historical.push(old_path.clone());
                current_path = old_path;
            }
        }
    }

    historical.reverse();
    Ok(historical)
}

fn rename_source_for(diff: &Diff, new_path: &str) -> Option<String> {
    let mut found = None;
    let _ = diff.foreach(
        &mut |delta, _progress| {
            if delta.status() == git2::Delta::Renamed {
                if let Some(new_file_path) = delta.new_file().path() {
                    if new_file_path.to_string_lossy() == new_path {
                        if let Some(old_file_path) = delta.old_file().path() {
                            found = Some(old_file_path.to_string_lossy().into_owned());
                        }
                    }
                }
            }
            true
        },
        None,
        None,
        None,
    );
    found
}
