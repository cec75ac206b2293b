//! Ownership pass: per-developer familiarity (edit counts
//! restricted to non-refactor changes) and staleness (days since the most
//! recent non-refactor change). `bus_factor` is derived from the
//! familiarity map by `coderisk_types::RiskIndex::compute_bus_factor`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coderisk_types::normalize_email;
use relational_store::{block_changes, commits, Pool};
use uuid::Uuid;

use crate::errors::Result;

/// Returns `(familiarity_map, staleness_days)`. A block with only
/// refactor-only changes so far has no non-refactor history to measure
/// staleness against, so it reports zero staleness rather than an
/// unbounded value.
pub async fn compute(pool: &Pool, repo_id: Uuid, block_id: Uuid) -> Result<(HashMap<String, u32>, f64)> {
    let changes = block_changes::changes_for_block(pool, block_id).await?;
    let mut familiarity: HashMap<String, u32> = HashMap::new();
    let mut latest: Option<DateTime<Utc>> = None;

    for change in &changes {
        if change.is_refactor_only {
            continue;
        }
        let Some(commit) = commits::find_commit(pool, repo_id, &change.commit_sha).await? else {
            continue;
        };

        *familiarity
            .entry(normalize_email(&commit.author.email))
            .or_insert(0) += 1;

        if latest.is_none_or(|t| commit.committer.when > t) {
            latest = Some(commit.committer.when);
        }
    }

    let staleness_days = latest
        .map(|t| (Utc::now() - t).num_days().max(0) as f64)
        .unwrap_or(0.0);

    Ok((familiarity, staleness_days))
}
