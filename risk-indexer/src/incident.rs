//! Incident pass: `incident_count` is the sum of confidence
//! across every distinct closed-as-completed issue linked, by any pattern,
//! to a commit that touched this block.

use std::collections::HashMap;

use relational_store::{block_changes, links, risk, Pool};
use uuid::Uuid;

use crate::errors::Result;

/// Computes and persists a block's weighted incident count. A block's
/// change history can surface the same issue more than once (multiple
/// commits fixing the same bug); the highest confidence seen for a given
/// issue number wins, matching the link invariant that confidence is
/// monotone non-decreasing as evidence accumulates.
pub async fn compute(pool: &Pool, repo_id: Uuid, block_id: Uuid) -> Result<(f64, u64)> {
    let changes = block_changes::changes_for_block(pool, block_id).await?;
    let mut best: HashMap<u64, f64> = HashMap::new();

    for change in &changes {
        for (issue_number, confidence) in
            links::incidents_for_commit(pool, repo_id, &change.commit_sha).await?
        {
            let entry = best.entry(issue_number).or_insert(0.0);
            if confidence > *entry {
                *entry = confidence;
            }
        }
    }

    for (issue_number, confidence) in &best {
        risk::upsert_incident(pool, repo_id, block_id, *issue_number, *confidence).await?;
    }

    let total = risk::weighted_incident_count(pool, block_id).await?;
    Ok((total, best.len() as u64))
}
