//! Coupling pass: for each other block `B` touched in the
//! same commit as block `A`, `co_change_rate = |commits touching both| /
//! |commits touching A|`. Partners are retained only when
//! `co_change_rate >= 0.5` and `co_change_count >= 3`, over a windowed
//! subset of commits (default 90 days) so the partner set stays bounded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coderisk_types::CouplingPartner;
use relational_store::{block_changes, risk, Pool};
use uuid::Uuid;

use crate::errors::Result;

const MIN_CO_CHANGE_RATE: f64 = 0.5;
const MIN_CO_CHANGE_COUNT: i64 = 3;

/// Maps each commit sha in the coupling window to the set of blocks it
/// touched (non-refactor changes only). Computed once per `index` run and
/// shared across every block's coupling pass, rather than re-querying the
/// whole window per block.
pub async fn commit_block_map(
    pool: &Pool,
    repo_id: Uuid,
    window_start: DateTime<Utc>,
) -> Result<HashMap<String, Vec<Uuid>>> {
    let changes = block_changes::non_refactor_changes_in_window(pool, repo_id, window_start).await?;
    let mut by_commit: HashMap<String, Vec<Uuid>> = HashMap::new();
    for (sha, block_id) in changes {
        by_commit.entry(sha).or_default().push(block_id);
    }
    Ok(by_commit)
}

/// Pure co-change tally: every other block sharing a commit with
/// `block_id`, and block_id's own commit count, from the shared
/// `commit_block_map`. Split out from `compute_for_block` so the
/// rate/threshold logic is testable without a database.
fn tally(block_id: Uuid, commit_block_map: &HashMap<String, Vec<Uuid>>) -> (i64, HashMap<Uuid, i64>) {
    let mut self_commit_count: i64 = 0;
    let mut partner_counts: HashMap<Uuid, i64> = HashMap::new();

    for blocks_in_commit in commit_block_map.values() {
        if !blocks_in_commit.contains(&block_id) {
            continue;
        }
        self_commit_count += 1;
        for &other in blocks_in_commit {
            if other != block_id {
                *partner_counts.entry(other).or_insert(0) += 1;
            }
        }
    }

    (self_commit_count, partner_counts)
}

/// Filters a raw co-change tally down to the partners worth keeping:
/// `co_change_rate >= 0.5` and `co_change_count >= 3`.
fn retained_partners(self_commit_count: i64, partner_counts: HashMap<Uuid, i64>) -> Vec<CouplingPartner> {
    if self_commit_count == 0 {
        return Vec::new();
    }
    partner_counts
        .into_iter()
        .filter_map(|(partner_id, count)| {
            let rate = count as f64 / self_commit_count as f64;
            (rate >= MIN_CO_CHANGE_RATE && count >= MIN_CO_CHANGE_COUNT).then_some(CouplingPartner {
                block_id: partner_id,
                co_change_count: count as u32,
                co_change_rate: rate,
            })
        })
        .collect()
}

/// Computes and persists `block_id`'s retained coupling partners from the
/// shared `commit_block_map`, pruning any previously-retained partner
/// whose window has rolled off.
pub async fn compute_for_block(
    pool: &Pool,
    repo_id: Uuid,
    block_id: Uuid,
    commit_block_map: &HashMap<String, Vec<Uuid>>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<CouplingPartner>> {
    let (self_commit_count, partner_counts) = tally(block_id, commit_block_map);
    let partners = retained_partners(self_commit_count, partner_counts);

    for partner in &partners {
        risk::upsert_coupling(
            pool,
            repo_id,
            block_id,
            partner.block_id,
            partner.co_change_count as i64,
            partner.co_change_rate,
            window_start,
            window_end,
        )
        .await?;
    }

    risk::prune_stale_coupling(pool, repo_id, block_id, window_start).await?;

    Ok(partners)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_partners_above_both_thresholds() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let mut commits = HashMap::new();
        // a+b co-change in 3/4 of a's commits: rate 0.75, count 3 -> retained.
        for _ in 0..3 {
            commits.insert(Uuid::new_v4().to_string(), vec![a, b]);
        }
        commits.insert(Uuid::new_v4().to_string(), vec![a]);
        // a+c co-change once: below the count-3 floor -> dropped.
        commits.insert(Uuid::new_v4().to_string(), vec![a, c]);

        let (self_count, partners) = tally(a, &commits);
        let retained = retained_partners(self_count, partners);

        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].block_id, b);
        assert_eq!(retained[0].co_change_count, 3);
    }

    #[test]
    fn rate_below_half_is_dropped_even_with_enough_count() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut commits = HashMap::new();
        for _ in 0..3 {
            commits.insert(Uuid::new_v4().to_string(), vec![a, b]);
        }
        // a appears in 7 commits total, only 3 with b: rate ~0.43 -> dropped.
        for _ in 0..4 {
            commits.insert(Uuid::new_v4().to_string(), vec![a]);
        }

        let (self_count, partners) = tally(a, &commits);
        let retained = retained_partners(self_count, partners);
        assert!(retained.is_empty());
    }

    #[test]
    fn block_never_touched_in_window_has_no_partners() {
        let a = Uuid::new_v4();
        let commits: HashMap<String, Vec<Uuid>> = HashMap::new();
        let (self_count, partners) = tally(a, &commits);
        assert!(retained_partners(self_count, partners).is_empty());
    }

    proptest::proptest! {
        /// `co_change_rate` is a proportion of `self_commit_count`, so no
        /// retained partner can ever exceed 1.0 or be retained below the
        /// two published floors, for any partner-count
        /// distribution a real repo could produce.
        #[test]
        fn retained_partners_always_respect_both_thresholds(
            self_commit_count in 1i64..200,
            partner_counts in proptest::collection::vec(0i64..200, 1..20),
        ) {
            let counts: HashMap<Uuid, i64> = partner_counts
                .into_iter()
                .map(|c| (Uuid::new_v4(), c.min(self_commit_count)))
                .collect();
            let retained = retained_partners(self_commit_count, counts);
            for partner in &retained {
                proptest::prop_assert!(partner.co_change_rate <= 1.0);
                proptest::prop_assert!(partner.co_change_rate >= MIN_CO_CHANGE_RATE);
                proptest::prop_assert!(partner.co_change_count as i64 >= MIN_CO_CHANGE_COUNT);
            }
        }
    }
}
