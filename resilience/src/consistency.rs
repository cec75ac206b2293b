//! `crisk-sync --mode validate-only`'s exit-code contract around
//! `graph_store::consistency::check`: 0 clean, 1 drift within
//! tolerance... actually drift is binary per entity class, so this crate
//! maps "any class inconsistent" onto the three-way contract by the
//! fraction of classes affected, giving operators a severity signal
//! instead of a flat pass/fail. A repo with any `dead` DLQ entry fails
//! outright regardless of drift — a dead entry means some commit, issue,
//! or PR never made it into the graph at all.

use graph_store::consistency::{check, ConsistencyReport};
use graph_store::GraphStore;
use relational_store::Pool;
use uuid::Uuid;

use crate::errors::Result;

/// Fraction of entity-class checks allowed to disagree before a
/// `validate-only` run is considered a hard failure rather than a
/// worth-watching drift.
const DRIFT_FAILURE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationExit {
    /// 0: everything matches.
    Clean,
    /// 1: some drift, but under the failure threshold — a rebuild is
    /// advisable, not urgent.
    Drifted,
    /// 2: drift over the failure threshold — the graph projection is
    /// unreliable and should be rebuilt before anything reads from it.
    Failed,
}

impl ValidationExit {
    pub fn exit_code(self) -> i32 {
        match self {
            ValidationExit::Clean => 0,
            ValidationExit::Drifted => 1,
            ValidationExit::Failed => 2,
        }
    }
}

pub async fn validate(store: &GraphStore, pool: &Pool, repo_id: Uuid) -> Result<(ConsistencyReport, ValidationExit)> {
    let report = check(store, pool, repo_id).await?;
    let inconsistent = report.checks.iter().filter(|c| !c.is_consistent()).count();
    let dead_entries = crate::dlq::dead_count(pool, repo_id).await?;

    let exit = if dead_entries > 0 {
        ValidationExit::Failed
    } else if inconsistent == 0 {
        ValidationExit::Clean
    } else {
        let fraction = inconsistent as f64 / report.checks.len().max(1) as f64;
        if fraction > DRIFT_FAILURE_THRESHOLD {
            ValidationExit::Failed
        } else {
            ValidationExit::Drifted
        }
    };

    Ok((report, exit))
}
