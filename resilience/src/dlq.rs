//! DLQ enqueue/requeue/drain, wiring [`crate::backoff`]'s schedule onto
//! `relational_store::dlq`'s rows.
//!
//! A DLQ row's id is deterministic on `(repo_id, stage, entity)`
//! ([`coderisk_types::dlq::entry_id`]), so [`enqueue`] always resolves to
//! the same row for the same unit of work: the first failure inserts it,
//! every failure after that escalates the existing row's attempt counter
//! through the same [`escalate`] path [`record_outcome`] uses for a
//! retried entry that fails again.

use chrono::Utc;
use coderisk_types::dlq::{DlqEntry, EntityRef, FailureStage};
use relational_store::Pool;
use uuid::Uuid;

use crate::backoff::{is_dead, next_attempt_at};
use crate::errors::{FailureKind, Result};

/// Records a failure of `entity` at `stage`. The first failure inserts a
/// fresh row (`attempt = 1`); every subsequent failure of the *same*
/// entity escalates that row instead of inserting another `attempt = 1`
/// row beside it.
pub async fn enqueue(
    pool: &Pool,
    repo_id: Uuid,
    stage: FailureStage,
    entity: EntityRef,
    failure_kind: FailureKind,
    error: impl Into<String>,
) -> Result<()> {
    let now = Utc::now();
    let error = error.into();
    let mut entry = DlqEntry::new(repo_id, stage, entity, error.clone(), now);

    match relational_store::dlq::get_entry(pool, entry.id).await? {
        None => {
            // First attempt already failed, so the first retry is due at
            // the schedule's first step, not immediately.
            entry.next_attempt_at = next_attempt_at(0, now).unwrap_or(now);
            relational_store::dlq::insert_entry(pool, &entry, failure_kind_str(failure_kind)).await?;
        }
        Some(existing) => escalate(pool, &existing, error).await?,
    }
    Ok(())
}

fn failure_kind_str(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::TransientUpstream => "transient_upstream",
        FailureKind::PermanentUpstream => "permanent_upstream",
        FailureKind::LocalInvariant => "local_invariant",
        FailureKind::Fatal => "fatal",
    }
}

/// Pulls every DLQ entry due for retry right now. Callers re-run the
/// original unit of work and then call [`record_outcome`].
pub async fn due(pool: &Pool, repo_id: Uuid) -> Result<Vec<DlqEntry>> {
    Ok(relational_store::dlq::due_entries(pool, repo_id).await?)
}

/// Applies the outcome of a retried DLQ entry: success clears it,
/// failure escalates per [`crate::backoff::DLQ_SCHEDULE_MINUTES`] or
/// marks it dead once the schedule is exhausted.
pub async fn record_outcome(
    pool: &Pool,
    entry: &DlqEntry,
    outcome: std::result::Result<(), String>,
) -> Result<()> {
    match outcome {
        Ok(()) => relational_store::dlq::mark_resolved(pool, entry.id).await?,
        Err(error) => escalate(pool, entry, error).await?,
    }
    Ok(())
}

/// Bumps `entry`'s attempt counter onto the next scheduled retry, or
/// marks it dead once [`crate::backoff::DEAD_AFTER_ATTEMPTS`] is reached.
/// A no-op if `entry` is already dead — there's no further schedule to
/// advance, and the next pipeline run will simply try the entity again
/// from scratch.
async fn escalate(pool: &Pool, entry: &DlqEntry, error: String) -> Result<()> {
    if entry.dead {
        return Ok(());
    }
    let now = Utc::now();
    let escalated = entry.retry_count + 1;
    if is_dead(escalated) {
        relational_store::dlq::mark_dead(pool, entry.id).await?;
    } else if let Some(next) = next_attempt_at(escalated, now) {
        relational_store::dlq::mark_retry(pool, entry.id, escalated as i32 + 1, next, &error).await?;
    } else {
        relational_store::dlq::mark_dead(pool, entry.id).await?;
    }
    Ok(())
}

pub async fn dead_count(pool: &Pool, repo_id: Uuid) -> Result<i64> {
    Ok(relational_store::dlq::dead_count(pool, repo_id).await?)
}

pub async fn depth(pool: &Pool, repo_id: Uuid, stage: FailureStage) -> Result<i64> {
    Ok(relational_store::dlq::depth(pool, repo_id, stage).await?)
}
