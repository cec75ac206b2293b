//! The Atomizer: decomposes each commit's patches into `CodeBlock`/
//! `BlockChange` rows via a two-stage LLM pipeline, fuzzy entity
//! resolution, and rename-aware identity tracking.
//!
//! Force-push detection runs once at the start of every call; commits are
//! then processed strictly in `topological_index` order. A commit that
//! fails is routed to the dead-letter queue and the run stops there —
//! nothing topologically after it gets atomized this pass, so the
//! watermark never advances past a gap. The next run picks the failed
//! commit back up (immediately if it's still fresh, once its backoff
//! window has elapsed if it's been retried before) and resumes forward
//! from it.

pub mod chunk;
pub mod errors;
pub mod extract;
pub mod prefilter;
pub mod process;
pub mod rename;
pub mod report;
pub mod resolve;

pub use errors::{AtomizerError, Result};
pub use rename::RepoCacheConfig;
pub use report::AtomizeReport;

use ai_llm_service::LlmServiceProfiles;
use chrono::Utc;
use coderisk_types::dlq::{entry_id, EntityRef, FailureStage};
use relational_store::{commits, Pool};
use resilience::{dlq, force_push, topo, FailureKind};
use tracing::{info, instrument, warn};
use uuid::Uuid;

fn classify(err: &AtomizerError) -> FailureKind {
    match err {
        AtomizerError::Store(e) => resilience::classify_store_error(e),
        AtomizerError::Llm(_) => FailureKind::TransientUpstream,
        AtomizerError::RepoCache(_) => FailureKind::TransientUpstream,
        AtomizerError::Resilience(resilience::ResilienceError::Store(e)) => resilience::classify_store_error(e),
        AtomizerError::Resilience(resilience::ResilienceError::Graph(_)) => FailureKind::Fatal,
        AtomizerError::OutOfOrder(_) => FailureKind::Fatal,
    }
}

/// Atomizes every commit in `repo_id` that the Grapher has already
/// ordered but the Atomizer hasn't yet decomposed.
#[instrument(skip(pool, llm, repo_cache))]
pub async fn atomize(
    pool: &Pool,
    llm: Option<&LlmServiceProfiles>,
    repo_cache: Option<&RepoCacheConfig>,
    repo_id: Uuid,
) -> Result<AtomizeReport> {
    let force_push_detected = force_push::check_and_handle(pool, repo_id).await?;

    let pending = commits::commits_pending_atomize(pool, repo_id).await?;
    topo::assert_strictly_increasing(&pending).map_err(AtomizerError::OutOfOrder)?;

    let mut report = AtomizeReport {
        commits_considered: pending.len() as u64,
        force_push_detected,
        ..Default::default()
    };

    for commit in &pending {
        let entity = EntityRef::Commit(commit.id());
        let id = entry_id(repo_id, FailureStage::Atomizer, &entity);
        let open_entry = relational_store::dlq::get_entry(pool, id).await?;

        if let Some(entry) = &open_entry {
            if !entry.dead && Utc::now() < entry.next_attempt_at {
                info!(
                    sha = %commit.sha,
                    next_attempt_at = %entry.next_attempt_at,
                    "commit is still cooling down in the DLQ, halting this run here \
                     so no later commit gets atomized out of order",
                );
                break;
            }
        }

        match process::atomize_commit(pool, llm, repo_cache, repo_id, commit).await {
            Ok(outcome) => {
                commits::mark_atomized(pool, repo_id, &commit.sha).await?;
                if let Some(entry) = &open_entry {
                    dlq::record_outcome(pool, entry, Ok(())).await?;
                }
                report.commits_atomized += 1;
                report.blocks_created += outcome.blocks_created;
                report.blocks_modified += outcome.blocks_modified;
                report.blocks_deleted += outcome.blocks_deleted;
                report.blocks_renamed += outcome.blocks_renamed;
                report.refactor_only_changes += outcome.refactor_only_changes;
            }
            Err(err) => {
                let kind = classify(&err);
                warn!(sha = %commit.sha, error = %err, ?kind, "atomize failed for commit, routing to DLQ");
                if kind == FailureKind::Fatal {
                    return Err(err);
                }
                dlq::enqueue(pool, repo_id, FailureStage::Atomizer, entity, kind, err.to_string()).await?;
                report.dlq_entries += 1;
                // Stop here: everything after this commit is topologically
                // its descendant, and atomizing it would advance the
                // watermark past a commit that never actually landed.
                break;
            }
        }
    }

    let due_now = dlq::due(pool, repo_id).await?;
    report.dlq_retries_due = due_now.iter().filter(|e| e.stage == FailureStage::Atomizer).count() as u64;

    info!(?report, "atomizer run complete");
    Ok(report)
}
