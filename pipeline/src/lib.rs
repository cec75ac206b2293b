//! Orchestrates the four ingestion stages — Stager, Grapher, Atomizer,
//! Risk Indexer — behind five idempotent entry points, each wrapped with
//! `ingestion_jobs` bookkeeping so a caller (the `coderisk` binary, a
//! cron-driven `crisk-sync`) can see what ran and how it went without
//! re-deriving it from logs.

pub mod errors;
pub mod report;
pub mod state;

pub use errors::{PipelineError, Result};
pub use report::{codebase_linking_quality_score, SyncMode, SyncReport};
pub use state::PipelineState;

use scm_client::RepoRef;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

const STAGE_STAGE: &str = "stage";
const STAGE_GRAPH: &str = "graph";
const STAGE_ATOMIZE: &str = "atomize";
const STAGE_INDEX: &str = "index";
const STAGE_SYNC: &str = "sync";

/// Pulls recent history from the provider into the staging tables.
#[instrument(skip(state))]
pub async fn stage(
    state: &PipelineState,
    repo_id: Uuid,
    repo: &RepoRef,
    window_days: i64,
) -> Result<stager::StageReport> {
    let job_id = relational_store::jobs::start_job(&state.pool, repo_id, STAGE_STAGE).await?;

    let result = stager::stage(&state.pool, &state.provider, repo_id, repo, window_days)
        .await
        .map_err(PipelineError::from);
    finish(state, job_id, &result).await?;
    result
}

/// Resolves issue/PR-to-commit links and rebuilds the entity graph.
#[instrument(skip(state))]
pub async fn graph(state: &mut PipelineState, repo_id: Uuid) -> Result<grapher::GrapherReport> {
    let job_id = relational_store::jobs::start_job(&state.pool, repo_id, STAGE_GRAPH).await?;

    let result = grapher::graph(&state.pool, &mut state.store, repo_id, state.llm.as_ref())
        .await
        .map_err(PipelineError::from);
    finish(state, job_id, &result).await?;
    result
}

/// Decomposes every newly-ordered commit into `CodeBlock`/`BlockChange`
/// rows.
#[instrument(skip(state))]
pub async fn atomize(state: &PipelineState, repo_id: Uuid) -> Result<atomizer::AtomizeReport> {
    let job_id = relational_store::jobs::start_job(&state.pool, repo_id, STAGE_ATOMIZE).await?;

    let result = atomizer::atomize(
        &state.pool,
        state.llm.as_ref(),
        state.repo_cache.as_ref(),
        repo_id,
    )
    .await
    .map_err(PipelineError::from);
    finish(state, job_id, &result).await?;
    result
}

/// Recomputes the composite risk score for every active block.
#[instrument(skip(state))]
pub async fn index(state: &mut PipelineState, repo_id: Uuid) -> Result<risk_indexer::IndexReport> {
    let job_id = relational_store::jobs::start_job(&state.pool, repo_id, STAGE_INDEX).await?;

    let result = risk_indexer::index(&state.pool, &mut state.store, repo_id)
        .await
        .map_err(PipelineError::from);
    finish(state, job_id, &result).await?;
    result
}

/// Runs the full pipeline (or just validates, per `mode`) in one call.
/// Each stage still records its own `ingestion_jobs` row; `sync` adds one
/// more row wrapping the whole thing so a single entry shows the outcome
/// of a scheduled run at a glance.
#[instrument(skip(state))]
pub async fn sync(
    state: &mut PipelineState,
    repo_id: Uuid,
    repo: &RepoRef,
    mode: SyncMode,
    window_days: i64,
) -> Result<SyncReport> {
    let job_id = relational_store::jobs::start_job(&state.pool, repo_id, STAGE_SYNC).await?;

    let outcome = run_sync(state, repo_id, repo, mode, window_days).await;
    finish(state, job_id, &outcome).await?;
    outcome
}

async fn run_sync(
    state: &mut PipelineState,
    repo_id: Uuid,
    repo: &RepoRef,
    mode: SyncMode,
    window_days: i64,
) -> Result<SyncReport> {
    if mode == SyncMode::ValidateOnly {
        let validation =
            resilience::consistency::validate(&state.store, &state.pool, repo_id).await?;
        info!(exit_code = validation.1.exit_code(), "validate-only run complete");
        return Ok(SyncReport { validation: Some(validation), ..Default::default() });
    }

    if mode == SyncMode::Full {
        relational_store::commits::clear_atomizer_watermark(&state.pool, repo_id).await?;
    }

    let stage_report = stage(state, repo_id, repo, window_days).await?;
    let mut report = SyncReport { stage: Some(stage_report), ..Default::default() };

    let graph_report = graph(state, repo_id).await?;
    report.clqs = report::codebase_linking_quality_score(&graph_report);
    report.graph = Some(graph_report);
    report.atomize = Some(atomize(state, repo_id).await?);
    report.index = Some(index(state, repo_id).await?);

    info!("sync complete");
    Ok(report)
}

async fn finish<T>(state: &PipelineState, job_id: Uuid, result: &Result<T>) -> Result<()> {
    let (status, summary) = match result {
        Ok(_) => ("succeeded", json!({})),
        Err(err) => ("failed", json!({ "error": err.to_string() })),
    };
    relational_store::jobs::finish_job(&state.pool, job_id, status, &summary).await?;
    Ok(())
}
