//! The Stager: pulls commits, issues, pull requests, comments and timeline
//! events from a provider within a trailing window and upserts them into
//! the staging tables. Idempotent and resumable — every
//! upsert is keyed by a deterministic id, so re-running `stage` for the
//! same window never duplicates rows.

pub mod commits;
pub mod common;
pub mod developers;
pub mod errors;
pub mod issues;
pub mod pull_requests;
pub mod report;

pub use errors::{StagerError, Result};
pub use report::StageReport;

use chrono::{DateTime, Duration, Utc};
use relational_store::Pool;
use scm_client::{ProviderClient, RepoRef};
use tracing::{info, instrument};
use uuid::Uuid;

/// Stages a repository's recent history. `window_days` bounds commit
/// fetch and the issue/PR `created_at`/`updated_at` filter; negative
/// values are clamped to zero (the whole window collapses to "now").
#[instrument(skip(pool, provider))]
pub async fn stage(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    window_days: i64,
) -> Result<StageReport> {
    let since: DateTime<Utc> = Utc::now() - Duration::days(window_days.max(0));

    let commits_staged = commits::stage_commits(pool, provider, repo_id, repo, since).await?;
    let issue_counts = issues::stage_issues(pool, provider, repo_id, repo, since).await?;
    let pr_counts =
        pull_requests::stage_pull_requests(pool, provider, repo_id, repo, since).await?;

    let report = StageReport {
        commits_staged,
        issues_staged: issue_counts.issues,
        pull_requests_staged: pr_counts.pull_requests,
        comments_staged: issue_counts.comments + pr_counts.comments,
        timeline_events_staged: issue_counts.timeline_events + pr_counts.timeline_events,
        dlq_entries: issue_counts.dlq_entries + pr_counts.dlq_entries,
    };

    info!(?report, "stage complete");
    Ok(report)
}
