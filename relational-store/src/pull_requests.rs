use chrono::{DateTime, Utc};
use coderisk_types::{CloseReason, IssueState, PullRequest};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::Result;

fn state_str(s: IssueState) -> &'static str {
    match s {
        IssueState::Open => "open",
        IssueState::Closed => "closed",
    }
}

fn state_from_str(s: &str) -> IssueState {
    match s {
        "closed" => IssueState::Closed,
        _ => IssueState::Open,
    }
}

fn reason_str(r: CloseReason) -> &'static str {
    match r {
        CloseReason::Completed => "completed",
        CloseReason::NotPlanned => "not_planned",
        CloseReason::WontFix => "wontfix",
        CloseReason::Duplicate => "duplicate",
        CloseReason::Other => "other",
    }
}

fn reason_from_str(s: &str) -> CloseReason {
    match s {
        "completed" => CloseReason::Completed,
        "not_planned" => CloseReason::NotPlanned,
        "wontfix" => CloseReason::WontFix,
        "duplicate" => CloseReason::Duplicate,
        _ => CloseReason::Other,
    }
}

pub async fn upsert_staged_pull_request(
    tx: &mut Transaction<'_, Postgres>,
    pr: &PullRequest,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_pull_requests (
            id, repo_id, number, state, close_reason, title, body, labels,
            created_at, updated_at, closed_at, merged_at, merge_commit_sha, staged_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13, now())
        ON CONFLICT (repo_id, number) DO UPDATE SET
            state = EXCLUDED.state,
            close_reason = EXCLUDED.close_reason,
            title = EXCLUDED.title,
            body = EXCLUDED.body,
            labels = EXCLUDED.labels,
            updated_at = EXCLUDED.updated_at,
            closed_at = EXCLUDED.closed_at,
            merged_at = EXCLUDED.merged_at,
            merge_commit_sha = EXCLUDED.merge_commit_sha,
            staged_at = COALESCE(github_pull_requests.staged_at, now())
        "#,
    )
    .bind(pr.id())
    .bind(pr.repo_id)
    .bind(pr.number as i64)
    .bind(state_str(pr.state))
    .bind(pr.close_reason.map(reason_str))
    .bind(&pr.title)
    .bind(pr.body.as_deref().unwrap_or(""))
    .bind(&pr.labels)
    .bind(pr.created_at)
    .bind(pr.updated_at)
    .bind(pr.closed_at)
    .bind(pr.merged_at)
    .bind(&pr.merge_commit_sha)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn mark_graphed(pool: &PgPool, repo_id: Uuid, number: u64) -> Result<()> {
    sqlx::query(
        "UPDATE github_pull_requests SET graphed_at = now() WHERE repo_id = $1 AND number = $2",
    )
    .bind(repo_id)
    .bind(number as i64)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct PrRow {
    repo_id: Uuid,
    number: i64,
    state: String,
    close_reason: Option<String>,
    title: String,
    body: String,
    labels: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
}

impl From<PrRow> for PullRequest {
    fn from(r: PrRow) -> Self {
        PullRequest {
            repo_id: r.repo_id,
            number: r.number as u64,
            title: r.title,
            body: Some(r.body),
            state: state_from_str(&r.state),
            close_reason: r.close_reason.as_deref().map(reason_from_str),
            labels: r.labels,
            created_at: r.created_at,
            updated_at: r.updated_at,
            closed_at: r.closed_at,
            merged_at: r.merged_at,
            merge_commit_sha: r.merge_commit_sha,
            head_sha: None,
            base_branch: None,
        }
    }
}

pub async fn merged_pull_requests_pending_graph(
    pool: &PgPool,
    repo_id: Uuid,
) -> Result<Vec<PullRequest>> {
    let rows: Vec<PrRow> = sqlx::query_as(
        r#"SELECT repo_id, number, state, close_reason, title, body, labels,
                  created_at, updated_at, closed_at, merged_at, merge_commit_sha
           FROM github_pull_requests
           WHERE repo_id = $1 AND merged_at IS NOT NULL AND graphed_at IS NULL"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(PullRequest::from).collect())
}

pub async fn all_pull_requests(pool: &PgPool, repo_id: Uuid) -> Result<Vec<PullRequest>> {
    let rows: Vec<PrRow> = sqlx::query_as(
        r#"SELECT repo_id, number, state, close_reason, title, body, labels,
                  created_at, updated_at, closed_at, merged_at, merge_commit_sha
           FROM github_pull_requests WHERE repo_id = $1"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(PullRequest::from).collect())
}

pub async fn count_pull_requests(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM github_pull_requests WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
