use chrono::{DateTime, Utc};
use coderisk_types::{CloseReason, Issue, IssueState};
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

pub async fn upsert_staged_issue(tx: &mut Transaction<'_, Postgres>, issue: &Issue) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_issues (
            id, repo_id, number, state, close_reason, title, body, labels,
            created_at, updated_at, closed_at, staged_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11, now())
        ON CONFLICT (repo_id, number) DO UPDATE SET
            state = EXCLUDED.state,
            close_reason = EXCLUDED.close_reason,
            title = EXCLUDED.title,
            body = EXCLUDED.body,
            labels = EXCLUDED.labels,
            updated_at = EXCLUDED.updated_at,
            closed_at = EXCLUDED.closed_at,
            staged_at = COALESCE(github_issues.staged_at, now())
        "#,
    )
    .bind(issue.id())
    .bind(issue.repo_id)
    .bind(issue.number as i64)
    .bind(state_str(issue.state))
    .bind(issue.close_reason.map(reason_str))
    .bind(&issue.title)
    .bind(issue.body.as_deref().unwrap_or(""))
    .bind(&issue.labels)
    .bind(issue.created_at)
    .bind(issue.updated_at)
    .bind(issue.closed_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn mark_graphed(pool: &PgPool, repo_id: Uuid, number: u64) -> Result<()> {
    sqlx::query("UPDATE github_issues SET graphed_at = now() WHERE repo_id = $1 AND number = $2")
        .bind(repo_id)
        .bind(number as i64)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct IssueRow {
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
}

impl From<IssueRow> for Issue {
    fn from(r: IssueRow) -> Self {
        Issue {
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
        }
    }
}

/// Issues closed since the Grapher last ran — the population link
/// resolution iterates over (open issues produce no links by definition).
pub async fn closed_issues_pending_graph(pool: &PgPool, repo_id: Uuid) -> Result<Vec<Issue>> {
    let rows: Vec<IssueRow> = sqlx::query_as(
        r#"SELECT repo_id, number, state, close_reason, title, body, labels,
                  created_at, updated_at, closed_at
           FROM github_issues
           WHERE repo_id = $1 AND state = 'closed' AND graphed_at IS NULL"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Issue::from).collect())
}

pub async fn all_issues(pool: &PgPool, repo_id: Uuid) -> Result<Vec<Issue>> {
    let rows: Vec<IssueRow> = sqlx::query_as(
        r#"SELECT repo_id, number, state, close_reason, title, body, labels,
                  created_at, updated_at, closed_at
           FROM github_issues WHERE repo_id = $1"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Issue::from).collect())
}

pub async fn count_issues(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM github_issues WHERE repo_id = $1")
        .bind(repo_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
