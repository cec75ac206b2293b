use chrono::{DateTime, Utc};
use coderisk_types::{Commit, Identity, ProcessedAt};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::Result;

/// Upserts a commit's staging row inside the caller's transaction. Re-
/// invocation never duplicates rows (`(repo_id, sha)` unique) and never
/// clobbers a later stage's watermark or `topological_index` (set by the
/// Grapher, not the Stager).
pub async fn upsert_staged_commit(
    tx: &mut Transaction<'_, Postgres>,
    commit: &Commit,
) -> Result<()> {
    let patch_json = serde_json::to_value(&commit.patches).unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO github_commits (
            id, repo_id, sha, parent_shas, author_name, author_email,
            committer_name, committer_email, authored_at, committed_at,
            message, patch, staged_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12, now())
        ON CONFLICT (repo_id, sha) DO UPDATE SET
            patch = EXCLUDED.patch,
            message = EXCLUDED.message,
            staged_at = COALESCE(github_commits.staged_at, now())
        "#,
    )
    .bind(commit.id())
    .bind(commit.repo_id)
    .bind(&commit.sha)
    .bind(&commit.parent_shas)
    .bind(&commit.author.name)
    .bind(&commit.author.email)
    .bind(&commit.committer.name)
    .bind(&commit.committer.email)
    .bind(commit.author.when)
    .bind(commit.committer.when)
    .bind(&commit.message)
    .bind(patch_json)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Assigns the commit's place in the repo's linear extension of the
/// parent-DAG. Called once, by the Grapher, in parent-before-child order.
pub async fn set_topological_index(
    pool: &PgPool,
    repo_id: Uuid,
    sha: &str,
    index: i64,
) -> Result<()> {
    sqlx::query(
        "UPDATE github_commits SET topological_index = $3 WHERE repo_id = $1 AND sha = $2",
    )
    .bind(repo_id)
    .bind(sha)
    .bind(index)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_graphed(pool: &PgPool, repo_id: Uuid, sha: &str) -> Result<()> {
    sqlx::query("UPDATE github_commits SET graphed_at = now() WHERE repo_id = $1 AND sha = $2")
        .bind(repo_id)
        .bind(sha)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_atomized(pool: &PgPool, repo_id: Uuid, sha: &str) -> Result<()> {
    sqlx::query("UPDATE github_commits SET atomized_at = now() WHERE repo_id = $1 AND sha = $2")
        .bind(repo_id)
        .bind(sha)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_indexed(pool: &PgPool, repo_id: Uuid, sha: &str) -> Result<()> {
    sqlx::query("UPDATE github_commits SET indexed_at = now() WHERE repo_id = $1 AND sha = $2")
        .bind(repo_id)
        .bind(sha)
        .execute(pool)
        .await?;
    Ok(())
}

/// Clears the atomizer watermark for every commit in the repo. Used by the
/// force-push detector to force a full re-atomize.
pub async fn clear_atomizer_watermark(pool: &PgPool, repo_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE github_commits SET atomized_at = NULL WHERE repo_id = $1")
        .bind(repo_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct CommitRow {
    repo_id: Uuid,
    sha: String,
    parent_shas: Vec<String>,
    author_name: String,
    author_email: String,
    committer_name: String,
    committer_email: String,
    authored_at: DateTime<Utc>,
    committed_at: DateTime<Utc>,
    message: String,
    topological_index: Option<i64>,
    patch: serde_json::Value,
    staged_at: Option<DateTime<Utc>>,
    graphed_at: Option<DateTime<Utc>>,
    atomized_at: Option<DateTime<Utc>>,
    indexed_at: Option<DateTime<Utc>>,
}

impl From<CommitRow> for Commit {
    fn from(r: CommitRow) -> Self {
        Commit {
            repo_id: r.repo_id,
            sha: r.sha,
            author: Identity {
                name: r.author_name,
                email: r.author_email,
                when: r.authored_at,
            },
            committer: Identity {
                name: r.committer_name,
                email: r.committer_email,
                when: r.committed_at,
            },
            parent_shas: r.parent_shas,
            topological_index: r.topological_index.unwrap_or_default(),
            patches: serde_json::from_value(r.patch).unwrap_or_default(),
            message: r.message,
            processed_at: ProcessedAt {
                staged_at: r.staged_at,
                graphed_at: r.graphed_at,
                atomized_at: r.atomized_at,
                indexed_at: r.indexed_at,
            },
        }
    }
}

/// Commits the Grapher hasn't yet projected, oldest-parent-first once
/// `topological_index` has been assigned (NULLS LAST keeps freshly-staged,
/// not-yet-ordered commits out of the way).
pub async fn commits_pending_graph(pool: &PgPool, repo_id: Uuid) -> Result<Vec<Commit>> {
    let rows: Vec<CommitRow> = sqlx::query_as(
        r#"SELECT * FROM github_commits
           WHERE repo_id = $1 AND graphed_at IS NULL
           ORDER BY topological_index NULLS LAST"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Commit::from).collect())
}

/// Commits the Atomizer hasn't yet decomposed, strictly in
/// `topological_index` order — this ordering is non-negotiable.
pub async fn commits_pending_atomize(pool: &PgPool, repo_id: Uuid) -> Result<Vec<Commit>> {
    let rows: Vec<CommitRow> = sqlx::query_as(
        r#"SELECT * FROM github_commits
           WHERE repo_id = $1 AND atomized_at IS NULL AND topological_index IS NOT NULL
           ORDER BY topological_index ASC"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Commit::from).collect())
}

/// Every commit in topological order, used by the force-push fingerprint
/// and by `sync --mode full` rebuilds.
pub async fn all_commits_topo_order(pool: &PgPool, repo_id: Uuid) -> Result<Vec<Commit>> {
    let rows: Vec<CommitRow> = sqlx::query_as(
        r#"SELECT * FROM github_commits WHERE repo_id = $1 ORDER BY topological_index ASC NULLS LAST"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Commit::from).collect())
}

pub async fn find_commit(pool: &PgPool, repo_id: Uuid, sha: &str) -> Result<Option<Commit>> {
    let row: Option<CommitRow> =
        sqlx::query_as("SELECT * FROM github_commits WHERE repo_id = $1 AND sha = $2")
            .bind(repo_id)
            .bind(sha)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Commit::from))
}

pub async fn count_commits(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM github_commits WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
