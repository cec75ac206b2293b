use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

/// An issue-to-commit or issue-to-PR link as the Grapher resolves it:
/// primitive SCM identifiers (issue number, PR number or commit sha)
/// rather than internal UUIDs, matching `github_issue_pr_links`'s own key
/// shape.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub repo_id: Uuid,
    pub issue_number: u64,
    pub pr_number: Option<u64>,
    pub commit_sha: Option<String>,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// Upserts a link, combining evidence tags and taking the max confidence
/// seen so far — preserves the "confidence is monotone non-decreasing as
/// evidence is added" invariant across repeated resolution
/// passes.
pub async fn upsert_link(pool: &PgPool, link: &LinkRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_issue_pr_links (id, repo_id, issue_number, pr_number, commit_sha, evidence, confidence)
        VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (repo_id, issue_number, pr_number) WHERE pr_number IS NOT NULL
        DO UPDATE SET
            evidence = (SELECT array_agg(DISTINCT e) FROM unnest(
                github_issue_pr_links.evidence || EXCLUDED.evidence) AS e),
            confidence = GREATEST(github_issue_pr_links.confidence, EXCLUDED.confidence),
            updated_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(link.repo_id)
    .bind(link.issue_number as i64)
    .bind(link.pr_number.map(|n| n as i64))
    .bind(&link.commit_sha)
    .bind(&link.evidence)
    .bind(link.confidence)
    .execute(pool)
    .await?;

    if link.pr_number.is_none() {
        // Commit-keyed links have their own partial unique index; the
        // query above's ON CONFLICT target only covers the pr_number path,
        // so retry against the commit-keyed one on a duplicate.
        sqlx::query(
            r#"
            INSERT INTO github_issue_pr_links (id, repo_id, issue_number, pr_number, commit_sha, evidence, confidence)
            VALUES ($1,$2,$3,NULL,$4,$5,$6)
            ON CONFLICT (repo_id, issue_number, commit_sha) WHERE commit_sha IS NOT NULL
            DO UPDATE SET
                evidence = (SELECT array_agg(DISTINCT e) FROM unnest(
                    github_issue_pr_links.evidence || EXCLUDED.evidence) AS e),
                confidence = GREATEST(github_issue_pr_links.confidence, EXCLUDED.confidence),
                updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(link.repo_id)
        .bind(link.issue_number as i64)
        .bind(&link.commit_sha)
        .bind(&link.evidence)
        .bind(link.confidence)
        .execute(pool)
        .await?;
    }

    Ok(())
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    repo_id: Uuid,
    issue_number: i64,
    pr_number: Option<i64>,
    commit_sha: Option<String>,
    evidence: Vec<String>,
    confidence: f64,
}

impl From<LinkRow> for LinkRecord {
    fn from(r: LinkRow) -> Self {
        LinkRecord {
            repo_id: r.repo_id,
            issue_number: r.issue_number as u64,
            pr_number: r.pr_number.map(|n| n as u64),
            commit_sha: r.commit_sha,
            evidence: r.evidence,
            confidence: r.confidence,
        }
    }
}

pub async fn links_for_repo(pool: &PgPool, repo_id: Uuid) -> Result<Vec<LinkRecord>> {
    let rows: Vec<LinkRow> = sqlx::query_as(
        "SELECT * FROM github_issue_pr_links WHERE repo_id = $1",
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(LinkRecord::from).collect())
}

/// Records an issue that every pattern declined to link — the orphan side
/// of the `open -> closed -> (linked | orphan)` state machine.
pub async fn record_orphan(pool: &PgPool, repo_id: Uuid, issue_number: u64, reason: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_issue_no_links (id, repo_id, issue_number, reason)
        VALUES ($1,$2,$3,$4)
        ON CONFLICT (repo_id, issue_number) DO UPDATE SET reason = EXCLUDED.reason, recorded_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(repo_id)
    .bind(issue_number as i64)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}

/// Clears a prior orphan record for an issue that a later pass did manage
/// to link — an issue should never be both orphaned and linked at once.
pub async fn clear_orphan(pool: &PgPool, repo_id: Uuid, issue_number: u64) -> Result<()> {
    sqlx::query("DELETE FROM github_issue_no_links WHERE repo_id = $1 AND issue_number = $2")
        .bind(repo_id)
        .bind(issue_number as i64)
        .execute(pool)
        .await?;
    Ok(())
}

/// Every closed-as-completed issue linked (directly, or via a PR whose
/// merge commit is `sha`) to the commit `sha`, with the link's confidence —
/// the Risk Indexer's incident pass reads this per `BlockChange` to find
/// which blocks a commit's incidents should count against.
pub async fn incidents_for_commit(
    pool: &PgPool,
    repo_id: Uuid,
    sha: &str,
) -> Result<Vec<(u64, f64)>> {
    let rows: Vec<(i64, f64)> = sqlx::query_as(
        r#"
        SELECT l.issue_number, l.confidence
        FROM github_issue_pr_links l
        JOIN github_issues i ON i.repo_id = l.repo_id AND i.number = l.issue_number
        WHERE l.repo_id = $1
          AND i.state = 'closed' AND i.close_reason = 'completed'
          AND (
                l.commit_sha = $2
             OR l.pr_number IN (
                    SELECT number FROM github_pull_requests
                    WHERE repo_id = $1 AND merge_commit_sha = $2
                )
          )
        "#,
    )
    .bind(repo_id)
    .bind(sha)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(n, c)| (n as u64, c)).collect())
}

pub async fn count_links(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM github_issue_pr_links WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

pub async fn count_orphans(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM github_issue_no_links WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
