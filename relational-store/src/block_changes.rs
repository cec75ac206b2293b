use coderisk_types::ChangeType;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

fn change_type_str(c: ChangeType) -> &'static str {
    match c {
        ChangeType::Created => "created",
        ChangeType::Modified => "modified",
        ChangeType::Deleted => "deleted",
        ChangeType::Renamed => "renamed",
    }
}

fn change_type_from_str(s: &str) -> ChangeType {
    match s {
        "created" => ChangeType::Created,
        "deleted" => ChangeType::Deleted,
        "renamed" => ChangeType::Renamed,
        _ => ChangeType::Modified,
    }
}

/// Appends one transaction-log row. `(block_id, commit_sha)`-unique: a
/// re-run of the Atomizer over an already-processed commit is a no-op, not
/// a duplicate entry.
#[allow(clippy::too_many_arguments)]
pub async fn insert_block_change(
    pool: &PgPool,
    repo_id: Uuid,
    block_id: Uuid,
    commit_sha: &str,
    change_type: ChangeType,
    raw_llm_output: Option<&serde_json::Value>,
    is_refactor_only: bool,
    resolution_confidence: f32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO code_block_changes (
            id, repo_id, block_id, commit_sha, change_type, raw_llm_output,
            is_refactor_only, resolution_confidence
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (block_id, commit_sha) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(repo_id)
    .bind(block_id)
    .bind(commit_sha)
    .bind(change_type_str(change_type))
    .bind(raw_llm_output)
    .bind(is_refactor_only)
    .bind(resolution_confidence)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct BlockChangeRow {
    pub block_id: Uuid,
    pub commit_sha: String,
    pub change_type: String,
    pub is_refactor_only: bool,
    pub resolution_confidence: f64,
}

impl BlockChangeRow {
    pub fn change_type(&self) -> ChangeType {
        change_type_from_str(&self.change_type)
    }
}

/// A block's full change history, ordered by the owning commit's
/// `topological_index` — "ordering by the commit's topological_index gives
/// the block's true lifetime".
pub async fn changes_for_block(pool: &PgPool, block_id: Uuid) -> Result<Vec<BlockChangeRow>> {
    let rows: Vec<BlockChangeRow> = sqlx::query_as(
        r#"
        SELECT cbc.block_id, cbc.commit_sha, cbc.change_type, cbc.is_refactor_only, cbc.resolution_confidence
        FROM code_block_changes cbc
        JOIN github_commits c ON c.repo_id = cbc.repo_id AND c.sha = cbc.commit_sha
        WHERE cbc.block_id = $1
        ORDER BY c.topological_index ASC
        "#,
    )
    .bind(block_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every non-refactor change within the coupling window, used by the Risk
/// Indexer's coupling pass to find co-changed block pairs.
pub async fn non_refactor_changes_in_window(
    pool: &PgPool,
    repo_id: Uuid,
    window_start: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<(String, Uuid)>> {
    let rows: Vec<(String, Uuid)> = sqlx::query_as(
        r#"
        SELECT cbc.commit_sha, cbc.block_id
        FROM code_block_changes cbc
        JOIN github_commits c ON c.repo_id = cbc.repo_id AND c.sha = cbc.commit_sha
        WHERE cbc.repo_id = $1 AND cbc.is_refactor_only = false AND c.committed_at >= $2
        "#,
    )
    .bind(repo_id)
    .bind(window_start)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn count_block_changes(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM code_block_changes WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
