use coderisk_types::{BlockKind, CodeBlock};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

fn kind_str(k: BlockKind) -> &'static str {
    match k {
        BlockKind::Function => "function",
        BlockKind::Method => "method",
        BlockKind::Type => "class",
        BlockKind::Module => "other",
    }
}

fn kind_from_str(s: &str) -> BlockKind {
    match s {
        "function" => BlockKind::Function,
        "method" => BlockKind::Method,
        "class" => BlockKind::Type,
        _ => BlockKind::Module,
    }
}

/// Upserts a block's current shape. `first_seen_sha`/`path_at_creation`
/// only apply on first insert — re-running the Atomizer over an already
/// known block must not rewrite its history.
pub async fn upsert_code_block(
    pool: &PgPool,
    block: &CodeBlock,
    language: &str,
    first_seen_sha: &str,
    path_at_creation: &str,
) -> Result<Uuid> {
    let id = block.id();
    sqlx::query(
        r#"
        INSERT INTO code_blocks (
            id, repo_id, canonical_file_path, block_name, block_type, language,
            first_seen_sha, path_at_creation, start_line, end_line, current_status
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,'active')
        ON CONFLICT (repo_id, canonical_file_path, block_name) DO UPDATE SET
            block_type = EXCLUDED.block_type,
            start_line = EXCLUDED.start_line,
            end_line = EXCLUDED.end_line,
            current_status = 'active'
        "#,
    )
    .bind(id)
    .bind(block.repo_id)
    .bind(&block.canonical_path)
    .bind(&block.name)
    .bind(kind_str(block.kind))
    .bind(language)
    .bind(first_seen_sha)
    .bind(path_at_creation)
    .bind(block.start_line as i64)
    .bind(block.end_line as i64)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn mark_deleted(pool: &PgPool, block_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE code_blocks SET current_status = 'deleted' WHERE id = $1")
        .bind(block_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Moves every block under `old_path` onto `new_path`, preserving block
/// identity as a content-addressed move rather than a delete+create — the
/// Atomizer calls this the moment it sees a file rename, right after
/// `repo-cache::resolve_rename_chain` confirms the chain.
pub async fn repoint_blocks_to_new_path(
    pool: &PgPool,
    repo_id: Uuid,
    old_path: &str,
    new_path: &str,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE code_blocks SET canonical_file_path = $3 WHERE repo_id = $1 AND canonical_file_path = $2",
    )
    .bind(repo_id)
    .bind(old_path)
    .bind(new_path)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct BlockRow {
    id: Uuid,
    repo_id: Uuid,
    canonical_file_path: String,
    block_name: String,
    block_type: String,
    start_line: i64,
    end_line: i64,
}

fn to_block(r: BlockRow, confidence: f32) -> CodeBlock {
    CodeBlock {
        repo_id: r.repo_id,
        canonical_path: r.canonical_file_path,
        name: r.block_name,
        kind: kind_from_str(&r.block_type),
        start_line: r.start_line as u32,
        end_line: r.end_line as u32,
        resolution_confidence: confidence,
    }
}

/// Candidate blocks for fuzzy entity resolution: every active block in the
/// same file, so the Atomizer can test line-range overlap against each
///.
pub async fn active_blocks_in_file(
    pool: &PgPool,
    repo_id: Uuid,
    canonical_path: &str,
) -> Result<Vec<CodeBlock>> {
    let rows: Vec<BlockRow> = sqlx::query_as(
        r#"SELECT id, repo_id, canonical_file_path, block_name, block_type, start_line, end_line
           FROM code_blocks
           WHERE repo_id = $1 AND canonical_file_path = $2 AND current_status = 'active'"#,
    )
    .bind(repo_id)
    .bind(canonical_path)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| to_block(r, 1.0)).collect())
}

pub async fn all_active_blocks(pool: &PgPool, repo_id: Uuid) -> Result<Vec<(Uuid, CodeBlock)>> {
    let rows: Vec<BlockRow> = sqlx::query_as(
        r#"SELECT id, repo_id, canonical_file_path, block_name, block_type, start_line, end_line
           FROM code_blocks WHERE repo_id = $1 AND current_status = 'active'"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| {
            let id = r.id;
            (id, to_block(r, 1.0))
        })
        .collect())
}

pub async fn count_active_blocks(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM code_blocks WHERE repo_id = $1 AND current_status = 'active'",
    )
    .bind(repo_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
