use coderisk_types::PullRequestFile;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::Result;

pub async fn insert_pr_file(
    tx: &mut Transaction<'_, Postgres>,
    repo_id: Uuid,
    pr_number: u64,
    file: &PullRequestFile,
    status: &str,
    patch: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_pr_files (id, repo_id, pr_number, file_path, status, additions, deletions, patch)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(repo_id)
    .bind(pr_number as i64)
    .bind(&file.path)
    .bind(status)
    .bind(file.additions as i64)
    .bind(file.deletions as i64)
    .bind(patch)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn files_for_pr(
    pool: &PgPool,
    repo_id: Uuid,
    pr_number: u64,
) -> Result<Vec<(String, String, i64, i64)>> {
    let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
        r#"SELECT file_path, status, additions, deletions
           FROM github_pr_files WHERE repo_id = $1 AND pr_number = $2"#,
    )
    .bind(repo_id)
    .bind(pr_number as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
