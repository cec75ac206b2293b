use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

pub async fn start_job(pool: &PgPool, repo_id: Uuid, stage: &str) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO ingestion_jobs (id, repo_id, stage) VALUES ($1,$2,$3)")
        .bind(id)
        .bind(repo_id)
        .bind(stage)
        .execute(pool)
        .await?;
    Ok(id)
}

pub async fn finish_job(
    pool: &PgPool,
    job_id: Uuid,
    status: &str,
    summary: &serde_json::Value,
) -> Result<()> {
    sqlx::query(
        "UPDATE ingestion_jobs SET finished_at = now(), status = $2, summary = $3 WHERE id = $1",
    )
    .bind(job_id)
    .bind(status)
    .bind(summary)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn latest_job(pool: &PgPool, repo_id: Uuid, stage: &str) -> Result<Option<(Uuid, String)>> {
    let row: Option<(Uuid, String)> = sqlx::query_as(
        r#"SELECT id, status FROM ingestion_jobs
           WHERE repo_id = $1 AND stage = $2
           ORDER BY started_at DESC LIMIT 1"#,
    )
    .bind(repo_id)
    .bind(stage)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
