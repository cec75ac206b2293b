use chrono::{DateTime, Utc};
use coderisk_types::RiskIndex;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

pub async fn upsert_incident(
    pool: &PgPool,
    repo_id: Uuid,
    block_id: Uuid,
    issue_number: u64,
    link_confidence: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO code_block_incidents (id, repo_id, block_id, issue_number, link_confidence)
        VALUES ($1,$2,$3,$4,$5)
        ON CONFLICT (block_id, issue_number) DO UPDATE SET link_confidence = EXCLUDED.link_confidence
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(repo_id)
    .bind(block_id)
    .bind(issue_number as i64)
    .bind(link_confidence)
    .execute(pool)
    .await?;
    Ok(())
}

/// Weighted incident count: `sum(link.confidence)` over every distinct
/// closed-as-completed issue linked to a commit that touched this block
///.
pub async fn weighted_incident_count(pool: &PgPool, block_id: Uuid) -> Result<f64> {
    let (sum,): (Option<f64>,) =
        sqlx::query_as("SELECT sum(link_confidence) FROM code_block_incidents WHERE block_id = $1")
            .bind(block_id)
            .fetch_one(pool)
            .await?;
    Ok(sum.unwrap_or(0.0))
}

pub async fn upsert_coupling(
    pool: &PgPool,
    repo_id: Uuid,
    block_id: Uuid,
    partner_block_id: Uuid,
    co_change_count: i64,
    co_change_rate: f64,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO code_block_coupling (
            id, repo_id, block_id, partner_block_id, co_change_count, co_change_rate, window_start, window_end
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (block_id, partner_block_id) DO UPDATE SET
            co_change_count = EXCLUDED.co_change_count,
            co_change_rate = EXCLUDED.co_change_rate,
            window_start = EXCLUDED.window_start,
            window_end = EXCLUDED.window_end
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(repo_id)
    .bind(block_id)
    .bind(partner_block_id)
    .bind(co_change_count)
    .bind(co_change_rate)
    .bind(window_start)
    .bind(window_end)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes coupling rows whose window has rolled off, so a block's partner
/// list in `code_block_coupling` always reflects only the current window
/// (default 90 days).
pub async fn prune_stale_coupling(pool: &PgPool, repo_id: Uuid, block_id: Uuid, window_start: DateTime<Utc>) -> Result<()> {
    sqlx::query("DELETE FROM code_block_coupling WHERE repo_id = $1 AND block_id = $2 AND window_end < $3")
        .bind(repo_id)
        .bind(block_id)
        .bind(window_start)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn coupling_partners(pool: &PgPool, block_id: Uuid) -> Result<Vec<(Uuid, i64, f64)>> {
    let rows: Vec<(Uuid, i64, f64)> = sqlx::query_as(
        "SELECT partner_block_id, co_change_count, co_change_rate FROM code_block_coupling WHERE block_id = $1",
    )
    .bind(block_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn upsert_risk_score(pool: &PgPool, repo_id: Uuid, index: &RiskIndex) -> Result<()> {
    let familiarity = serde_json::to_value(&index.familiarity_map).unwrap_or_default();

    sqlx::query(
        r#"
        INSERT INTO risk_scores (
            id, repo_id, block_id, incident_count, staleness_days, familiarity_map,
            bus_factor, risk_score, computed_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        ON CONFLICT (block_id) DO UPDATE SET
            incident_count = EXCLUDED.incident_count,
            staleness_days = EXCLUDED.staleness_days,
            familiarity_map = EXCLUDED.familiarity_map,
            bus_factor = EXCLUDED.bus_factor,
            risk_score = EXCLUDED.risk_score,
            computed_at = EXCLUDED.computed_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(repo_id)
    .bind(index.block_id)
    .bind(index.incident_count)
    .bind(index.staleness_days)
    .bind(familiarity)
    .bind(index.bus_factor as i64)
    .bind(index.risk_score)
    .bind(index.computed_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_risk_scores(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM risk_scores WHERE repo_id = $1")
        .bind(repo_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}
