use chrono::{DateTime, Utc};
use coderisk_types::dlq::{DlqEntry, EntityRef, FailureStage};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

fn stage_from_str(s: &str) -> FailureStage {
    match s {
        "grapher" => FailureStage::Grapher,
        "atomizer" => FailureStage::Atomizer,
        "risk_indexer" => FailureStage::RiskIndexer,
        _ => FailureStage::Stager,
    }
}

/// Inserts a brand-new entry. A no-op if a row with this id (deterministic
/// on repo/stage/entity) already exists — callers are expected to check
/// [`get_entry`] first and escalate via [`mark_retry`]/[`mark_dead`]
/// instead, so this only ever fires as a defence against a race between
/// two concurrent first-failures of the same entity.
pub async fn insert_entry(pool: &PgPool, entry: &DlqEntry, failure_kind: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dlq_entries (
            id, repo_id, entity_kind, entity_ref, failure_kind, attempt,
            last_error, next_attempt_at, status, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(entry.id)
    .bind(entry.repo_id)
    .bind(entry.stage.as_str())
    .bind(serde_json::json!({ "kind": entry.entity.kind_str(), "entity": &entry.entity }))
    .bind(failure_kind)
    .bind(entry.retry_count as i32 + 1)
    .bind(serde_json::json!({ "message": entry.last_error }))
    .bind(entry.next_attempt_at)
    .bind(if entry.dead { "dead" } else { "pending" })
    .bind(entry.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Looks up a DLQ row by id, regardless of status. Callers use this to
/// decide whether a failure is an entity's first (insert fresh) or a
/// repeat (escalate the existing row).
pub async fn get_entry(pool: &PgPool, id: Uuid) -> Result<Option<DlqEntry>> {
    let row: Option<DlqRow> = sqlx::query_as(
        r#"SELECT id, repo_id, entity_kind, entity_ref, attempt, last_error, next_attempt_at, status, created_at
           FROM dlq_entries WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(DlqEntry::from))
}

pub async fn mark_retry(
    pool: &PgPool,
    id: Uuid,
    attempt: i32,
    next_attempt_at: DateTime<Utc>,
    last_error: &str,
) -> Result<()> {
    sqlx::query(
        r#"UPDATE dlq_entries SET attempt = $2, next_attempt_at = $3,
           last_error = $4, status = 'pending' WHERE id = $1"#,
    )
    .bind(id)
    .bind(attempt)
    .bind(next_attempt_at)
    .bind(serde_json::json!({ "message": last_error }))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_dead(pool: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE dlq_entries SET status = 'dead' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_resolved(pool: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE dlq_entries SET status = 'resolved' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct DlqRow {
    id: Uuid,
    repo_id: Uuid,
    entity_kind: String,
    entity_ref: serde_json::Value,
    attempt: i32,
    last_error: serde_json::Value,
    next_attempt_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl From<DlqRow> for DlqEntry {
    fn from(r: DlqRow) -> Self {
        let entity: EntityRef = serde_json::from_value(
            r.entity_ref.get("entity").cloned().unwrap_or(serde_json::Value::Null),
        )
        .unwrap_or(EntityRef::Commit(Uuid::nil()));

        DlqEntry {
            id: r.id,
            repo_id: r.repo_id,
            stage: stage_from_str(&r.entity_kind),
            entity,
            // `attempt` is 1 at the first failure; `retry_count` counts
            // prior attempts (0-based) so it lines up with what
            // `resilience::backoff` indexes its schedule by.
            retry_count: (r.attempt - 1).max(0) as u32,
            next_attempt_at: r.next_attempt_at,
            last_error: r
                .last_error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            dead: r.status == "dead",
            created_at: r.created_at,
        }
    }
}

/// Entries due for another attempt: `next_attempt_at <= now()` and not yet
/// `dead`/`resolved` — the retry-schedule read path the resilience
/// substrate's backoff loop polls on each sweep.
pub async fn due_entries(pool: &PgPool, repo_id: Uuid) -> Result<Vec<DlqEntry>> {
    let rows: Vec<DlqRow> = sqlx::query_as(
        r#"SELECT id, repo_id, entity_kind, entity_ref, attempt, last_error, next_attempt_at, status, created_at
           FROM dlq_entries
           WHERE repo_id = $1 AND status = 'pending' AND next_attempt_at <= now()"#,
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(DlqEntry::from).collect())
}

pub async fn depth(pool: &PgPool, repo_id: Uuid, stage: FailureStage) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM dlq_entries WHERE repo_id = $1 AND entity_kind = $2 AND status = 'pending'",
    )
    .bind(repo_id)
    .bind(stage.as_str())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn dead_count(pool: &PgPool, repo_id: Uuid) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT count(*) FROM dlq_entries WHERE repo_id = $1 AND status = 'dead'")
            .bind(repo_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
