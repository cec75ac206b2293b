use chrono::{DateTime, Utc};
use coderisk_types::TimelineEvent;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::Result;

pub async fn insert_timeline_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &TimelineEvent,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_issue_timeline (id, repo_id, issue_number, event_type, actor_email, created_at, payload)
        VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(event.id())
    .bind(event.repo_id)
    .bind(event.issue_number as i64)
    .bind(&event.event_type)
    .bind(event.actor_email.as_deref())
    .bind(event.created_at)
    .bind(&event.payload)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct TimelineRow {
    repo_id: Uuid,
    issue_number: i64,
    event_type: String,
    actor_email: Option<String>,
    created_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl From<TimelineRow> for TimelineEvent {
    fn from(r: TimelineRow) -> Self {
        TimelineEvent {
            repo_id: r.repo_id,
            issue_number: r.issue_number as u64,
            event_type: r.event_type,
            actor_email: r.actor_email,
            created_at: r.created_at,
            payload: r.payload,
        }
    }
}

pub async fn timeline_for_issue(
    pool: &PgPool,
    repo_id: Uuid,
    issue_number: u64,
) -> Result<Vec<TimelineEvent>> {
    let rows: Vec<TimelineRow> = sqlx::query_as(
        r#"SELECT repo_id, issue_number, event_type, actor_email, created_at, payload
           FROM github_issue_timeline
           WHERE repo_id = $1 AND issue_number = $2
           ORDER BY created_at ASC"#,
    )
    .bind(repo_id)
    .bind(issue_number as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TimelineEvent::from).collect())
}
