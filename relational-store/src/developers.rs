use chrono::{DateTime, Utc};
use coderisk_types::Developer;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

/// Upserts a developer identity, collapsing distinct display names on the
/// same normalised email to whichever name was seen most recently and widening the `[first_active, last_active]` window.
pub async fn upsert_developer(pool: &PgPool, dev: &Developer) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO developers (id, repo_id, email, name, first_active, last_active)
        VALUES ($1,$2,$3,$4,$5,$6)
        ON CONFLICT (repo_id, email) DO UPDATE SET
            name = CASE WHEN EXCLUDED.last_active >= developers.last_active
                        THEN EXCLUDED.name ELSE developers.name END,
            first_active = LEAST(developers.first_active, EXCLUDED.first_active),
            last_active = GREATEST(developers.last_active, EXCLUDED.last_active)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(dev.repo_id)
    .bind(&dev.normalized_email)
    .bind(&dev.name)
    .bind(dev.first_active)
    .bind(dev.last_active)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct DeveloperRow {
    repo_id: Uuid,
    email: String,
    name: String,
    first_active: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl From<DeveloperRow> for Developer {
    fn from(r: DeveloperRow) -> Self {
        Developer {
            repo_id: r.repo_id,
            normalized_email: r.email,
            name: r.name,
            first_active: r.first_active,
            last_active: r.last_active,
        }
    }
}

pub async fn all_developers(pool: &PgPool, repo_id: Uuid) -> Result<Vec<Developer>> {
    let rows: Vec<DeveloperRow> = sqlx::query_as(
        "SELECT repo_id, email, name, first_active, last_active FROM developers WHERE repo_id = $1",
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Developer::from).collect())
}
