use coderisk_types::FileIdentity;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

/// Persists a rename: the file's row moves to the new canonical path and
/// every prior path (old + whatever was already archived) is kept in
/// `historical_paths`, satisfying "historical paths are never lost"
///.
pub async fn upsert_file_identity(pool: &PgPool, identity: &FileIdentity) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO file_identities (id, repo_id, canonical_path, historical_paths)
        VALUES ($1,$2,$3,$4)
        ON CONFLICT (repo_id, canonical_path) DO UPDATE SET
            historical_paths = (
                SELECT array_agg(DISTINCT p) FROM unnest(
                    file_identities.historical_paths || EXCLUDED.historical_paths
                ) AS p
            )
        "#,
    )
    .bind(identity.id())
    .bind(identity.repo_id)
    .bind(&identity.canonical_path)
    .bind(&identity.historical_paths)
    .execute(pool)
    .await?;
    Ok(())
}

/// Finds the identity currently carrying `path`, whether as its canonical
/// path or as one of its historical paths — used to resolve a patch's
/// `old_path` back to the live `FileIdentity` before applying a rename.
pub async fn find_by_any_path(
    pool: &PgPool,
    repo_id: Uuid,
    path: &str,
) -> Result<Option<FileIdentity>> {
    let row: Option<(Uuid, String, Vec<String>)> = sqlx::query_as(
        r#"SELECT repo_id, canonical_path, historical_paths FROM file_identities
           WHERE repo_id = $1 AND (canonical_path = $2 OR $2 = ANY(historical_paths))"#,
    )
    .bind(repo_id)
    .bind(path)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(repo_id, canonical_path, historical_paths)| FileIdentity {
        repo_id,
        canonical_path,
        historical_paths,
    }))
}

pub async fn all_file_identities(pool: &PgPool, repo_id: Uuid) -> Result<Vec<FileIdentity>> {
    let rows: Vec<(Uuid, String, Vec<String>)> = sqlx::query_as(
        "SELECT repo_id, canonical_path, historical_paths FROM file_identities WHERE repo_id = $1",
    )
    .bind(repo_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(repo_id, canonical_path, historical_paths)| FileIdentity {
            repo_id,
            canonical_path,
            historical_paths,
        })
        .collect())
}
