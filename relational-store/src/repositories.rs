use coderisk_types::{ProviderKind, Repository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;

fn provider_str(p: ProviderKind) -> &'static str {
    match p {
        ProviderKind::GitHub => "github",
        ProviderKind::GitLab => "gitlab",
        ProviderKind::Bitbucket => "bitbucket",
    }
}

fn provider_from_str(s: &str) -> ProviderKind {
    match s {
        "gitlab" => ProviderKind::GitLab,
        "bitbucket" => ProviderKind::Bitbucket,
        _ => ProviderKind::GitHub,
    }
}

/// Registers (or re-affirms) the tenant root row. Idempotent on
/// `(provider, owner, name)`; `repo_id` is caller-supplied (per DESIGN.md's
/// resolution of the `repo_id` open question, callers resolve it from a
/// local git remote or an explicit flag before calling in).
pub async fn upsert_repository(pool: &PgPool, repo: &Repository) -> Result<()> {
    let (owner, name) = repo
        .provider_project
        .split_once('/')
        .unwrap_or((repo.provider_project.as_str(), ""));

    sqlx::query(
        r#"
        INSERT INTO github_repositories (repo_id, provider, owner, name, default_branch, clone_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (provider, owner, name) DO UPDATE SET
            default_branch = EXCLUDED.default_branch
        "#,
    )
    .bind(repo.repo_id)
    .bind(provider_str(repo.provider))
    .bind(owner)
    .bind(name)
    .bind(&repo.default_branch)
    .bind(format!("https://{}.example/{}", provider_str(repo.provider), repo.provider_project))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_repository(pool: &PgPool, repo_id: Uuid) -> Result<Option<Repository>> {
    let row: Option<(Uuid, String, String, String, String)> = sqlx::query_as(
        "SELECT repo_id, provider, owner, name, default_branch FROM github_repositories WHERE repo_id = $1",
    )
    .bind(repo_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(repo_id, provider, owner, name, default_branch)| Repository {
        repo_id,
        provider_project: format!("{owner}/{name}"),
        provider: provider_from_str(&provider),
        default_branch,
    }))
}

pub async fn find_clone_url(pool: &PgPool, repo_id: Uuid) -> Result<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT clone_url FROM github_repositories WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(url,)| url))
}

/// The repo's last-recorded history fingerprint, `None` on first run.
pub async fn history_fingerprint(pool: &PgPool, repo_id: Uuid) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT history_fingerprint FROM github_repositories WHERE repo_id = $1")
            .bind(repo_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(fp,)| fp))
}

pub async fn set_history_fingerprint(pool: &PgPool, repo_id: Uuid, fingerprint: &str) -> Result<()> {
    sqlx::query("UPDATE github_repositories SET history_fingerprint = $2 WHERE repo_id = $1")
        .bind(repo_id)
        .bind(fingerprint)
        .execute(pool)
        .await?;
    Ok(())
}
