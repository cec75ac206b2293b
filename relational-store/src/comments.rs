use chrono::{DateTime, Utc};
use coderisk_types::{Comment, CommentParentKind, CommenterRole};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::errors::Result;

fn parent_kind_str(k: CommentParentKind) -> &'static str {
    match k {
        CommentParentKind::Issue => "issue",
        CommentParentKind::PullRequest => "pull_request",
    }
}

fn parent_kind_from_str(s: &str) -> CommentParentKind {
    match s {
        "pull_request" => CommentParentKind::PullRequest,
        _ => CommentParentKind::Issue,
    }
}

fn role_str(r: CommenterRole) -> &'static str {
    match r {
        CommenterRole::Owner => "owner",
        CommenterRole::Collaborator => "collaborator",
        CommenterRole::Contributor => "contributor",
        CommenterRole::Bot => "bot",
    }
}

fn role_from_str(s: &str) -> CommenterRole {
    match s {
        "owner" => CommenterRole::Owner,
        "collaborator" => CommenterRole::Collaborator,
        "bot" => CommenterRole::Bot,
        _ => CommenterRole::Contributor,
    }
}

pub async fn upsert_staged_comment(
    tx: &mut Transaction<'_, Postgres>,
    comment: &Comment,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO github_issue_comments (
            id, repo_id, parent_kind, parent_number, author_email, author_role, body, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(comment.id())
    .bind(comment.repo_id)
    .bind(parent_kind_str(comment.parent_kind))
    .bind(comment.parent_number as i64)
    .bind(comment.author_normalized_email.as_deref().unwrap_or(""))
    .bind(role_str(comment.author_role))
    .bind(&comment.body)
    .bind(comment.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    repo_id: Uuid,
    parent_kind: String,
    parent_number: i64,
    author_email: String,
    author_role: String,
    body: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Comment {
            repo_id: r.repo_id,
            parent_kind: parent_kind_from_str(&r.parent_kind),
            parent_number: r.parent_number as u64,
            provider_comment_id: String::new(),
            author_normalized_email: Some(r.author_email),
            author_role: role_from_str(&r.author_role),
            body: r.body,
            created_at: r.created_at,
        }
    }
}

pub async fn comments_for_issue(
    pool: &PgPool,
    repo_id: Uuid,
    parent_kind: CommentParentKind,
    parent_number: u64,
) -> Result<Vec<Comment>> {
    let rows: Vec<CommentRow> = sqlx::query_as(
        r#"SELECT repo_id, parent_kind, parent_number, author_email, author_role, body, created_at
           FROM github_issue_comments
           WHERE repo_id = $1 AND parent_kind = $2 AND parent_number = $3
           ORDER BY created_at ASC"#,
    )
    .bind(repo_id)
    .bind(parent_kind_str(parent_kind))
    .bind(parent_number as i64)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Comment::from).collect())
}
