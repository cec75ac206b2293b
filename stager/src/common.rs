//! Shared per-issue/PR sub-resource staging: comments and timeline events.
//! Each sub-resource is isolated from its sibling and from the parent
//! entity's own upsert — a failure fetching one never blocks the rest
//!.

use coderisk_types::{CommentParentKind, EntityRef, FailureStage};
use relational_store::{comments, timeline, Pool};
use scm_client::{PageCursor, ProviderClient, RepoRef};
use tracing::warn;
use uuid::Uuid;

use crate::errors::{classify_scm_error, Result, StagerError};

#[derive(Debug, Default)]
pub struct SubResourceCounts {
    pub comments: u64,
    pub timeline_events: u64,
    pub dlq_entries: u64,
}

pub async fn stage_sub_resources(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    parent_kind: CommentParentKind,
    number: u64,
    entity: impl Fn() -> EntityRef,
) -> Result<SubResourceCounts> {
    let mut counts = SubResourceCounts::default();

    match stage_comments(pool, provider, repo_id, repo, parent_kind, number).await {
        Ok(n) => counts.comments += n,
        Err(StagerError::Scm(err)) => {
            warn!(number, error = %err, "comment fetch failed, routing to DLQ");
            dlq(pool, repo_id, entity(), &err).await?;
            counts.dlq_entries += 1;
        }
        Err(other) => return Err(other),
    }

    match stage_timeline(pool, provider, repo_id, repo, number).await {
        Ok(n) => counts.timeline_events += n,
        Err(StagerError::Scm(err)) => {
            warn!(number, error = %err, "timeline fetch failed, routing to DLQ");
            dlq(pool, repo_id, entity(), &err).await?;
            counts.dlq_entries += 1;
        }
        Err(other) => return Err(other),
    }

    Ok(counts)
}

async fn stage_comments(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    parent_kind: CommentParentKind,
    number: u64,
) -> Result<u64> {
    let mut staged = 0u64;
    let mut cursor: Option<PageCursor> = None;

    loop {
        let page = provider
            .list_comments(repo_id, repo, parent_kind, number, cursor.clone())
            .await?;

        let mut tx = pool.begin().await.map_err(relational_store::StoreError::Db)?;
        for comment in &page.items {
            comments::upsert_staged_comment(&mut tx, comment).await?;
        }
        tx.commit().await.map_err(relational_store::StoreError::Db)?;

        staged += page.items.len() as u64;
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(staged)
}

async fn stage_timeline(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    number: u64,
) -> Result<u64> {
    let mut staged = 0u64;
    let mut cursor: Option<PageCursor> = None;

    loop {
        let page = provider.list_timeline(repo_id, repo, number, cursor.clone()).await?;
        if page.items.is_empty() && page.next.is_none() {
            break;
        }

        let mut tx = pool.begin().await.map_err(relational_store::StoreError::Db)?;
        for event in &page.items {
            timeline::insert_timeline_event(&mut tx, event).await?;
        }
        tx.commit().await.map_err(relational_store::StoreError::Db)?;

        staged += page.items.len() as u64;
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(staged)
}

async fn dlq(pool: &Pool, repo_id: Uuid, entity: EntityRef, err: &scm_client::ScmError) -> Result<()> {
    let kind = classify_scm_error(err);
    resilience::dlq::enqueue(
        pool,
        repo_id,
        FailureStage::Stager,
        entity,
        kind,
        format!("stage_fetch_failed: {err}"),
    )
    .await?;
    Ok(())
}
