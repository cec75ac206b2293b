//! Issue staging: paginated `list_issues`, filtered client-side to the
//! `since` window (the provider facade has no window parameter for
//! issues), then per-issue comments and timeline events.

use chrono::{DateTime, Utc};
use coderisk_types::{CommentParentKind, EntityRef, Issue};
use relational_store::{issues, Pool};
use scm_client::{PageCursor, ProviderClient, RepoRef};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::common::stage_sub_resources;
use crate::errors::Result;

#[derive(Debug, Default)]
pub struct IssueStageCounts {
    pub issues: u64,
    pub comments: u64,
    pub timeline_events: u64,
    pub dlq_entries: u64,
}

#[instrument(skip(pool, provider))]
pub async fn stage_issues(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    since: DateTime<Utc>,
) -> Result<IssueStageCounts> {
    let mut counts = IssueStageCounts::default();
    let mut cursor: Option<PageCursor> = None;

    loop {
        let page = match provider.list_issues(repo_id, repo, cursor.clone()).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "issue page fetch failed, stopping pagination for this run");
                break;
            }
        };

        let in_window: Vec<Issue> = page
            .items
            .into_iter()
            .filter(|issue| issue.created_at >= since || issue.updated_at >= since)
            .collect();

        let mut tx = pool.begin().await.map_err(relational_store::StoreError::Db)?;
        for issue in &in_window {
            issues::upsert_staged_issue(&mut tx, issue).await?;
        }
        tx.commit().await.map_err(relational_store::StoreError::Db)?;
        counts.issues += in_window.len() as u64;

        for issue in &in_window {
            let sub = stage_sub_resources(
                pool,
                provider,
                repo_id,
                repo,
                CommentParentKind::Issue,
                issue.number,
                || EntityRef::Issue(issue.id()),
            )
            .await?;
            counts.comments += sub.comments;
            counts.timeline_events += sub.timeline_events;
            counts.dlq_entries += sub.dlq_entries;
        }

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(
        issues = counts.issues,
        comments = counts.comments,
        timeline_events = counts.timeline_events,
        dlq_entries = counts.dlq_entries,
        "issue staging complete"
    );
    Ok(counts)
}
