//! Pull-request staging: same shape as [`crate::issues`], for PRs. PRs
//! share the issue numbering space, so timeline events are fetched the
//! same way.

use chrono::{DateTime, Utc};
use coderisk_types::{CommentParentKind, EntityRef, PullRequest};
use relational_store::{pull_requests, Pool};
use scm_client::{PageCursor, ProviderClient, RepoRef};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::common::stage_sub_resources;
use crate::errors::Result;

#[derive(Debug, Default)]
pub struct PullRequestStageCounts {
    pub pull_requests: u64,
    pub comments: u64,
    pub timeline_events: u64,
    pub dlq_entries: u64,
}

#[instrument(skip(pool, provider))]
pub async fn stage_pull_requests(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    since: DateTime<Utc>,
) -> Result<PullRequestStageCounts> {
    let mut counts = PullRequestStageCounts::default();
    let mut cursor: Option<PageCursor> = None;

    loop {
        let page = match provider.list_pull_requests(repo_id, repo, cursor.clone()).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "pull request page fetch failed, stopping pagination for this run");
                break;
            }
        };

        let in_window: Vec<PullRequest> = page
            .items
            .into_iter()
            .filter(|pr| pr.created_at >= since || pr.updated_at >= since)
            .collect();

        let mut tx = pool.begin().await.map_err(relational_store::StoreError::Db)?;
        for pr in &in_window {
            pull_requests::upsert_staged_pull_request(&mut tx, pr).await?;
        }
        tx.commit().await.map_err(relational_store::StoreError::Db)?;
        counts.pull_requests += in_window.len() as u64;

        for pr in &in_window {
            let sub = stage_sub_resources(
                pool,
                provider,
                repo_id,
                repo,
                CommentParentKind::PullRequest,
                pr.number,
                || EntityRef::PullRequest(pr.id()),
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
        pull_requests = counts.pull_requests,
        comments = counts.comments,
        timeline_events = counts.timeline_events,
        dlq_entries = counts.dlq_entries,
        "pull request staging complete"
    );
    Ok(counts)
}
