//! Commit staging: paginated `list_commits` honouring the `since` window,
//! upserted per page inside a single transaction. Commit
//! fetch failures are not currently isolable per-commit by the provider
//! layer, so a page that fails to fetch after `scm-client`'s own retries
//! simply stops this run's pagination — nothing was written for that
//! page, so `processed_at` is left untouched and the next `stage` run
//! picks the same commits back up.

use chrono::{DateTime, Utc};
use relational_store::{commits, Pool};
use scm_client::{PageCursor, ProviderClient, RepoRef};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::developers;
use crate::errors::Result;

#[instrument(skip(pool, provider))]
pub async fn stage_commits(
    pool: &Pool,
    provider: &ProviderClient,
    repo_id: Uuid,
    repo: &RepoRef,
    since: DateTime<Utc>,
) -> Result<u64> {
    let mut staged = 0u64;
    let mut cursor: Option<PageCursor> = None;

    loop {
        let page = match provider
            .list_commits(repo_id, repo, Some(since), cursor.clone())
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, "commit page fetch failed, stopping pagination for this run");
                break;
            }
        };

        let mut tx = pool.begin().await.map_err(relational_store::StoreError::Db)?;
        for commit in &page.items {
            commits::upsert_staged_commit(&mut tx, commit).await?;
        }
        tx.commit().await.map_err(relational_store::StoreError::Db)?;

        for commit in &page.items {
            developers::upsert_from_identity(pool, repo_id, &commit.author).await?;
            developers::upsert_from_identity(pool, repo_id, &commit.committer).await?;
        }

        staged += page.items.len() as u64;
        debug!(page_size = page.items.len(), staged, "staged commit page");

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(staged, "commit staging complete");
    Ok(staged)
}
