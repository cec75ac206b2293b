//! Provider facade without async-trait or dynamic trait objects.
//!
//! `ProviderClient` wraps one concrete implementation per Git provider and
//! forwards every ingestion call to it. Adding a fourth provider means
//! adding one more enum arm here, not touching call sites.

pub mod types;
pub use types::*;

pub mod bitbucket;
pub mod github;
pub mod gitlab;

use chrono::{DateTime, Utc};
use coderisk_types::{Comment, CommentParentKind, Commit, Issue, PullRequest, TimelineEvent};
use tracing::debug;

use crate::errors::ScmResult;
use crate::pagination::{Page, PageCursor};

/// Runtime configuration for any provider client, injected from
/// environment or higher-level application settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_api: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub enum ProviderClient {
    GitLab(gitlab::GitLabClient),
    GitHub(github::GitHubClient),
    Bitbucket(bitbucket::BitbucketClient),
}

impl ProviderClient {
    pub fn from_config(cfg: ProviderConfig) -> ScmResult<Self> {
        debug!(kind = ?cfg.kind, base_api = %cfg.base_api, "initializing provider client");

        let client = reqwest::Client::builder()
            .user_agent("coderisk-scm-client/0.1")
            .build()?;

        Ok(match cfg.kind {
            ProviderKind::GitLab => {
                ProviderClient::GitLab(gitlab::GitLabClient::new(client, cfg.base_api, cfg.token))
            }
            ProviderKind::GitHub => {
                ProviderClient::GitHub(github::GitHubClient::new(client, cfg.base_api, cfg.token))
            }
            ProviderKind::Bitbucket => ProviderClient::Bitbucket(bitbucket::BitbucketClient::new(
                client,
                cfg.base_api,
                cfg.token,
            )),
        })
    }

    /// Lists commits reachable from the default branch, with parsed
    /// per-file patches, optionally bounded to `since`.
    pub async fn list_commits(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Commit>> {
        match self {
            Self::GitLab(c) => c.list_commits(repo_id, repo, since, cursor).await,
            Self::GitHub(c) => c.list_commits(repo_id, repo, since, cursor).await,
            Self::Bitbucket(c) => c.list_commits(repo_id, repo, since, cursor).await,
        }
    }

    pub async fn list_issues(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Issue>> {
        match self {
            Self::GitLab(c) => c.list_issues(repo_id, repo, cursor).await,
            Self::GitHub(c) => c.list_issues(repo_id, repo, cursor).await,
            Self::Bitbucket(c) => c.list_issues(repo_id, repo, cursor).await,
        }
    }

    pub async fn list_pull_requests(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<PullRequest>> {
        match self {
            Self::GitLab(c) => c.list_pull_requests(repo_id, repo, cursor).await,
            Self::GitHub(c) => c.list_pull_requests(repo_id, repo, cursor).await,
            Self::Bitbucket(c) => c.list_pull_requests(repo_id, repo, cursor).await,
        }
    }

    pub async fn list_comments(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        parent_kind: CommentParentKind,
        parent_number: u64,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Comment>> {
        match self {
            Self::GitLab(c) => {
                c.list_comments(repo_id, repo, parent_kind, parent_number, cursor)
                    .await
            }
            Self::GitHub(c) => {
                c.list_comments(repo_id, repo, parent_kind, parent_number, cursor)
                    .await
            }
            Self::Bitbucket(c) => {
                c.list_comments(repo_id, repo, parent_kind, parent_number, cursor)
                    .await
            }
        }
    }

    pub async fn get_file_raw(
        &self,
        repo: &RepoRef,
        repo_relative_path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<Vec<u8>>> {
        match self {
            Self::GitLab(c) => c.get_file_raw(repo, repo_relative_path, git_ref).await,
            Self::GitHub(c) => c.get_file_raw(repo, repo_relative_path, git_ref).await,
            Self::Bitbucket(c) => c.get_file_raw(repo, repo_relative_path, git_ref).await,
        }
    }

    /// Lists an issue or PR's timeline events. GitLab and Bitbucket expose no equivalent endpoint; both
    /// return an empty page rather than erroring, so the Stager can call
    /// this uniformly across providers.
    pub async fn list_timeline(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        issue_number: u64,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<TimelineEvent>> {
        match self {
            Self::GitHub(c) => c.list_timeline(repo_id, repo, issue_number, cursor).await,
            Self::GitLab(c) => c.list_timeline(repo_id, repo, issue_number, cursor).await,
            Self::Bitbucket(c) => c.list_timeline(repo_id, repo, issue_number, cursor).await,
        }
    }
}
