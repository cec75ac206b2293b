//! GitLab provider (REST v4) for commit history, issues, MRs and notes.
//!
//! Endpoints used:
//!   * GET /projects/:id/repository/commits?with_stats=true
//!   * GET /projects/:id/repository/commits/:sha/diff
//!   * GET /projects/:id/issues
//!   * GET /projects/:id/merge_requests
//!   * GET /projects/:id/issues/:iid/notes
//!   * GET /projects/:id/merge_requests/:iid/notes
//!   * GET /projects/:id/repository/files/:path/raw?ref=:ref

use chrono::{DateTime, Utc};
use coderisk_types::{
    Comment, CommentParentKind, CommenterRole, Commit, FilePatch, Identity, Issue, IssueState,
    PullRequest,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ScmResult;
use crate::git_providers::types::{RepoRef, DEFAULT_PAGE_SIZE};
use crate::pagination::{parse_retry_after, Page, PageCursor};
use crate::parser::{looks_like_binary_patch, parse_unified_diff};
use crate::retry::with_backoff;

#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String,
    token: String,
}

impl GitLabClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        debug!(base_api = %base_api, "creating GitLabClient");
        Self {
            http,
            base_api,
            token,
        }
    }

    fn project_path(&self, repo: &RepoRef) -> String {
        urlencoding::encode(&repo.project).into_owned()
    }

    async fn get_page<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> ScmResult<(Vec<T>, Option<PageCursor>)> {
        with_backoff("gitlab:get_page", || async {
            let resp = self
                .http
                .get(url)
                .header("PRIVATE-TOKEN", &self.token)
                .send()
                .await?;

            if resp.status().as_u16() == 429 {
                let retry_after = parse_retry_after(
                    resp.headers().get("retry-after").and_then(|v| v.to_str().ok()),
                );
                return Err(crate::errors::ScmError::Provider(
                    crate::errors::ScmProviderError::RateLimited {
                        retry_after_secs: retry_after,
                    },
                ));
            }

            let next_page = resp
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .filter(|s| !s.is_empty())
                .map(|p| PageCursor(p.to_string()));

            let resp = resp.error_for_status()?;
            let items: Vec<T> = resp.json().await?;
            Ok((items, next_page))
        })
        .await
    }

    fn paged_url(&self, base: &str, cursor: &Option<PageCursor>) -> String {
        let page = cursor.as_ref().map(|c| c.0.as_str()).unwrap_or("1");
        format!("{}&per_page={}&page={}", base, DEFAULT_PAGE_SIZE, page)
    }

    pub async fn list_commits(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Commit>> {
        let base = format!(
            "{}/projects/{}/repository/commits?with_stats=false",
            self.base_api,
            self.project_path(repo)
        );
        let mut url = self.paged_url(&base, &cursor);
        if let Some(since) = since {
            url.push_str(&format!("&since={}", since.to_rfc3339()));
        }

        debug!(url = %url, "GitLab list_commits");
        let (raw, next): (Vec<GitLabCommit>, _) = self.get_page(&url).await?;

        let mut items = Vec::with_capacity(raw.len());
        for c in raw {
            let patches = self.get_commit_diff(repo, &c.id).await?;
            items.push(commit_to_coderisk(repo_id, c, patches));
        }

        Ok(Page { items, next })
    }

    async fn get_commit_diff(&self, repo: &RepoRef, sha: &str) -> ScmResult<Vec<FilePatch>> {
        let url = format!(
            "{}/projects/{}/repository/commits/{}/diff",
            self.base_api,
            self.project_path(repo),
            sha
        );
        let diffs: Vec<GitLabDiff> = with_backoff("gitlab:get_commit_diff", || async {
            let resp: Vec<GitLabDiff> = self
                .http
                .get(&url)
                .header("PRIVATE-TOKEN", &self.token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(resp)
        })
        .await?;

        Ok(diffs
            .into_iter()
            .map(|d| {
                let is_binary = d.diff.is_none()
                    || looks_like_binary_patch(d.diff.as_deref().unwrap_or_default());
                let hunks = match &d.diff {
                    Some(text) if !is_binary => parse_unified_diff(text),
                    _ => Vec::new(),
                };

                FilePatch {
                    old_path: Some(d.old_path),
                    new_path: Some(d.new_path),
                    is_new: d.new_file,
                    is_deleted: d.deleted_file,
                    is_renamed: d.renamed_file,
                    is_binary,
                    hunks,
                    raw_unidiff: d.diff,
                }
            })
            .collect())
    }

    pub async fn list_issues(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Issue>> {
        let base = format!("{}/projects/{}/issues?scope=all", self.base_api, self.project_path(repo));
        let url = self.paged_url(&base, &cursor);

        debug!(url = %url, "GitLab list_issues");
        let (raw, next): (Vec<GitLabIssue>, _) = self.get_page(&url).await?;
        let items = raw.into_iter().map(|i| issue_to_coderisk(repo_id, i)).collect();

        Ok(Page { items, next })
    }

    pub async fn list_pull_requests(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<PullRequest>> {
        let base = format!(
            "{}/projects/{}/merge_requests?scope=all",
            self.base_api,
            self.project_path(repo)
        );
        let url = self.paged_url(&base, &cursor);

        debug!(url = %url, "GitLab list_pull_requests");
        let (raw, next): (Vec<GitLabMr>, _) = self.get_page(&url).await?;
        let items = raw.into_iter().map(|m| mr_to_coderisk(repo_id, m)).collect();

        Ok(Page { items, next })
    }

    pub async fn list_comments(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        parent_kind: CommentParentKind,
        parent_number: u64,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Comment>> {
        let segment = match parent_kind {
            CommentParentKind::Issue => "issues",
            CommentParentKind::PullRequest => "merge_requests",
        };
        let base = format!(
            "{}/projects/{}/{}/{}/notes",
            self.base_api,
            self.project_path(repo),
            segment,
            parent_number
        );
        let url = self.paged_url(&base, &cursor);

        debug!(url = %url, "GitLab list_comments");
        let (raw, next): (Vec<GitLabNote>, _) = self.get_page(&url).await?;
        let items = raw
            .into_iter()
            .filter(|n| !n.system)
            .map(|n| note_to_coderisk(repo_id, parent_kind, parent_number, n))
            .collect();

        Ok(Page { items, next })
    }

    pub async fn get_file_raw(
        &self,
        repo: &RepoRef,
        repo_relative_path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<Vec<u8>>> {
        let url = format!(
            "{}/projects/{}/repository/files/{}/raw",
            self.base_api,
            self.project_path(repo),
            urlencoding::encode(repo_relative_path)
        );

        let resp = self
            .http
            .get(&url)
            .query(&[("ref", git_ref)])
            .header("PRIVATE-TOKEN", &self.token)
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }

        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    /// GitLab has no endpoint equivalent to GitHub's issue timeline
    /// (resource label/state events are split across several endpoints);
    /// always returns an empty page so callers don't have to branch on
    /// provider kind.
    pub async fn list_timeline(
        &self,
        _repo_id: uuid::Uuid,
        _repo: &RepoRef,
        _issue_number: u64,
        _cursor: Option<PageCursor>,
    ) -> ScmResult<Page<coderisk_types::TimelineEvent>> {
        Ok(Page {
            items: Vec::new(),
            next: None,
        })
    }
}

fn issue_state(state: &str) -> IssueState {
    if state == "closed" {
        IssueState::Closed
    } else {
        IssueState::Open
    }
}

fn commit_to_coderisk(repo_id: uuid::Uuid, c: GitLabCommit, patches: Vec<FilePatch>) -> Commit {
    let author = Identity {
        name: c.author_name,
        email: c.author_email,
        when: c.authored_date,
    };
    let committer = Identity {
        name: c.committer_name.unwrap_or_else(|| author.name.clone()),
        email: c.committer_email.unwrap_or_else(|| author.email.clone()),
        when: c.committed_date.unwrap_or(author.when),
    };

    Commit {
        repo_id,
        sha: c.id,
        author,
        committer,
        parent_shas: c.parent_ids,
        topological_index: 0,
        patches,
        message: c.message,
        processed_at: Default::default(),
    }
}

fn issue_to_coderisk(repo_id: uuid::Uuid, i: GitLabIssue) -> Issue {
    Issue {
        repo_id,
        number: i.iid,
        title: i.title,
        body: i.description,
        state: issue_state(&i.state),
        close_reason: None,
        labels: i.labels,
        created_at: i.created_at,
        updated_at: i.updated_at,
        closed_at: i.closed_at,
    }
}

fn mr_to_coderisk(repo_id: uuid::Uuid, m: GitLabMr) -> PullRequest {
    PullRequest {
        repo_id,
        number: m.iid,
        title: m.title,
        body: m.description,
        state: if m.state == "merged" || m.state == "closed" {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        close_reason: None,
        labels: m.labels,
        created_at: m.created_at,
        updated_at: m.updated_at,
        closed_at: m.closed_at,
        merged_at: m.merged_at,
        merge_commit_sha: m.merge_commit_sha,
        head_sha: Some(m.sha),
        base_branch: Some(m.target_branch),
    }
}

fn note_to_coderisk(
    repo_id: uuid::Uuid,
    parent_kind: CommentParentKind,
    parent_number: u64,
    n: GitLabNote,
) -> Comment {
    Comment {
        repo_id,
        parent_kind,
        parent_number,
        provider_comment_id: n.id.to_string(),
        author_normalized_email: None,
        author_role: if n.author.is_bot() {
            CommenterRole::Bot
        } else {
            CommenterRole::Contributor
        },
        body: n.body,
        created_at: n.created_at,
    }
}

#[derive(Debug, Deserialize)]
struct GitLabCommit {
    id: String,
    message: String,
    author_name: String,
    author_email: String,
    authored_date: DateTime<Utc>,
    #[serde(default)]
    committer_name: Option<String>,
    #[serde(default)]
    committer_email: Option<String>,
    #[serde(default)]
    committed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    parent_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabDiff {
    old_path: String,
    new_path: String,
    new_file: bool,
    renamed_file: bool,
    deleted_file: bool,
    #[serde(default)]
    diff: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabIssue {
    iid: u64,
    title: String,
    description: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GitLabMr {
    iid: u64,
    title: String,
    description: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    merge_commit_sha: Option<String>,
    sha: String,
    target_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitLabNoteAuthor {
    username: String,
}

impl GitLabNoteAuthor {
    fn is_bot(&self) -> bool {
        self.username.ends_with("-bot") || self.username.ends_with("[bot]")
    }
}

#[derive(Debug, Deserialize)]
struct GitLabNote {
    id: u64,
    body: String,
    created_at: DateTime<Utc>,
    author: GitLabNoteAuthor,
    #[serde(default)]
    system: bool,
}
