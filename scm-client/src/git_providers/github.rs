//! GitHub provider (REST v3) for commit history, issues, PRs and comments.
//!
//! Endpoints used:
//!   * GET /repos/{owner}/{repo}/commits
//!   * GET /repos/{owner}/{repo}/commits/{sha}
//!   * GET /repos/{owner}/{repo}/issues
//!   * GET /repos/{owner}/{repo}/pulls
//!   * GET /repos/{owner}/{repo}/issues/{number}/comments
//!   * GET /repos/{owner}/{repo}/contents/{path}?ref={ref}

use chrono::{DateTime, Utc};
use coderisk_types::{
    Comment, CommentParentKind, CommenterRole, Commit, FilePatch, Identity, Issue, IssueState,
    PullRequest, TimelineEvent,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::{ScmError, ScmResult};
use crate::git_providers::types::{RepoRef, DEFAULT_PAGE_SIZE};
use crate::pagination::{parse_github_link_next, parse_retry_after, Page, PageCursor};
use crate::parser::{looks_like_binary_patch, parse_unified_diff};
use crate::retry::with_backoff;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String,
    token: String,
}

impl GitHubClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        debug!(base_api = %base_api, "creating GitHubClient");
        Self {
            http,
            base_api,
            token,
        }
    }

    fn list_url(&self, path: &str) -> String {
        format!("{}{}", self.base_api, path)
    }

    async fn get_page<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> ScmResult<(Vec<T>, Option<PageCursor>)> {
        with_backoff("github:get_page", || async {
            let resp = self
                .http
                .get(url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?;

            if resp.status().as_u16() == 429 {
                let retry_after = parse_retry_after(
                    resp.headers().get("retry-after").and_then(|v| v.to_str().ok()),
                );
                return Err(ScmError::Provider(
                    crate::errors::ScmProviderError::RateLimited {
                        retry_after_secs: retry_after,
                    },
                ));
            }

            let resp = resp.error_for_status()?;
            let next = parse_github_link_next(resp.headers().get("link").and_then(|v| v.to_str().ok()));
            let items: Vec<T> = resp.json().await?;
            Ok((items, next))
        })
        .await
    }

    pub async fn list_commits(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        since: Option<DateTime<Utc>>,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Commit>> {
        let (owner, name) = split_owner_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            let mut url = format!(
                "{}?per_page={}",
                self.list_url(&format!("/repos/{}/{}/commits", owner, name)),
                DEFAULT_PAGE_SIZE
            );
            if let Some(since) = since {
                url.push_str(&format!("&since={}", since.to_rfc3339()));
            }
            url
        });

        debug!(url = %url, "GitHub list_commits");
        let (raw, next): (Vec<GitHubCommitSummary>, _) = self.get_page(&url).await?;

        let mut items = Vec::with_capacity(raw.len());
        for summary in raw {
            let detail = self.get_commit_detail(&owner, &name, &summary.sha).await?;
            items.push(detail_to_commit(repo_id, detail));
        }

        Ok(Page { items, next })
    }

    async fn get_commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> ScmResult<GitHubCommitDetail> {
        let url = self.list_url(&format!("/repos/{}/{}/commits/{}", owner, repo, sha));
        with_backoff("github:get_commit_detail", || async {
            let resp: GitHubCommitDetail = self
                .http
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Accept", "application/vnd.github+json")
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok(resp)
        })
        .await
    }

    pub async fn list_issues(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Issue>> {
        let (owner, name) = split_owner_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}?state=all&per_page={}",
                self.list_url(&format!("/repos/{}/{}/issues", owner, name)),
                DEFAULT_PAGE_SIZE
            )
        });

        debug!(url = %url, "GitHub list_issues");
        let (raw, next): (Vec<GitHubIssue>, _) = self.get_page(&url).await?;

        // GitHub's /issues endpoint also returns PRs; skip anything carrying
        // a `pull_request` stub, since list_pull_requests owns those.
        let items = raw
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| issue_to_coderisk(repo_id, i))
            .collect();

        Ok(Page { items, next })
    }

    pub async fn list_pull_requests(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<PullRequest>> {
        let (owner, name) = split_owner_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}?state=all&per_page={}",
                self.list_url(&format!("/repos/{}/{}/pulls", owner, name)),
                DEFAULT_PAGE_SIZE
            )
        });

        debug!(url = %url, "GitHub list_pull_requests");
        let (raw, next): (Vec<GitHubPr>, _) = self.get_page(&url).await?;
        let items = raw.into_iter().map(|p| pr_to_coderisk(repo_id, p)).collect();

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
        let (owner, name) = split_owner_repo(&repo.project)?;
        // GitHub serves issue and PR comments from the same `issues`
        // endpoint regardless of parent_kind.
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}?per_page={}",
                self.list_url(&format!(
                    "/repos/{}/{}/issues/{}/comments",
                    owner, name, parent_number
                )),
                DEFAULT_PAGE_SIZE
            )
        });

        debug!(url = %url, "GitHub list_comments");
        let (raw, next): (Vec<GitHubComment>, _) = self.get_page(&url).await?;
        let items = raw
            .into_iter()
            .map(|c| comment_to_coderisk(repo_id, parent_kind, parent_number, c))
            .collect();

        Ok(Page { items, next })
    }

    /// GET /repos/{owner}/{repo}/issues/{number}/timeline — shared by
    /// issues and PRs, since GitHub numbers them from one sequence.
    pub async fn list_timeline(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        issue_number: u64,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<TimelineEvent>> {
        let (owner, name) = split_owner_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}?per_page={}",
                self.list_url(&format!(
                    "/repos/{}/{}/issues/{}/timeline",
                    owner, name, issue_number
                )),
                DEFAULT_PAGE_SIZE
            )
        });

        debug!(url = %url, "GitHub list_timeline");
        let (raw, next): (Vec<GitHubTimelineEvent>, _) = self.get_timeline_page(&url).await?;
        let items = raw
            .into_iter()
            .map(|e| timeline_event_to_coderisk(repo_id, issue_number, e))
            .collect();

        Ok(Page { items, next })
    }

    async fn get_timeline_page(
        &self,
        url: &str,
    ) -> ScmResult<(Vec<GitHubTimelineEvent>, Option<PageCursor>)> {
        with_backoff("github:get_timeline_page", || async {
            let resp = self
                .http
                .get(url)
                .header("Authorization", format!("Bearer {}", self.token))
                // The timeline endpoint predates the stable v3 media type.
                .header("Accept", "application/vnd.github.mockingbird-preview+json")
                .send()
                .await?;

            if resp.status().as_u16() == 429 {
                let retry_after = parse_retry_after(
                    resp.headers().get("retry-after").and_then(|v| v.to_str().ok()),
                );
                return Err(ScmError::Provider(
                    crate::errors::ScmProviderError::RateLimited {
                        retry_after_secs: retry_after,
                    },
                ));
            }

            let resp = resp.error_for_status()?;
            let next = parse_github_link_next(resp.headers().get("link").and_then(|v| v.to_str().ok()));
            let items: Vec<GitHubTimelineEvent> = resp.json().await?;
            Ok((items, next))
        })
        .await
    }

    pub async fn get_file_raw(
        &self,
        repo: &RepoRef,
        repo_relative_path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<Vec<u8>>> {
        let (owner, name) = split_owner_repo(&repo.project)?;
        let url = self.list_url(&format!(
            "/repos/{}/{}/contents/{}",
            owner, name, repo_relative_path
        ));

        let resp = self
            .http
            .get(&url)
            .query(&[("ref", git_ref)])
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github.v3.raw")
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }

        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }
}

fn split_owner_repo(project: &str) -> ScmResult<(String, String)> {
    let mut parts = project.split('/');
    let owner = parts.next().unwrap_or("").trim();
    let repo = parts.next().unwrap_or("").trim();

    if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
        return Err(ScmError::Validation(format!(
            "invalid GitHub project id '{}', expected 'owner/repo'",
            project
        )));
    }

    Ok((owner.to_string(), repo.to_string()))
}

fn detail_to_commit(repo_id: uuid::Uuid, detail: GitHubCommitDetail) -> Commit {
    let patches = detail
        .files
        .unwrap_or_default()
        .into_iter()
        .map(|f| {
            let is_binary =
                f.patch.is_none() || looks_like_binary_patch(f.patch.as_deref().unwrap_or_default());
            let hunks = match &f.patch {
                Some(p) if !is_binary => parse_unified_diff(p),
                _ => Vec::new(),
            };

            let (old_path, new_path, is_new, is_deleted, is_renamed) = match f.status.as_str() {
                "added" => (None, Some(f.filename.clone()), true, false, false),
                "removed" => (Some(f.filename.clone()), None, false, true, false),
                "renamed" => (
                    f.previous_filename.clone(),
                    Some(f.filename.clone()),
                    false,
                    false,
                    true,
                ),
                _ => (
                    Some(f.filename.clone()),
                    Some(f.filename.clone()),
                    false,
                    false,
                    false,
                ),
            };

            FilePatch {
                old_path,
                new_path,
                is_new,
                is_deleted,
                is_renamed,
                is_binary,
                hunks,
                raw_unidiff: f.patch,
            }
        })
        .collect();

    let author = Identity {
        name: detail
            .commit
            .author
            .as_ref()
            .map(|a| a.name.clone())
            .unwrap_or_default(),
        email: detail
            .commit
            .author
            .as_ref()
            .map(|a| a.email.clone())
            .unwrap_or_default(),
        when: detail
            .commit
            .author
            .as_ref()
            .map(|a| a.date)
            .unwrap_or_else(Utc::now),
    };
    let committer = Identity {
        name: detail
            .commit
            .committer
            .as_ref()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| author.name.clone()),
        email: detail
            .commit
            .committer
            .as_ref()
            .map(|c| c.email.clone())
            .unwrap_or_else(|| author.email.clone()),
        when: detail
            .commit
            .committer
            .as_ref()
            .map(|c| c.date)
            .unwrap_or(author.when),
    };

    Commit {
        repo_id,
        sha: detail.sha,
        author,
        committer,
        parent_shas: detail.parents.into_iter().map(|p| p.sha).collect(),
        topological_index: 0,
        patches,
        message: detail.commit.message,
        processed_at: Default::default(),
    }
}

fn issue_state(state: &str) -> IssueState {
    if state == "closed" {
        IssueState::Closed
    } else {
        IssueState::Open
    }
}

fn issue_to_coderisk(repo_id: uuid::Uuid, i: GitHubIssue) -> Issue {
    Issue {
        repo_id,
        number: i.number,
        title: i.title,
        body: i.body,
        state: issue_state(&i.state),
        close_reason: i.state_reason.as_deref().map(map_close_reason),
        labels: i.labels.into_iter().map(|l| l.name).collect(),
        created_at: i.created_at,
        updated_at: i.updated_at,
        closed_at: i.closed_at,
    }
}

fn pr_to_coderisk(repo_id: uuid::Uuid, p: GitHubPr) -> PullRequest {
    PullRequest {
        repo_id,
        number: p.number,
        title: p.title,
        body: p.body,
        state: issue_state(&p.state),
        close_reason: None,
        labels: p.labels.into_iter().map(|l| l.name).collect(),
        created_at: p.created_at,
        updated_at: p.updated_at,
        closed_at: p.closed_at,
        merged_at: p.merged_at,
        merge_commit_sha: p.merge_commit_sha,
        head_sha: p.head.map(|h| h.sha),
        base_branch: p.base.map(|b| b.r#ref),
    }
}

fn map_close_reason(reason: &str) -> coderisk_types::CloseReason {
    use coderisk_types::CloseReason::*;
    match reason {
        "completed" => Completed,
        "not_planned" => NotPlanned,
        "reopened" => Other,
        _ => Other,
    }
}

fn comment_to_coderisk(
    repo_id: uuid::Uuid,
    parent_kind: CommentParentKind,
    parent_number: u64,
    c: GitHubComment,
) -> Comment {
    let author_role = match c.author_association.as_deref() {
        Some("OWNER") | Some("MEMBER") => CommenterRole::Owner,
        Some("COLLABORATOR") => CommenterRole::Collaborator,
        _ if c.user.as_ref().map(|u| u.login.ends_with("[bot]")).unwrap_or(false) => {
            CommenterRole::Bot
        }
        _ => CommenterRole::Contributor,
    };

    Comment {
        repo_id,
        parent_kind,
        parent_number,
        provider_comment_id: c.id.to_string(),
        author_normalized_email: None,
        author_role,
        body: c.body.unwrap_or_default(),
        created_at: c.created_at,
    }
}

fn timeline_event_to_coderisk(
    repo_id: uuid::Uuid,
    issue_number: u64,
    e: GitHubTimelineEvent,
) -> TimelineEvent {
    TimelineEvent {
        repo_id,
        issue_number,
        event_type: e.event,
        actor_email: None,
        created_at: e.created_at.unwrap_or_else(Utc::now),
        payload: e.raw,
    }
}

#[derive(Debug, Deserialize)]
struct GitHubTimelineEvent {
    event: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    raw: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitSummary {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitDetail {
    sha: String,
    commit: GitHubCommitInner,
    parents: Vec<GitHubParent>,
    #[serde(default)]
    files: Option<Vec<GitHubCommitFile>>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitInner {
    message: String,
    author: Option<GitHubCommitIdentity>,
    committer: Option<GitHubCommitIdentity>,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitIdentity {
    name: String,
    email: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct GitHubParent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitFile {
    filename: String,
    #[serde(default)]
    previous_filename: Option<String>,
    status: String,
    #[serde(default)]
    patch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubIssue {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    state_reason: Option<String>,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GitHubPrRef {
    sha: String,
    #[serde(rename = "ref")]
    r#ref: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPr {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    merge_commit_sha: Option<String>,
    #[serde(default)]
    head: Option<GitHubPrRef>,
    #[serde(default)]
    base: Option<GitHubPrRef>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubComment {
    id: u64,
    body: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    user: Option<GitHubUser>,
    #[serde(default)]
    author_association: Option<String>,
}
