//! Bitbucket Cloud provider (REST v2) for commit history, issues, PRs and
//! comments.
//!
//! Endpoints used:
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/commits
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/diff/{sha}
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/issues
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/pullrequests
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/issues/{id}/comments
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/pullrequests/{id}/comments
//!   * GET /2.0/repositories/{workspace}/{repo_slug}/src/{ref}/{path}

use chrono::{DateTime, Utc};
use coderisk_types::{
    Comment, CommentParentKind, CommenterRole, Commit, FilePatch, Identity, Issue, IssueState,
    PullRequest,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::errors::ScmResult;
use crate::git_providers::types::RepoRef;
use crate::pagination::{Page, PageCursor};
use crate::parser::{looks_like_binary_patch, parse_unified_diff, split_multi_file_diff};
use crate::retry::with_backoff;

#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: Client,
    base_api: String,
    token: String,
}

impl BitbucketClient {
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        debug!(base_api = %base_api, "creating BitbucketClient");
        Self {
            http,
            base_api,
            token,
        }
    }

    async fn get_page<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> ScmResult<(Vec<T>, Option<PageCursor>)> {
        with_backoff("bitbucket:get_page", || async {
            let page: BitbucketPage<T> = self
                .http
                .get(url)
                .header("Authorization", format!("Bearer {}", self.token))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok((page.values, page.next.map(PageCursor)))
        })
        .await
    }

    pub async fn list_commits(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        _since: Option<DateTime<Utc>>,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<Commit>> {
        let (workspace, slug) = split_workspace_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}/repositories/{}/{}/commits",
                self.base_api, workspace, slug
            )
        });

        debug!(url = %url, "Bitbucket list_commits");
        let (raw, next): (Vec<BitbucketCommit>, _) = self.get_page(&url).await?;

        let mut items = Vec::with_capacity(raw.len());
        for c in raw {
            let patches = self.get_commit_diff(&workspace, &slug, &c.hash).await?;
            items.push(commit_to_coderisk(repo_id, c, patches));
        }

        Ok(Page { items, next })
    }

    async fn get_commit_diff(
        &self,
        workspace: &str,
        slug: &str,
        sha: &str,
    ) -> ScmResult<Vec<FilePatch>> {
        let url = format!(
            "{}/repositories/{}/{}/diff/{}",
            self.base_api, workspace, slug, sha
        );
        let raw = with_backoff("bitbucket:get_commit_diff", || async {
            let text = self
                .http
                .get(&url)
                .header("Authorization", format!("Bearer {}", self.token))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            Ok(text)
        })
        .await?;

        Ok(split_multi_file_diff(&raw)
            .into_iter()
            .map(|(old_path, new_path, text)| {
                let is_binary = looks_like_binary_patch(&text);
                let hunks = if is_binary {
                    Vec::new()
                } else {
                    parse_unified_diff(&text)
                };
                FilePatch {
                    old_path,
                    new_path,
                    is_new: false,
                    is_deleted: false,
                    is_renamed: false,
                    is_binary,
                    hunks,
                    raw_unidiff: Some(text),
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
        let (workspace, slug) = split_workspace_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!("{}/repositories/{}/{}/issues", self.base_api, workspace, slug)
        });

        debug!(url = %url, "Bitbucket list_issues");
        let (raw, next): (Vec<BitbucketIssue>, _) = self.get_page(&url).await?;
        let items = raw.into_iter().map(|i| issue_to_coderisk(repo_id, i)).collect();

        Ok(Page { items, next })
    }

    pub async fn list_pull_requests(
        &self,
        repo_id: uuid::Uuid,
        repo: &RepoRef,
        cursor: Option<PageCursor>,
    ) -> ScmResult<Page<PullRequest>> {
        let (workspace, slug) = split_workspace_repo(&repo.project)?;
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}/repositories/{}/{}/pullrequests?state=ALL",
                self.base_api, workspace, slug
            )
        });

        debug!(url = %url, "Bitbucket list_pull_requests");
        let (raw, next): (Vec<BitbucketPr>, _) = self.get_page(&url).await?;
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
        let (workspace, slug) = split_workspace_repo(&repo.project)?;
        let segment = match parent_kind {
            CommentParentKind::Issue => "issues",
            CommentParentKind::PullRequest => "pullrequests",
        };
        let url = cursor.map(|c| c.0).unwrap_or_else(|| {
            format!(
                "{}/repositories/{}/{}/{}/{}/comments",
                self.base_api, workspace, slug, segment, parent_number
            )
        });

        debug!(url = %url, "Bitbucket list_comments");
        let (raw, next): (Vec<BitbucketComment>, _) = self.get_page(&url).await?;
        let items = raw
            .into_iter()
            .map(|c| comment_to_coderisk(repo_id, parent_kind, parent_number, c))
            .collect();

        Ok(Page { items, next })
    }

    pub async fn get_file_raw(
        &self,
        repo: &RepoRef,
        repo_relative_path: &str,
        git_ref: &str,
    ) -> ScmResult<Option<Vec<u8>>> {
        let (workspace, slug) = split_workspace_repo(&repo.project)?;
        let url = format!(
            "{}/repositories/{}/{}/src/{}/{}",
            self.base_api, workspace, slug, git_ref, repo_relative_path
        );

        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }

        let resp = resp.error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    /// Bitbucket Cloud exposes no issue/PR timeline endpoint; always
    /// returns an empty page so callers don't have to branch on provider
    /// kind.
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

fn split_workspace_repo(project: &str) -> ScmResult<(String, String)> {
    let mut parts = project.split('/');
    let workspace = parts.next().unwrap_or("").trim();
    let repo = parts.next().unwrap_or("").trim();

    if workspace.is_empty() || repo.is_empty() || parts.next().is_some() {
        return Err(crate::errors::ScmError::Validation(format!(
            "invalid Bitbucket project id '{}', expected 'workspace/repo_slug'",
            project
        )));
    }

    Ok((workspace.to_string(), repo.to_string()))
}

fn commit_to_coderisk(repo_id: uuid::Uuid, c: BitbucketCommit, patches: Vec<FilePatch>) -> Commit {
    let name = c
        .author
        .as_ref()
        .and_then(|a| a.user.as_ref())
        .map(|u| u.display_name.clone())
        .unwrap_or_default();
    let identity = Identity {
        name,
        email: String::new(),
        when: c.date,
    };

    Commit {
        repo_id,
        sha: c.hash,
        author: identity.clone(),
        committer: identity,
        parent_shas: c.parents.into_iter().map(|p| p.hash).collect(),
        topological_index: 0,
        patches,
        message: c.message,
        processed_at: Default::default(),
    }
}

fn issue_to_coderisk(repo_id: uuid::Uuid, i: BitbucketIssue) -> Issue {
    Issue {
        repo_id,
        number: i.id,
        title: i.title,
        body: i.content.map(|c| c.raw),
        state: if i.state == "resolved" || i.state == "closed" {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        close_reason: None,
        labels: Vec::new(),
        created_at: i.created_on,
        updated_at: i.updated_on,
        closed_at: None,
    }
}

fn pr_to_coderisk(repo_id: uuid::Uuid, p: BitbucketPr) -> PullRequest {
    PullRequest {
        repo_id,
        number: p.id,
        title: p.title,
        body: p.description,
        state: if p.state == "MERGED" || p.state == "DECLINED" {
            IssueState::Closed
        } else {
            IssueState::Open
        },
        close_reason: None,
        labels: Vec::new(),
        created_at: p.created_on,
        updated_at: p.updated_on,
        closed_at: None,
        merged_at: if p.state == "MERGED" {
            Some(p.updated_on)
        } else {
            None
        },
        merge_commit_sha: None,
        head_sha: p.source.map(|s| s.commit.hash),
        base_branch: p.destination.map(|d| d.branch.name),
    }
}

fn comment_to_coderisk(
    repo_id: uuid::Uuid,
    parent_kind: CommentParentKind,
    parent_number: u64,
    c: BitbucketComment,
) -> Comment {
    Comment {
        repo_id,
        parent_kind,
        parent_number,
        provider_comment_id: c.id.to_string(),
        author_normalized_email: None,
        author_role: CommenterRole::Contributor,
        body: c.content.map(|ct| ct.raw).unwrap_or_default(),
        created_at: c.created_on,
    }
}

#[derive(Debug, Deserialize)]
struct BitbucketPage<T> {
    values: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BitbucketUser {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitAuthor {
    user: Option<BitbucketUser>,
}

#[derive(Debug, Deserialize)]
struct BitbucketParent {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommit {
    hash: String,
    message: String,
    date: DateTime<Utc>,
    author: Option<BitbucketCommitAuthor>,
    #[serde(default)]
    parents: Vec<BitbucketParent>,
}

#[derive(Debug, Deserialize)]
struct BitbucketContent {
    raw: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketIssue {
    id: u64,
    title: String,
    content: Option<BitbucketContent>,
    state: String,
    created_on: DateTime<Utc>,
    updated_on: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct BitbucketCommitRef {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketPrSide {
    branch: BitbucketBranch,
    commit: BitbucketCommitRef,
}

#[derive(Debug, Deserialize)]
struct BitbucketPr {
    id: u64,
    title: String,
    description: Option<String>,
    state: String,
    created_on: DateTime<Utc>,
    updated_on: DateTime<Utc>,
    #[serde(default)]
    source: Option<BitbucketPrSide>,
    #[serde(default)]
    destination: Option<BitbucketPrSide>,
}

#[derive(Debug, Deserialize)]
struct BitbucketComment {
    id: u64,
    content: Option<BitbucketContent>,
    created_on: DateTime<Utc>,
}
