//! Orchestrates the six link-resolution patterns over one repo's staged
//! issues, pull requests, commits and comments, then upserts the results
//! into `github_issue_pr_links` / `github_issue_no_links`.
//!
//! Patterns run in a fixed order, serially, each folding its findings
//! into a shared candidate set keyed by `(issue_number,
//! target)`. A target is either a commit (by sha) or a pull request (by
//! number) — `github_issue_pr_links` has no slot for issue-to-issue
//! mentions, so those are dropped rather than recorded.

use std::collections::{HashMap, HashSet};

use ai_llm_service::LlmServiceProfiles;
use coderisk_types::{CommentParentKind, Issue, IssueState, PullRequest};
use relational_store::{comments, issues, links, pull_requests, timeline, Pool};
use tracing::debug;
use uuid::Uuid;

use crate::errors::Result;
use crate::report::GrapherReport;
use crate::{comment, crossref, explicit, merge_commit, semantic, temporal};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Target {
    Commit(String),
    PullRequest(u64),
}

#[derive(Debug, Default, Clone)]
struct Candidate {
    evidence_tags: Vec<String>,
    pattern_confidences: Vec<f64>,
    boost: f64,
    semantic_score: Option<f64>,
}

impl Candidate {
    fn add_pattern(&mut self, tag: &str, confidence: f64) {
        if !self.evidence_tags.iter().any(|t| t == tag) {
            self.evidence_tags.push(tag.to_string());
        }
        self.pattern_confidences.push(confidence);
    }

    fn is_temporal_only(&self) -> bool {
        !self.evidence_tags.is_empty() && self.evidence_tags.iter().all(|t| t.starts_with("temporal"))
    }

    fn confidence(&self) -> f64 {
        let base = self.pattern_confidences.iter().cloned().fold(0.0_f64, f64::max);
        (base + self.boost).min(1.0)
    }
}

type Candidates = HashMap<u64, HashMap<Target, Candidate>>;

pub async fn run(pool: &Pool, repo_id: Uuid, llm: Option<&LlmServiceProfiles>) -> Result<GrapherReport> {
    let mut report = GrapherReport::default();

    let all_issues_list = issues::all_issues(pool, repo_id).await?;
    let all_prs = pull_requests::all_pull_requests(pool, repo_id).await?;
    let all_commits = relational_store::commits::all_commits_topo_order(pool, repo_id).await?;
    let pr_numbers: HashSet<u64> = all_prs.iter().map(|pr| pr.number).collect();
    let known_shas: HashSet<&str> = all_commits.iter().map(|c| c.sha.as_str()).collect();

    let mut candidates: Candidates = HashMap::new();

    explicit_pass(&mut candidates, &all_prs, &all_commits, &mut report);
    temporal_pass(&mut candidates, &all_issues_list, &all_prs, &all_commits, &mut report);
    comment_pass(pool, repo_id, &all_issues_list, &all_prs, &known_shas, &pr_numbers, llm, &mut candidates, &mut report).await?;
    semantic_pass(&mut candidates, &all_issues_list, &all_prs, &all_commits, &mut report);
    crossref_pass(pool, repo_id, &all_issues_list, &all_prs, &pr_numbers, &mut candidates, &mut report).await?;
    merge_commit_pass(&mut candidates, &all_commits, &mut report);

    write_links(pool, repo_id, &candidates, &all_issues_list, &mut report).await?;

    Ok(report)
}

fn explicit_pass(
    candidates: &mut Candidates,
    prs: &[PullRequest],
    commits: &[coderisk_types::Commit],
    report: &mut GrapherReport,
) {
    for pr in prs {
        let text = format!("{} {}", pr.title, pr.body.clone().unwrap_or_default());
        for m in explicit::extract(&text) {
            let c = candidates
                .entry(m.number)
                .or_default()
                .entry(Target::PullRequest(pr.number))
                .or_default();
            c.add_pattern("explicit", explicit::confidence(m.strong));
            report.explicit_matches += 1;
        }
    }
    for commit in commits {
        for m in explicit::extract(&commit.message) {
            let c = candidates
                .entry(m.number)
                .or_default()
                .entry(Target::Commit(commit.sha.clone()))
                .or_default();
            c.add_pattern("explicit", explicit::confidence(m.strong));
            report.explicit_matches += 1;
        }
    }
}

fn temporal_pass(
    candidates: &mut Candidates,
    issues: &[Issue],
    prs: &[PullRequest],
    commits: &[coderisk_types::Commit],
    report: &mut GrapherReport,
) {
    for issue in issues {
        if issue.state != IssueState::Closed {
            continue;
        }
        let Some(reason) = issue.close_reason else { continue };
        if !reason.eligible_for_temporal_pattern() {
            continue;
        }
        let Some(closed_at) = issue.closed_at else { continue };

        for pr in prs {
            let Some(merged_at) = pr.merged_at else { continue };
            if let Some((tag, conf)) = temporal::classify(closed_at, merged_at) {
                let c = candidates
                    .entry(issue.number)
                    .or_default()
                    .entry(Target::PullRequest(pr.number))
                    .or_default();
                c.add_pattern(tag, conf);
                report.temporal_matches += 1;
            }
        }
        for commit in commits {
            if let Some((tag, conf)) = temporal::classify(closed_at, commit.author.when) {
                let c = candidates
                    .entry(issue.number)
                    .or_default()
                    .entry(Target::Commit(commit.sha.clone()))
                    .or_default();
                c.add_pattern(tag, conf);
                report.temporal_matches += 1;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn comment_pass(
    pool: &Pool,
    repo_id: Uuid,
    issues: &[Issue],
    prs: &[PullRequest],
    known_shas: &HashSet<&str>,
    pr_numbers: &HashSet<u64>,
    llm: Option<&LlmServiceProfiles>,
    candidates: &mut Candidates,
    report: &mut GrapherReport,
) -> Result<()> {
    let mut parents: Vec<(u64, CommentParentKind)> = issues.iter().map(|i| (i.number, CommentParentKind::Issue)).collect();
    parents.extend(prs.iter().map(|pr| (pr.number, CommentParentKind::PullRequest)));

    for (number, kind) in parents {
        let comment_list = comments::comments_for_issue(pool, repo_id, kind, number).await?;
        for cmt in &comment_list {
            let extraction = comment::extract(llm, &cmt.body).await;
            let base = (comment::BASE_CONFIDENCE + comment::role_boost(cmt.author_role)).min(comment::PATTERN_CEILING);

            for referenced in extraction.issue_or_pr_numbers {
                if !pr_numbers.contains(&referenced) {
                    continue;
                }
                let c = candidates
                    .entry(number)
                    .or_default()
                    .entry(Target::PullRequest(referenced))
                    .or_default();
                c.add_pattern("comment_role", base);
                report.comment_matches += 1;
            }
            for sha in extraction.shas {
                if !known_shas.contains(sha.as_str()) {
                    continue;
                }
                let c = candidates
                    .entry(number)
                    .or_default()
                    .entry(Target::Commit(sha))
                    .or_default();
                c.add_pattern("comment_role", base);
                report.comment_matches += 1;
            }
        }
    }
    Ok(())
}

fn semantic_pass(
    candidates: &mut Candidates,
    issues: &[Issue],
    prs: &[PullRequest],
    commits: &[coderisk_types::Commit],
    report: &mut GrapherReport,
) {
    let commits_by_sha: HashMap<&str, &coderisk_types::Commit> =
        commits.iter().map(|c| (c.sha.as_str(), c)).collect();
    let prs_by_number: HashMap<u64, &PullRequest> = prs.iter().map(|pr| (pr.number, pr)).collect();

    for issue in issues {
        let Some(targets) = candidates.get_mut(&issue.number) else { continue };
        let issue_kw = semantic::keywords(&format!("{} {}", issue.title, issue.body.clone().unwrap_or_default()));

        let mut to_drop = Vec::new();
        for (target, candidate) in targets.iter_mut() {
            let target_kw = match target {
                Target::Commit(sha) => commits_by_sha.get(sha.as_str()).map(|c| semantic::keywords(&c.message)),
                Target::PullRequest(n) => prs_by_number
                    .get(n)
                    .map(|pr| semantic::keywords(&format!("{} {}", pr.title, pr.body.clone().unwrap_or_default()))),
            };
            let Some(target_kw) = target_kw else { continue };

            let score = semantic::jaccard(&issue_kw, &target_kw);
            candidate.semantic_score = Some(score);

            if score < semantic::REJECT_THRESHOLD && candidate.is_temporal_only() {
                to_drop.push(target.clone());
                report.semantic_rejections += 1;
            } else if score >= semantic::BOOST_THRESHOLD {
                candidate.boost += semantic::BOOST_AMOUNT;
                report.semantic_boosts += 1;
            }
        }
        for target in to_drop {
            targets.remove(&target);
        }
    }
}

async fn crossref_pass(
    pool: &Pool,
    repo_id: Uuid,
    issues: &[Issue],
    prs: &[PullRequest],
    pr_numbers: &HashSet<u64>,
    candidates: &mut Candidates,
    report: &mut GrapherReport,
) -> Result<()> {
    let prs_by_number: HashMap<u64, &PullRequest> = prs.iter().map(|pr| (pr.number, pr)).collect();

    for issue in issues {
        let events = timeline::timeline_for_issue(pool, repo_id, issue.number).await?;
        let issue_kw = semantic::keywords(&format!("{} {}", issue.title, issue.body.clone().unwrap_or_default()));

        for event in events {
            let Some(referenced) = crossref::referenced_number(&event) else { continue };
            if !pr_numbers.contains(&referenced) {
                continue;
            }
            let target = Target::PullRequest(referenced);
            let issue_candidates = candidates.entry(issue.number).or_default();

            if let Some(existing) = issue_candidates.get_mut(&target) {
                existing.add_pattern("crossref", crossref::CONFIDENCE);
                report.crossref_matches += 1;
                continue;
            }

            let semantic_score = prs_by_number.get(&referenced).map(|pr| {
                let pr_kw = semantic::keywords(&format!("{} {}", pr.title, pr.body.clone().unwrap_or_default()));
                semantic::jaccard(&issue_kw, &pr_kw)
            });

            if crossref::gate_passes(false, semantic_score, false) {
                let mut fresh = Candidate::default();
                fresh.semantic_score = semantic_score;
                fresh.add_pattern("crossref", crossref::CONFIDENCE);
                issue_candidates.insert(target, fresh);
                report.crossref_matches += 1;
            } else {
                debug!(
                    issue = issue.number,
                    referenced, "cross-reference mention dropped: no corroborating evidence"
                );
            }
        }
    }
    Ok(())
}

fn merge_commit_pass(candidates: &mut Candidates, commits: &[coderisk_types::Commit], report: &mut GrapherReport) {
    for commit in commits.iter().filter(|c| c.is_merge()) {
        let (_pr_number, issue_matches) = merge_commit::extract(&commit.message);
        for m in issue_matches {
            let c = candidates
                .entry(m.number)
                .or_default()
                .entry(Target::Commit(commit.sha.clone()))
                .or_default();
            c.add_pattern("merge_commit", merge_commit::CONFIDENCE);
            report.merge_commit_matches += 1;
        }
    }
}

async fn write_links(
    pool: &Pool,
    repo_id: Uuid,
    candidates: &Candidates,
    issues: &[Issue],
    report: &mut GrapherReport,
) -> Result<()> {
    for (issue_number, targets) in candidates {
        for (target, candidate) in targets {
            let (pr_number, commit_sha) = match target {
                Target::Commit(sha) => (None, Some(sha.clone())),
                Target::PullRequest(n) => (Some(*n), None),
            };
            let link = links::LinkRecord {
                repo_id,
                issue_number: *issue_number,
                pr_number,
                commit_sha,
                evidence: candidate.evidence_tags.clone(),
                confidence: candidate.confidence(),
            };
            links::upsert_link(pool, &link).await?;
            report.links_written += 1;
        }
    }

    for issue in issues.iter().filter(|i| i.state == IssueState::Closed) {
        let has_links = candidates.get(&issue.number).map(|m| !m.is_empty()).unwrap_or(false);
        if has_links {
            links::clear_orphan(pool, repo_id, issue.number).await?;
        } else {
            links::record_orphan(pool, repo_id, issue.number, "no_pattern_matched").await?;
            report.orphans_recorded += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_takes_the_max_pattern_base_not_the_sum() {
        let mut c = Candidate::default();
        c.add_pattern("explicit", 0.88);
        c.add_pattern("temporal_5min", 0.75);
        assert!((c.confidence() - 0.88).abs() < 1e-9);
    }

    #[test]
    fn semantic_boost_is_additive_on_top_of_the_pattern_max() {
        let mut c = Candidate::default();
        c.add_pattern("temporal_24hr", 0.55);
        c.boost += semantic::BOOST_AMOUNT;
        assert!((c.confidence() - 0.65).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let mut c = Candidate::default();
        c.add_pattern("explicit", 0.95);
        c.boost += 0.5;
        assert_eq!(c.confidence(), 1.0);
    }

    #[test]
    fn temporal_only_candidate_is_identified_correctly() {
        let mut c = Candidate::default();
        c.add_pattern("temporal_1hr", 0.65);
        assert!(c.is_temporal_only());
        c.add_pattern("explicit", 0.88);
        assert!(!c.is_temporal_only());
    }

    proptest::proptest! {
        /// ∀ candidate c: c.confidence() = min(1.0, …), for any non-empty
        /// set of pattern base confidences plus a boost.
        #[test]
        fn confidence_is_always_within_unit_bounds(
            confidences in proptest::collection::vec(0.0f64..=1.0, 0..8),
            boost in 0.0f64..=1.0,
        ) {
            let mut c = Candidate::default();
            for (i, conf) in confidences.into_iter().enumerate() {
                c.add_pattern(&format!("pattern_{i}"), conf);
            }
            c.boost = boost;
            proptest::prop_assert!((0.0..=1.0).contains(&c.confidence()));
        }

        /// Adding any single pattern's evidence to an existing candidate
        /// can only raise or hold its confidence, never lower it.
        #[test]
        fn confidence_never_decreases_when_a_pattern_is_added(
            existing in proptest::collection::vec(0.0f64..=1.0, 0..8),
            boost in 0.0f64..=1.0,
            extra in 0.0f64..=1.0,
        ) {
            let mut c = Candidate::default();
            for (i, conf) in existing.into_iter().enumerate() {
                c.add_pattern(&format!("pattern_{i}"), conf);
            }
            c.boost = boost;
            let before = c.confidence();
            c.add_pattern("extra", extra);
            proptest::prop_assert!(c.confidence() >= before);
        }
    }
}
