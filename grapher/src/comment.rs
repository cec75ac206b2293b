//! Pattern 3: comment-based reference extraction. An LLM call extracts SHA/issue/PR references from a
//! comment body; on LLM unavailability it falls back to the same
//! verb-guarded regex [`crate::explicit`] uses, which catches the common
//! case (`"fixed by #123"`) without needing the model.

use ai_llm_service::LlmServiceProfiles;
use coderisk_types::CommenterRole;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::explicit;

fn sha_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[0-9a-f]{7,40}\b").unwrap())
}

const SYSTEM_PROMPT: &str = "Extract every GitHub issue number, pull request number, and commit SHA mentioned in the comment below. Reply with a comma-separated list of bare numbers and SHAs, or NONE if there are none.";

/// Base confidence for any reference found in a comment, before the
/// commenter-role boost is applied.
pub const BASE_CONFIDENCE: f64 = 0.75;

pub fn role_boost(role: CommenterRole) -> f64 {
    match role {
        CommenterRole::Owner => 0.10,
        CommenterRole::Collaborator => 0.08,
        CommenterRole::Bot => 0.05,
        CommenterRole::Contributor => 0.03,
    }
}

/// Ceiling on `base + role_boost` for this pattern specifically, distinct from the overall link-confidence ceiling of
/// 1.0 applied once all six patterns have run.
pub const PATTERN_CEILING: f64 = 0.98;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentExtraction {
    pub issue_or_pr_numbers: Vec<u64>,
    pub shas: Vec<String>,
}

/// Extracts references from one comment body. Tries the LLM first when a
/// profile is given; on any error, or when none is given, falls back to
/// the regex heuristic.
pub async fn extract(llm: Option<&LlmServiceProfiles>, body: &str) -> CommentExtraction {
    if let Some(llm) = llm {
        match llm.generate_fast(body, Some(SYSTEM_PROMPT)).await {
            Ok(reply) => return parse_llm_reply(&reply),
            Err(err) => {
                debug!(error = %err, "comment extraction LLM call failed, falling back to regex");
            }
        }
    }
    regex_fallback(body)
}

fn parse_llm_reply(reply: &str) -> CommentExtraction {
    if reply.trim().eq_ignore_ascii_case("none") {
        return CommentExtraction::default();
    }
    let mut out = CommentExtraction::default();
    for token in reply.split(',') {
        let token = token.trim().trim_start_matches('#');
        if token.is_empty() {
            continue;
        }
        if let Ok(n) = token.parse::<u64>() {
            out.issue_or_pr_numbers.push(n);
        } else if sha_re().is_match(token) {
            out.shas.push(token.to_string());
        }
    }
    out
}

fn regex_fallback(body: &str) -> CommentExtraction {
    let mut out = CommentExtraction::default();
    for m in explicit::extract(body) {
        out.issue_or_pr_numbers.push(m.number);
    }
    for caps in sha_re().find_iter(body) {
        out.shas.push(caps.as_str().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn regex_fallback_extracts_explicit_reference_without_llm() {
        let extraction = extract(None, "fixed by #88").await;
        assert_eq!(extraction.issue_or_pr_numbers, vec![88]);
    }

    #[tokio::test]
    async fn regex_fallback_extracts_a_bare_sha() {
        let extraction = extract(None, "see commit deadbeefcafe1234 for the fix").await;
        assert_eq!(extraction.shas, vec!["deadbeefcafe1234".to_string()]);
    }

    #[test]
    fn owner_boost_capped_with_base_stays_under_ceiling() {
        let combined = (BASE_CONFIDENCE + role_boost(CommenterRole::Owner)).min(PATTERN_CEILING);
        assert!(combined <= PATTERN_CEILING);
        assert!((combined - 0.85).abs() < 1e-9);
    }

    #[test]
    fn llm_reply_of_none_yields_empty_extraction() {
        assert_eq!(parse_llm_reply("NONE"), CommentExtraction::default());
    }

    #[test]
    fn llm_reply_parses_mixed_numbers_and_shas() {
        let extraction = parse_llm_reply("#12, 7, a1b2c3d4e5f6");
        assert_eq!(extraction.issue_or_pr_numbers, vec![12, 7]);
        assert_eq!(extraction.shas, vec!["a1b2c3d4e5f6".to_string()]);
    }
}
