//! Fuzzy entity resolution: a `(canonical_file_path,
//! block_name)` pair is unique in storage, but Stage 2's candidate name
//! alone can be ambiguous against what's already on file for a path
//! (overloads, nested classes, a closure vs its enclosing function). This
//! module decides which existing block a candidate really refers to, or
//! whether it is a new one.
//!
//! Order of resolution: (i) an exact name match short-circuits everything;
//! (ii) line-range overlap against every active block in the file; (iii)
//! when more than one block overlaps, an LLM disambiguation pass with its
//! own confidence score; (iv) below [`RESOLUTION_THRESHOLD`], mint a new
//! block rather than guess.

use ai_llm_service::LlmServiceProfiles;
use coderisk_types::CodeBlock;
use tracing::debug;

use crate::extract::BlockCandidate;

/// Below this confidence, the candidate is treated as a new block rather
/// than attributed to an existing one.
pub const RESOLUTION_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub canonical_name: String,
    pub confidence: f32,
    pub is_new: bool,
}

fn overlap_ratio(a: (u32, u32), b: (u32, u32)) -> f32 {
    let inter_start = a.0.max(b.0);
    let inter_end = a.1.min(b.1);
    if inter_start > inter_end {
        return 0.0;
    }
    let inter = (inter_end - inter_start + 1) as f32;
    let union = (a.1.max(b.1) - a.0.min(b.0) + 1) as f32;
    inter / union
}

/// Resolves one candidate against every currently active block in its
/// file. `existing` should already be scoped to `candidate`'s canonical
/// path by the caller (`relational_store::code_blocks::active_blocks_in_file`).
pub async fn resolve(
    llm: Option<&LlmServiceProfiles>,
    candidate: &BlockCandidate,
    existing: &[CodeBlock],
) -> Resolution {
    if let Some(exact) = existing.iter().find(|b| b.name == candidate.name) {
        return Resolution { canonical_name: exact.name.clone(), confidence: 1.0, is_new: false };
    }

    let mut scored: Vec<(&CodeBlock, f32)> = existing
        .iter()
        .map(|b| (b, overlap_ratio((candidate.start_line, candidate.end_line), (b.start_line, b.end_line))))
        .filter(|(_, ratio)| *ratio > 0.0)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let chosen = match scored.as_slice() {
        [] => None,
        [(block, ratio)] => Some(((*block).clone(), *ratio)),
        _ => match llm {
            Some(llm) => disambiguate(llm, candidate, &scored).await.or_else(|| scored.first().map(|(b, r)| ((*b).clone(), *r))),
            None => scored.first().map(|(b, r)| ((*b).clone(), *r)),
        },
    };

    match chosen {
        Some((block, confidence)) if confidence >= RESOLUTION_THRESHOLD => {
            Resolution { canonical_name: block.name, confidence, is_new: false }
        }
        _ => Resolution { canonical_name: candidate.name.clone(), confidence: 1.0, is_new: true },
    }
}

const SYSTEM_PROMPT: &str = "Several existing code blocks overlap the line range of a new change. Pick which one the change actually belongs to. Reply with exactly two tokens: the 1-based index from the list, then a confidence between 0 and 1, e.g. \"2 0.85\".";

async fn disambiguate(
    llm: &LlmServiceProfiles,
    candidate: &BlockCandidate,
    scored: &[(&CodeBlock, f32)],
) -> Option<(CodeBlock, f32)> {
    let mut prompt = format!(
        "Change: name={}, lines={}-{}\nCandidates:\n",
        candidate.name, candidate.start_line, candidate.end_line
    );
    for (i, (block, ratio)) in scored.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} (lines {}-{}, overlap {:.2})\n",
            i + 1,
            block.name,
            block.start_line,
            block.end_line,
            ratio
        ));
    }

    match llm.generate_fast(&prompt, Some(SYSTEM_PROMPT)).await {
        Ok(reply) => parse_disambiguation(&reply, scored),
        Err(err) => {
            debug!(error = %err, "resolution LLM call failed, falling back to highest overlap");
            None
        }
    }
}

fn parse_disambiguation(reply: &str, scored: &[(&CodeBlock, f32)]) -> Option<(CodeBlock, f32)> {
    let mut tokens = reply.split_whitespace();
    let index: usize = tokens.next()?.parse().ok()?;
    let confidence: f32 = tokens.next()?.parse().ok()?;
    let block = scored.get(index.checked_sub(1)?)?.0.clone();
    Some((block, confidence.clamp(0.0, 1.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderisk_types::BlockKind;
    use uuid::Uuid;

    fn block(name: &str, start: u32, end: u32) -> CodeBlock {
        CodeBlock {
            repo_id: Uuid::nil(),
            canonical_path: "src/lib.rs".to_string(),
            name: name.to_string(),
            kind: BlockKind::Function,
            start_line: start,
            end_line: end,
            resolution_confidence: 1.0,
        }
    }

    fn candidate(name: &str, start: u32, end: u32) -> BlockCandidate {
        BlockCandidate {
            name: name.to_string(),
            kind: BlockKind::Function,
            change_type: coderisk_types::ChangeType::Modified,
            start_line: start,
            end_line: end,
            is_refactor_only: false,
        }
    }

    #[test]
    fn overlap_ratio_is_one_for_identical_ranges() {
        assert_eq!(overlap_ratio((10, 20), (10, 20)), 1.0);
    }

    #[test]
    fn overlap_ratio_is_zero_for_disjoint_ranges() {
        assert_eq!(overlap_ratio((1, 5), (10, 20)), 0.0);
    }

    #[tokio::test]
    async fn exact_name_match_short_circuits_with_full_confidence() {
        let existing = vec![block("parse", 1, 50)];
        let res = resolve(None, &candidate("parse", 1, 50), &existing).await;
        assert!(!res.is_new);
        assert_eq!(res.confidence, 1.0);
        assert_eq!(res.canonical_name, "parse");
    }

    #[tokio::test]
    async fn unambiguous_single_overlap_is_attributed_without_llm() {
        let existing = vec![block("handler", 10, 30)];
        let res = resolve(None, &candidate("handler_inner", 12, 28), &existing).await;
        assert!(!res.is_new);
        assert_eq!(res.canonical_name, "handler");
    }

    #[tokio::test]
    async fn no_overlap_at_all_mints_a_new_block() {
        let existing = vec![block("other", 100, 200)];
        let res = resolve(None, &candidate("fresh", 1, 10), &existing).await;
        assert!(res.is_new);
        assert_eq!(res.canonical_name, "fresh");
    }

    #[tokio::test]
    async fn ambiguous_overlap_without_llm_picks_highest_ratio_if_above_threshold() {
        let existing = vec![block("a", 1, 100), block("b", 40, 60)];
        // candidate range matches "b" almost exactly, overlaps "a" partially.
        let res = resolve(None, &candidate("x", 41, 59), &existing).await;
        assert!(!res.is_new);
        assert_eq!(res.canonical_name, "b");
    }
}
