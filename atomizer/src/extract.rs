//! Stage 2 primary parser: for each surviving patch excerpt,
//! ask the LLM for the named blocks it touched. With no LLM available the
//! run still produces a coarse, file-level `BlockKind::Module` change per
//! patch rather than nothing at all — "strictly coarser but still
//! internally consistent".

use ai_llm_service::LlmServiceProfiles;
use coderisk_types::{BlockKind, ChangeType};
use serde::Deserialize;
use tracing::debug;

use crate::chunk::PatchExcerpt;

#[derive(Debug, Clone, PartialEq)]
pub struct BlockCandidate {
    pub name: String,
    pub kind: BlockKind,
    pub change_type: ChangeType,
    pub start_line: u32,
    pub end_line: u32,
    pub is_refactor_only: bool,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    block_name: String,
    block_type: String,
    change_type: String,
    start_line: u32,
    end_line: u32,
    is_refactor_only: bool,
}

const SYSTEM_PROMPT: &str = r#"You are analyzing one file's diff hunk from a commit. List every named code block (function, method, type, or module-level unit) the hunk creates, modifies, deletes, or renames.

Reply with a JSON array, one object per block:
[{"block_name": "...", "block_type": "function|method|type|module", "change_type": "created|modified|deleted|renamed", "start_line": N, "end_line": N, "is_refactor_only": true|false}]

is_refactor_only is true when the change is purely a rename, reformat, or move with no behavioral difference. Reply with [] if the hunk touches nothing worth tracking independently."#;

/// Extracts the blocks one excerpt touches. Tries the LLM first; on any
/// error, or when no profile is given, falls back to a single coarse
/// module-level block spanning the whole excerpt.
pub async fn extract(llm: Option<&LlmServiceProfiles>, excerpt: &PatchExcerpt) -> Vec<BlockCandidate> {
    if let Some(llm) = llm {
        match llm.generate_slow(&excerpt.text, Some(SYSTEM_PROMPT)).await {
            Ok(reply) => match parse_reply(&reply) {
                Some(blocks) => return blocks,
                None => debug!("block extraction reply was not valid JSON, falling back to heuristic"),
            },
            Err(err) => debug!(error = %err, "block extraction LLM call failed, falling back to heuristic"),
        }
    }
    heuristic_fallback(excerpt)
}

fn parse_reply(reply: &str) -> Option<Vec<BlockCandidate>> {
    let trimmed = reply.trim();
    let json_start = trimmed.find('[')?;
    let json_end = trimmed.rfind(']')?;
    let raw: Vec<RawBlock> = serde_json::from_str(&trimmed[json_start..=json_end]).ok()?;
    Some(raw.into_iter().map(From::from).collect())
}

impl From<RawBlock> for BlockCandidate {
    fn from(r: RawBlock) -> Self {
        BlockCandidate {
            name: r.block_name,
            kind: block_kind_from_str(&r.block_type),
            change_type: change_type_from_str(&r.change_type),
            start_line: r.start_line,
            end_line: r.end_line.max(r.start_line),
            is_refactor_only: r.is_refactor_only,
        }
    }
}

fn block_kind_from_str(s: &str) -> BlockKind {
    match s {
        "function" => BlockKind::Function,
        "method" => BlockKind::Method,
        "type" => BlockKind::Type,
        _ => BlockKind::Module,
    }
}

fn change_type_from_str(s: &str) -> ChangeType {
    match s {
        "created" => ChangeType::Created,
        "deleted" => ChangeType::Deleted,
        "renamed" => ChangeType::Renamed,
        _ => ChangeType::Modified,
    }
}

/// One module-level block covering the excerpt's whole line span, change
/// type inferred from whether it's only additions, only removals, or
/// both. Never worse than dropping the excerpt outright.
fn heuristic_fallback(excerpt: &PatchExcerpt) -> Vec<BlockCandidate> {
    let mut start_line = None;
    let mut end_line = None;
    let mut has_additions = false;
    let mut has_removals = false;

    for (i, raw) in excerpt.text.lines().enumerate() {
        let line_no = i as u32 + 1;
        if let Some(rest) = raw.strip_prefix('+') {
            has_additions = true;
            let _ = rest;
        } else if raw.starts_with('-') {
            has_removals = true;
        } else {
            continue;
        }
        start_line.get_or_insert(line_no);
        end_line = Some(line_no);
    }

    let (Some(start_line), Some(end_line)) = (start_line, end_line) else {
        return Vec::new();
    };

    let change_type = match (has_additions, has_removals) {
        (true, false) => ChangeType::Created,
        (false, true) => ChangeType::Deleted,
        _ => ChangeType::Modified,
    };

    vec![BlockCandidate {
        name: excerpt.path.clone(),
        kind: BlockKind::Module,
        change_type,
        start_line,
        end_line,
        is_refactor_only: false,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excerpt(text: &str) -> PatchExcerpt {
        PatchExcerpt { path: "src/lib.rs".to_string(), text: text.to_string() }
    }

    #[test]
    fn parses_a_well_formed_llm_reply() {
        let reply = r#"[{"block_name": "parse", "block_type": "function", "change_type": "modified", "start_line": 10, "end_line": 20, "is_refactor_only": false}]"#;
        let blocks = parse_reply(reply).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "parse");
        assert_eq!(blocks[0].kind, BlockKind::Function);
    }

    #[test]
    fn tolerates_a_reply_wrapped_in_prose() {
        let reply = "Here is the result:\n[{\"block_name\": \"x\", \"block_type\": \"type\", \"change_type\": \"created\", \"start_line\": 1, \"end_line\": 2, \"is_refactor_only\": false}]\nThanks!";
        let blocks = parse_reply(reply).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Type);
    }

    #[tokio::test]
    async fn heuristic_fallback_produces_one_module_block() {
        let e = excerpt("@@ -1,1 +1,2 @@\n+fn a() {}\n+fn b() {}");
        let blocks = extract(None, &e).await;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Module);
        assert_eq!(blocks[0].change_type, ChangeType::Created);
    }

    #[tokio::test]
    async fn heuristic_fallback_on_pure_deletion() {
        let e = excerpt("@@ -1,2 +1,0 @@\n-fn a() {}\n-fn b() {}");
        let blocks = extract(None, &e).await;
        assert_eq!(blocks[0].change_type, ChangeType::Deleted);
    }
}
