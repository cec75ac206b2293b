//! Patch excerpting for Stage 2: a small patch is handed to
//! the parser whole; a patch over 100 KB (~25K tokens) is split one chunk
//! per `@@` hunk, and any hunk that is itself still large is sampled down
//! to its first 10 and last 5 lines plus a sample from the middle.

use coderisk_types::ids::hash_content;
use coderisk_types::{DiffHunk, DiffLine, FilePatch};
use repo_cache::RepoCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_WHOLE_PATCH_BYTES: usize = 100_000;
const HEAD_LINES: usize = 10;
const TAIL_LINES: usize = 5;
const MIDDLE_SAMPLE_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchExcerpt {
    pub path: String,
    pub text: String,
}

fn render_line(line: &DiffLine) -> String {
    match line {
        DiffLine::Added { content, .. } => format!("+{content}"),
        DiffLine::Removed { content, .. } => format!("-{content}"),
        DiffLine::Context { content, .. } => format!(" {content}"),
    }
}

fn hunk_header(h: &DiffHunk) -> String {
    format!("@@ -{},{} +{},{} @@", h.old_start, h.old_lines, h.new_start, h.new_lines)
}

fn render_hunk_body(h: &DiffHunk) -> Vec<String> {
    h.lines.iter().map(render_line).collect()
}

/// First/last/middle sample of a large hunk's rendered lines. A no-op
/// when the hunk is already small enough to include whole.
fn sample(lines: &[String]) -> Vec<String> {
    if lines.len() <= HEAD_LINES + TAIL_LINES + MIDDLE_SAMPLE_LINES {
        return lines.to_vec();
    }
    let mut out = Vec::with_capacity(HEAD_LINES + TAIL_LINES + MIDDLE_SAMPLE_LINES + 2);
    out.extend(lines[..HEAD_LINES].iter().cloned());
    out.push("...".to_string());
    let mid_start = (lines.len() - MIDDLE_SAMPLE_LINES) / 2;
    out.extend(lines[mid_start..mid_start + MIDDLE_SAMPLE_LINES].iter().cloned());
    out.push("...".to_string());
    out.extend(lines[lines.len() - TAIL_LINES..].iter().cloned());
    out
}

/// Builds the excerpt(s) Stage 2 sees for one file's patch. Small patches
/// come back as a single excerpt covering every hunk; patches over the
/// 100 KB threshold are split one excerpt per hunk so no single LLM call
/// has to hold the whole diff in context.
pub fn excerpts_for_patch(patch: &FilePatch) -> Vec<PatchExcerpt> {
    let path = patch.effective_path().unwrap_or_default().to_string();

    if patch.approx_byte_len() <= MAX_WHOLE_PATCH_BYTES {
        let mut lines = Vec::new();
        for hunk in &patch.hunks {
            lines.push(hunk_header(hunk));
            lines.extend(render_hunk_body(hunk));
        }
        return vec![PatchExcerpt { path, text: lines.join("\n") }];
    }

    patch
        .hunks
        .iter()
        .map(|hunk| {
            let mut lines = vec![hunk_header(hunk)];
            lines.extend(sample(&render_hunk_body(hunk)));
            PatchExcerpt { path: path.clone(), text: lines.join("\n") }
        })
        .collect()
}

/// Same as [`excerpts_for_patch`], but for oversized patches the sampled
/// result is memoized in `cache` under the patch's own content hash —
/// re-processing the same commit (a DLQ retry, a re-run after a crash)
/// skips the sampling work instead of redoing it. Small patches are never
/// worth caching, so they always go through the plain path.
pub fn cached_excerpts_for_patch(cache: Option<&RepoCache>, patch: &FilePatch) -> Vec<PatchExcerpt> {
    if patch.approx_byte_len() <= MAX_WHOLE_PATCH_BYTES {
        return excerpts_for_patch(patch);
    }

    let Some(cache) = cache else {
        return excerpts_for_patch(patch);
    };

    let raw = match &patch.raw_unidiff {
        Some(raw) => raw.as_bytes().to_vec(),
        None => return excerpts_for_patch(patch),
    };
    let digest = hash_content(&raw);

    if let Ok(Some(cached)) = cache.get_derived(&digest) {
        if let Ok(excerpts) = serde_json::from_slice::<Vec<PatchExcerpt>>(&cached) {
            debug!(digest, "reusing cached patch excerpts");
            return excerpts;
        }
    }

    let excerpts = excerpts_for_patch(patch);
    if let Ok(serialized) = serde_json::to_vec(&excerpts) {
        let _ = cache.put_derived(&digest, &serialized);
    }
    excerpts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u32, content: &str) -> DiffLine {
        DiffLine::Added { new_line: n, content: content.to_string() }
    }

    fn small_patch() -> FilePatch {
        FilePatch {
            old_path: Some("a.rs".into()),
            new_path: Some("a.rs".into()),
            is_new: false,
            is_deleted: false,
            is_renamed: false,
            is_binary: false,
            hunks: vec![DiffHunk {
                old_start: 1,
                old_lines: 1,
                new_start: 1,
                new_lines: 2,
                lines: vec![line(1, "fn a() {}"), line(2, "fn b() {}")],
            }],
            raw_unidiff: None,
        }
    }

    #[test]
    fn small_patch_becomes_one_excerpt_covering_all_hunks() {
        let excerpts = excerpts_for_patch(&small_patch());
        assert_eq!(excerpts.len(), 1);
        assert!(excerpts[0].text.contains("fn a() {}"));
        assert!(excerpts[0].text.contains("@@"));
    }

    #[test]
    fn oversized_patch_yields_one_excerpt_per_hunk() {
        let big_content = "x".repeat(200);
        let hunks: Vec<DiffHunk> = (0..5)
            .map(|i| DiffHunk {
                old_start: i,
                old_lines: 1000,
                new_start: i,
                new_lines: 1000,
                lines: (0..1000).map(|n| line(n, &big_content)).collect(),
            })
            .collect();
        let patch = FilePatch {
            old_path: Some("big.rs".into()),
            new_path: Some("big.rs".into()),
            is_new: false,
            is_deleted: false,
            is_renamed: false,
            is_binary: false,
            hunks,
            raw_unidiff: None,
        };
        assert!(patch.approx_byte_len() > MAX_WHOLE_PATCH_BYTES);
        let excerpts = excerpts_for_patch(&patch);
        assert_eq!(excerpts.len(), 5);
        for e in &excerpts {
            assert!(e.text.lines().count() < 1000);
        }
    }

    #[test]
    fn sample_is_a_no_op_under_the_threshold() {
        let lines: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(sample(&lines), lines);
    }

    fn oversized_patch_with_raw(raw: &str) -> FilePatch {
        let big_content = "x".repeat(200);
        let hunks: Vec<DiffHunk> = (0..5)
            .map(|i| DiffHunk {
                old_start: i,
                old_lines: 1000,
                new_start: i,
                new_lines: 1000,
                lines: (0..1000).map(|n| line(n, &big_content)).collect(),
            })
            .collect();
        FilePatch {
            old_path: Some("big.rs".into()),
            new_path: Some("big.rs".into()),
            is_new: false,
            is_deleted: false,
            is_renamed: false,
            is_binary: false,
            hunks,
            raw_unidiff: Some(raw.to_string()),
        }
    }

    #[test]
    fn second_call_on_same_patch_reuses_the_cached_excerpts() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RepoCache::open(dir.path()).unwrap();
        let patch = oversized_patch_with_raw("@@ -0,1000 +0,1000 @@ repeated five times");

        let first = cached_excerpts_for_patch(Some(&cache), &patch);
        let second = cached_excerpts_for_patch(Some(&cache), &patch);
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn no_cache_falls_back_to_the_plain_path() {
        let patch = oversized_patch_with_raw("@@ whatever @@");
        let excerpts = cached_excerpts_for_patch(None, &patch);
        assert_eq!(excerpts.len(), 5);
    }
}
