//! Unified-diff parsing shared by every provider client.

use coderisk_types::{DiffHunk, DiffLine};

use crate::errors::{ScmDiffParseError, ScmResult};

/// Heuristic to detect whether a unified diff text represents a binary patch.
pub fn looks_like_binary_patch(diff: &str) -> bool {
    if diff.contains("GIT binary patch") {
        return true;
    }
    if diff.contains("Binary files") || (diff.contains("Files ") && diff.contains(" differ")) {
        return true;
    }
    diff.bytes().any(|b| b == 0)
}

/// Parses unified-diff text into hunks. Does not validate hunk-header
/// counters strictly, only uses them as initial line positions.
pub fn parse_unified_diff(diff: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;

    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("@@") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }

            let header = match parse_hunk_header(rest) {
                Ok(h) => h,
                Err(_) => continue,
            };

            current = Some(DiffHunk {
                old_start: header.old_start,
                old_lines: header.old_lines,
                new_start: header.new_start,
                new_lines: header.new_lines,
                lines: Vec::new(),
            });
        } else if let Some(hunk) = current.as_mut() {
            if line.starts_with('+') {
                let content = line[1..].to_string();
                let new_line = hunk
                    .lines
                    .iter()
                    .filter_map(|l| match l {
                        DiffLine::Added { new_line, .. } => Some(*new_line),
                        DiffLine::Context { new_line, .. } => Some(*new_line),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(hunk.new_start.wrapping_sub(1))
                    + 1;
                hunk.lines.push(DiffLine::Added { new_line, content });
            } else if line.starts_with('-') {
                let content = line[1..].to_string();
                let old_line = hunk
                    .lines
                    .iter()
                    .filter_map(|l| match l {
                        DiffLine::Removed { old_line, .. } => Some(*old_line),
                        DiffLine::Context { old_line, .. } => Some(*old_line),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(hunk.old_start.wrapping_sub(1))
                    + 1;
                hunk.lines.push(DiffLine::Removed { old_line, content });
            } else if line.starts_with(' ') || line.is_empty() {
                let content = if line.is_empty() {
                    String::new()
                } else {
                    line[1..].to_string()
                };

                let last_old = hunk
                    .lines
                    .iter()
                    .filter_map(|l| match l {
                        DiffLine::Removed { old_line, .. } => Some(*old_line),
                        DiffLine::Context { old_line, .. } => Some(*old_line),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(hunk.old_start.wrapping_sub(1));

                let last_new = hunk
                    .lines
                    .iter()
                    .filter_map(|l| match l {
                        DiffLine::Added { new_line, .. } => Some(*new_line),
                        DiffLine::Context { new_line, .. } => Some(*new_line),
                        _ => None,
                    })
                    .max()
                    .unwrap_or(hunk.new_start.wrapping_sub(1));

                hunk.lines.push(DiffLine::Context {
                    old_line: last_old + 1,
                    new_line: last_new + 1,
                    content,
                });
            } else {
                let h = current.take().unwrap();
                hunks.push(h);
            }
        }
    }

    if let Some(h) = current {
        hunks.push(h);
    }

    hunks
}

/// Splits a provider's single unified-diff blob (e.g. Bitbucket's or
/// GitLab's raw_diffs endpoint) into per-file chunks on `diff --git`
/// boundaries.
pub fn split_multi_file_diff(raw: &str) -> Vec<(Option<String>, Option<String>, String)> {
    let mut out = Vec::new();
    if raw.contains("\ndiff --git ") {
        for part in raw.split("\ndiff --git ").filter(|p| !p.trim().is_empty()) {
            let old_path = part
                .lines()
                .find_map(|l| l.strip_prefix("--- a/"))
                .map(|s| s.to_string());
            let new_path = part
                .lines()
                .find_map(|l| l.strip_prefix("+++ b/"))
                .map(|s| s.to_string());
            out.push((old_path, new_path, part.to_string()));
        }
    } else if !raw.trim().is_empty() {
        out.push((None, None, raw.to_string()));
    }
    out
}

struct HunkHeader {
    old_start: u32,
    old_lines: u32,
    new_start: u32,
    new_lines: u32,
}

fn parse_hunk_header(rest: &str) -> ScmResult<HunkHeader> {
    let s = rest.trim();
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(ScmDiffParseError::InvalidHunkHeader(s.to_string()).into());
    }

    let old_part = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| ScmDiffParseError::InvalidHunkHeader(s.to_string()))?;
    let new_part = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| ScmDiffParseError::InvalidHunkHeader(s.to_string()))?;

    let (old_start, old_lines) = split_range(old_part)?;
    let (new_start, new_lines) = split_range(new_part)?;

    Ok(HunkHeader {
        old_start,
        old_lines,
        new_start,
        new_lines,
    })
}

fn split_range(s: &str) -> ScmResult<(u32, u32)> {
    let mut it = s.split(',');
    let start = it
        .next()
        .ok_or_else(|| ScmDiffParseError::InvalidHunkHeader(s.to_string()))?;
    let len = it.next().unwrap_or("0");

    let start: u32 = start
        .parse()
        .map_err(|_| ScmDiffParseError::InvalidHunkHeader(s.to_string()))?;
    let len: u32 = len
        .parse()
        .map_err(|_| ScmDiffParseError::InvalidHunkHeader(s.to_string()))?;

    Ok((start, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_hunk() {
        let diff = "@@ -1,2 +1,3 @@\n context\n-old\n+new\n+added\n";
        let hunks = parse_unified_diff(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].lines.len(), 4);
    }

    #[test]
    fn detects_binary_marker() {
        assert!(looks_like_binary_patch("GIT binary patch\nliteral 0\n"));
        assert!(!looks_like_binary_patch("@@ -1 +1 @@\n-a\n+b\n"));
    }
}
