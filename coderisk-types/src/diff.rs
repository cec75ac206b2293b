//! Provider-agnostic unified-diff model, shared by `scm-client` (which
//! produces it) and `atomizer` (which chunks and parses it).

use serde::{Deserialize, Serialize};

/// One changed line inside a diff hunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiffLine {
    Added { new_line: u32, content: String },
    Removed { old_line: u32, content: String },
    Context { old_line: u32, new_line: u32, content: String },
}

/// A diff hunk (one `@@ -a,b +c,d @@` block).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// Byte length of the hunk's rendered text, used by the >100 KB /
    /// ~25K-token chunking rule.
    pub fn approx_byte_len(&self) -> usize {
        self.lines
            .iter()
            .map(|l| match l {
                DiffLine::Added { content, .. }
                | DiffLine::Removed { content, .. }
                | DiffLine::Context { content, .. } => content.len() + 1,
            })
            .sum()
    }
}

/// A single file's patch within a commit, stored verbatim as a structured
/// blob so downstream atomisation never re-fetches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_renamed: bool,
    pub is_binary: bool,
    pub hunks: Vec<DiffHunk>,
    /// Raw provider unified-diff text, kept for re-chunking and debugging.
    pub raw_unidiff: Option<String>,
}

impl FilePatch {
    pub fn approx_byte_len(&self) -> usize {
        self.raw_unidiff
            .as_ref()
            .map(|s| s.len())
            .unwrap_or_else(|| self.hunks.iter().map(DiffHunk::approx_byte_len).sum())
    }

    /// The path a block should be attributed to after this patch is applied.
    pub fn effective_path(&self) -> Option<&str> {
        self.new_path.as_deref().or(self.old_path.as_deref())
    }
}
