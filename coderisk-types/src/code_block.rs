use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse-grained kind the Atomizer assigns a block. Deliberately smaller
/// than a full per-language symbol table: function/method, type, and a catch-all module-level
/// block for everything else worth tracking independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Function,
    Method,
    Type,
    Module,
}

/// A named, independently-trackable unit of code within a file. Identity
/// deliberately excludes line range (`ids::code_block_id`) so a block keeps
/// its id as it moves within a file across edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub repo_id: Uuid,
    pub canonical_path: String,
    pub name: String,
    pub kind: BlockKind,
    pub start_line: u32,
    pub end_line: u32,
    /// Confidence the Atomizer's fuzzy-resolution step assigned when it
    /// matched this change to an existing block rather than minting a new
    /// one. `1.0` for blocks created directly from a fresh top-level parse.
    pub resolution_confidence: f32,
}

impl CodeBlock {
    pub fn id(&self) -> Uuid {
        crate::ids::code_block_id(self.repo_id, &self.canonical_path, &self.name)
    }
}
