//! Deterministic identifiers shared across the pipeline.
//!
//! - UUIDv5 (namespace/name-based) so the same logical entity always gets
//!   the same id across repeated runs, independent of insertion order.
//! - A SHA-256 content hash for fingerprinting (force-push detection,
//!   patch-chunk dedup).

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Root namespace for every id minted by this pipeline. Keeping a single
/// namespace (rather than `Uuid::nil()`) means ids from this system never
/// collide with UUIDv5s minted by an unrelated tool using the same name.
pub const NAMESPACE: Uuid = Uuid::from_bytes([
    0x6a, 0x1e, 0xc1, 0x0d, 0x3b, 0x44, 0x4a, 0x2f, 0x9e, 0x77, 0x2c, 0x6f, 0x8a, 0x11, 0x00, 0x01,
]);

/// Deterministic UUIDv5 from an arbitrary logical key.
#[inline]
pub fn uuid_v5_from_key(key: &str) -> Uuid {
    Uuid::new_v5(&NAMESPACE, key.as_bytes())
}

/// Stable commit id: repo + sha.
pub fn commit_id(repo_id: Uuid, sha: &str) -> Uuid {
    uuid_v5_from_key(&format!("commit|{repo_id}|{sha}"))
}

/// Stable file-identity id: repo + canonical path.
pub fn file_id(repo_id: Uuid, canonical_path: &str) -> Uuid {
    uuid_v5_from_key(&format!("file|{repo_id}|{canonical_path}"))
}

/// Stable code-block id: repo + canonical path + block name.
///
/// Deliberately excludes `block_type`/line range so that a block keeps its
/// identity across modifications (the whole point of `code_blocks` being
/// `(repo_id, canonical_file_path, block_name)`-unique).
pub fn code_block_id(repo_id: Uuid, canonical_path: &str, block_name: &str) -> Uuid {
    uuid_v5_from_key(&format!("block|{repo_id}|{canonical_path}|{block_name}"))
}

/// Stable block-change id: the block plus the commit that produced the change.
pub fn block_change_id(block_id: Uuid, commit_id: Uuid) -> Uuid {
    uuid_v5_from_key(&format!("change|{block_id}|{commit_id}"))
}

/// Stable link id: issue plus the commit or PR it is linked to.
pub fn link_id(issue_id: Uuid, target_id: Uuid) -> Uuid {
    uuid_v5_from_key(&format!("link|{issue_id}|{target_id}"))
}

/// Stable DLQ-entry id: repo + stage + entity kind + entity id. The same
/// failing unit of work always maps back to the same row, so a repeat
/// failure escalates the existing entry's attempt counter instead of
/// inserting a fresh `attempt = 1` row next to it.
pub fn dlq_entry_id(repo_id: Uuid, stage: &str, entity_kind: &str, entity_id: Uuid) -> Uuid {
    uuid_v5_from_key(&format!("dlq|{repo_id}|{stage}|{entity_kind}|{entity_id}"))
}

/// SHA-256 content hash as lowercase hex, used for patch/chunk fingerprints
/// and the force-push `{parent_sha -> child_sha}` fingerprint.
pub fn hash_content(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_id_is_deterministic() {
        let repo = Uuid::new_v4();
        let a = commit_id(repo, "abc123");
        let b = commit_id(repo, "abc123");
        assert_eq!(a, b);
    }

    #[test]
    fn commit_id_differs_by_repo() {
        let sha = "abc123";
        let a = commit_id(Uuid::new_v4(), sha);
        let b = commit_id(Uuid::new_v4(), sha);
        assert_ne!(a, b);
    }

    #[test]
    fn code_block_id_ignores_line_range() {
        let repo = Uuid::new_v4();
        let a = code_block_id(repo, "src/lib.rs", "parse");
        let b = code_block_id(repo, "src/lib.rs", "parse");
        assert_eq!(a, b);
    }

    #[test]
    fn hash_content_is_stable() {
        assert_eq!(hash_content(b"hello"), hash_content(b"hello"));
        assert_ne!(hash_content(b"hello"), hash_content(b"world"));
    }

    #[test]
    fn dlq_entry_id_is_stable_per_entity() {
        let repo = Uuid::new_v4();
        let entity = Uuid::new_v4();
        let a = dlq_entry_id(repo, "atomizer", "commit", entity);
        let b = dlq_entry_id(repo, "atomizer", "commit", entity);
        assert_eq!(a, b);
    }

    #[test]
    fn dlq_entry_id_differs_by_stage() {
        let repo = Uuid::new_v4();
        let entity = Uuid::new_v4();
        let a = dlq_entry_id(repo, "atomizer", "commit", entity);
        let b = dlq_entry_id(repo, "grapher", "commit", entity);
        assert_ne!(a, b);
    }
}
