//! Local key-value cache backed by `sled`, used for two things:
//!   * memoizing rename-chain resolutions so re-runs don't re-walk history
//!   * a content-addressed blob store for oversized diffs

use std::path::Path;

use coderisk_types::ids::hash_content;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedRenameChain {
    pub historical_paths: Vec<String>,
    pub resolved_at_head: String,
}

pub struct RepoCache {
    db: sled::Db,
}

impl RepoCache {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }

    fn rename_key(repo_id: Uuid, canonical_path: &str) -> Vec<u8> {
        format!("rename|{}|{}", repo_id, canonical_path).into_bytes()
    }

    pub fn get_rename_chain(
        &self,
        repo_id: Uuid,
        canonical_path: &str,
    ) -> Result<Option<CachedRenameChain>> {
        let key = Self::rename_key(repo_id, canonical_path);
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_rename_chain(
        &self,
        repo_id: Uuid,
        canonical_path: &str,
        entry: &CachedRenameChain,
    ) -> Result<()> {
        let key = Self::rename_key(repo_id, canonical_path);
        let value = serde_json::to_vec(entry)?;
        self.db.insert(key, value)?;
        Ok(())
    }

    /// Invalidates a cached rename chain, e.g. when a force-push
    /// fingerprint changes and history can no longer be trusted.
    pub fn invalidate_rename_chain(&self, repo_id: Uuid, canonical_path: &str) -> Result<()> {
        self.db.remove(Self::rename_key(repo_id, canonical_path))?;
        Ok(())
    }

    fn diff_blob_key(content: &[u8]) -> Vec<u8> {
        format!("diffblob|{}", hash_content(content)).into_bytes()
    }

    /// Stores an oversized diff blob keyed by its own content hash, so the
    /// Atomizer's chunker can re-fetch a chunk by digest instead of by
    /// re-slicing the commit's full patch every retry.
    pub fn put_diff_blob(&self, content: &[u8]) -> Result<String> {
        let digest = hash_content(content);
        self.db.insert(Self::diff_blob_key(content), content)?;
        Ok(digest)
    }

    pub fn get_diff_blob(&self, digest: &str) -> Result<Option<Vec<u8>>> {
        let key = format!("diffblob|{}", digest).into_bytes();
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn derived_key(source_digest: &str) -> Vec<u8> {
        format!("derived|{}", source_digest).into_bytes()
    }

    /// Caches a value derived from some source content (e.g. the excerpt
    /// list `atomizer` samples out of one oversized patch), keyed by the
    /// source's own content digest rather than the derived bytes' own
    /// digest — unlike [`Self::put_diff_blob`], the caller already knows
    /// the key it wants to look the result up under later.
    pub fn put_derived(&self, source_digest: &str, bytes: &[u8]) -> Result<()> {
        self.db.insert(Self::derived_key(source_digest), bytes)?;
        Ok(())
    }

    pub fn get_derived(&self, source_digest: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(Self::derived_key(source_digest))?.map(|v| v.to_vec()))
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
