use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical path plus every historical path a file has had, filled by
/// following renames through git history (`repo-cache`'s `git log --follow`).
///
/// Invariant: every code block's canonical path equals the current
/// identity's canonical path; historical paths are never lost, only
/// appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub repo_id: Uuid,
    pub canonical_path: String,
    pub historical_paths: Vec<String>,
}

impl FileIdentity {
    pub fn new(repo_id: Uuid, canonical_path: impl Into<String>) -> Self {
        Self {
            repo_id,
            canonical_path: canonical_path.into(),
            historical_paths: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        crate::ids::file_id(self.repo_id, &self.canonical_path)
    }

    /// Atomically applies a rename: the prior canonical path is archived
    /// into `historical_paths` (deduplicated) and the new path becomes
    /// canonical.
    pub fn rename_to(&mut self, new_canonical_path: impl Into<String>) {
        let old = std::mem::replace(&mut self.canonical_path, new_canonical_path.into());
        if old != self.canonical_path && !self.historical_paths.contains(&old) {
            self.historical_paths.push(old);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_preserves_prior_path() {
        let repo = Uuid::new_v4();
        let mut f = FileIdentity::new(repo, "TableEditor.tsx");
        f.rename_to("tables/Editor.tsx");
        assert_eq!(f.canonical_path, "tables/Editor.tsx");
        assert_eq!(f.historical_paths, vec!["TableEditor.tsx".to_string()]);
    }

    #[test]
    fn rename_chain_keeps_every_prior_path() {
        let repo = Uuid::new_v4();
        let mut f = FileIdentity::new(repo, "a.rs");
        f.rename_to("b.rs");
        f.rename_to("c.rs");
        assert_eq!(f.canonical_path, "c.rs");
        assert_eq!(
            f.historical_paths,
            vec!["a.rs".to_string(), "b.rs".to_string()]
        );
    }
}
