use serde::Serialize;

/// Summary counts returned by [`crate::atomize`], matching the "always
/// report what happened" shape used by `StageReport`/`GrapherReport`/
/// `IndexReport`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AtomizeReport {
    pub commits_considered: u64,
    pub commits_atomized: u64,
    pub blocks_created: u64,
    pub blocks_modified: u64,
    pub blocks_deleted: u64,
    pub blocks_renamed: u64,
    pub refactor_only_changes: u64,
    pub dlq_entries: u64,
    /// Entries in the DLQ, at this stage, whose backoff window has
    /// already elapsed — ready to be retried on the next run.
    pub dlq_retries_due: u64,
    pub force_push_detected: bool,
}
