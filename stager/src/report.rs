use serde::Serialize;

/// Summary counts returned by [`crate::stage`]. Logged as a structured record at the end of the run
/// and handed back to the caller (the `pipeline` crate's `stage` entry
/// point) verbatim.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub commits_staged: u64,
    pub issues_staged: u64,
    pub pull_requests_staged: u64,
    pub comments_staged: u64,
    pub timeline_events_staged: u64,
    pub dlq_entries: u64,
}
