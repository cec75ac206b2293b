use serde::Serialize;

/// Per-pattern counts the Grapher always reports, win or lose.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GrapherReport {
    /// Commits given a fresh `topological_index` this run, by `topo::assign`.
    pub commits_ordered: u64,
    pub explicit_matches: u64,
    pub temporal_matches: u64,
    pub comment_matches: u64,
    pub semantic_boosts: u64,
    pub semantic_rejections: u64,
    pub crossref_matches: u64,
    pub merge_commit_matches: u64,
    pub links_written: u64,
    pub orphans_recorded: u64,
}
