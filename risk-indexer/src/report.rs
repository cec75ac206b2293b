use serde::Serialize;

/// Summary counts returned by [`crate::index`] (mirrors `StageReport`/
/// `GrapherReport`'s "always report what happened" shape).
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub blocks_considered: u64,
    pub blocks_indexed: u64,
    pub incidents_recorded: u64,
    pub coupling_pairs_retained: u64,
}
