use serde::Serialize;

use atomizer::AtomizeReport;
use graph_store::consistency::ConsistencyReport;
use grapher::GrapherReport;
use resilience::consistency::ValidationExit;
use risk_indexer::IndexReport;
use stager::StageReport;

/// What `sync` should do: `sync(repo_id, mode ∈ {incremental, full,
/// validate-only})`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Stage, then graph/atomize/index, respecting every stage's existing
    /// watermark — the default, and the cheap path since every stage is
    /// already `processed_at`-driven.
    Incremental,
    /// Same sequence, but first clears the atomizer watermark so every
    /// commit in the window is re-atomized regardless of
    /// `atomized_at` (the same reset the force-push detector performs
    /// automatically; `Full` lets an operator force it by hand).
    Full,
    /// No writes at all; compares the relational store against the graph
    /// projection and reports the result.
    ValidateOnly,
}

/// Everything a `sync` call did, bundled so a caller gets one report
/// instead of four and has to stitch them together itself.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub stage: Option<StageReport>,
    pub graph: Option<GrapherReport>,
    pub atomize: Option<AtomizeReport>,
    pub index: Option<IndexReport>,
    /// Codebase Linking Quality Score: the share of evidence the Grapher
    /// attached to a real link rather than leaving as an orphan, read
    /// straight off `GrapherReport` — `None` until a `graph` stage has run.
    pub clqs: Option<f64>,
    #[serde(skip)]
    pub validation: Option<(ConsistencyReport, ValidationExit)>,
}

/// `links_written / (links_written + orphans_recorded)`. `None` when the
/// Grapher recorded nothing at all (nothing to score yet), not when the
/// score is zero.
pub fn codebase_linking_quality_score(report: &GrapherReport) -> Option<f64> {
    let total = report.links_written + report.orphans_recorded;
    if total == 0 {
        return None;
    }
    Some(report.links_written as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_none_when_grapher_recorded_nothing() {
        let report = GrapherReport::default();
        assert_eq!(codebase_linking_quality_score(&report), None);
    }

    #[test]
    fn score_is_the_written_share_of_total_evidence() {
        let report = GrapherReport { links_written: 3, orphans_recorded: 1, ..Default::default() };
        assert_eq!(codebase_linking_quality_score(&report), Some(0.75));
    }

    #[test]
    fn all_orphans_scores_zero_not_none() {
        let report = GrapherReport { links_written: 0, orphans_recorded: 5, ..Default::default() };
        assert_eq!(codebase_linking_quality_score(&report), Some(0.0));
    }
}
