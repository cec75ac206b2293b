//! The Grapher: assigns every staged commit's place in the repo's
//! topological order (`topo`), resolves issue/PR-to-commit links from the
//! staging tables, and triggers the full entity-graph projection. Link resolution writes `github_issue_pr_links`/
//! `github_issue_no_links`; the structural node/edge projection —
//! `CREATED` vs `MODIFIED` by first touch in topological order, developer
//! identity collapse by normalised email — lives in `graph-store`'s own
//! rebuild, which this crate invokes once commit ordering and link
//! resolution both have something to read.

pub mod comment;
pub mod crossref;
pub mod errors;
pub mod explicit;
pub mod merge_commit;
pub mod report;
pub mod resolve;
pub mod semantic;
pub mod temporal;
pub mod topo;

pub use errors::{GrapherError, Result};
pub use report::GrapherReport;

use ai_llm_service::LlmServiceProfiles;
use graph_store::GraphStore;
use relational_store::Pool;
use tracing::{info, instrument};
use uuid::Uuid;

/// Orders `repo_id`'s staged commits, resolves links, and rebuilds the
/// entity graph from scratch. Ordering runs first since both link
/// resolution's merge-commit pass and the structural rebuild's
/// CREATED/MODIFIED distinction depend on `topological_index` being set.
/// Link-resolution failures never abort the run; only the
/// relational writes that back each pattern can fail, and those surface
/// as an error from `resolve::run` itself rather than being silently
/// swallowed mid-pattern.
#[instrument(skip(pool, store, llm))]
pub async fn graph(
    pool: &Pool,
    store: &mut GraphStore,
    repo_id: Uuid,
    llm: Option<&LlmServiceProfiles>,
) -> Result<GrapherReport> {
    let commits_ordered = topo::assign(pool, repo_id).await?;
    let mut report = resolve::run(pool, repo_id, llm).await?;
    report.commits_ordered = commits_ordered as u64;
    graph_store::build::rebuild_full(store, pool, repo_id).await?;

    info!(?report, "grapher run complete");
    Ok(report)
}
