//! The Risk Indexer: three passes (incident, ownership, coupling) over
//! every active code block, folded into a composite `risk_score` and
//! persisted to both stores.
//!
//! Each pass is idempotent (upsert keyed on block id), so a partial
//! failure simply restarts the affected pass from the last watermark on
//! the next `index` call rather than needing its own resumability
//! bookkeeping.

pub mod coupling;
pub mod errors;
pub mod incident;
pub mod ownership;
pub mod report;

pub use errors::{Result, RiskIndexerError};
pub use report::IndexReport;

use chrono::{Duration, Utc};
use coderisk_types::RiskIndex;
use graph_store::GraphStore;
use relational_store::{code_blocks, risk, Pool};
use tracing::{info, instrument};
use uuid::Uuid;

/// Coupling is computed over a windowed subset of commits so a block's
/// partner list stays bounded.
const DEFAULT_COUPLING_WINDOW_DAYS: i64 = 90;

/// Runs all three passes for every active block in `repo_id`, persists the
/// composite `RiskIndex` to the relational store, then rebuilds the graph
/// projection so `CO_CHANGES_WITH` edges reflect the freshly-computed
/// coupling partners.
#[instrument(skip(pool, store))]
pub async fn index(pool: &Pool, store: &mut GraphStore, repo_id: Uuid) -> Result<IndexReport> {
    let blocks = code_blocks::all_active_blocks(pool, repo_id).await?;

    let window_end = Utc::now();
    let window_start = window_end - Duration::days(DEFAULT_COUPLING_WINDOW_DAYS);
    let commit_block_map = coupling::commit_block_map(pool, repo_id, window_start).await?;

    let mut report = IndexReport {
        blocks_considered: blocks.len() as u64,
        ..Default::default()
    };

    for (block_id, _block) in &blocks {
        let block_id = *block_id;

        let (incident_count, incidents_this_run) = incident::compute(pool, repo_id, block_id).await?;
        let (familiarity_map, staleness_days) = ownership::compute(pool, repo_id, block_id).await?;
        let bus_factor = RiskIndex::compute_bus_factor(&familiarity_map);
        let coupling = coupling::compute_for_block(
            pool,
            repo_id,
            block_id,
            &commit_block_map,
            window_start,
            window_end,
        )
        .await?;

        let risk_score =
            RiskIndex::compute_score(incident_count, staleness_days, &coupling, bus_factor);

        let index = RiskIndex {
            block_id,
            incident_count,
            staleness_days,
            familiarity_map,
            bus_factor,
            coupling: coupling.clone(),
            risk_score,
            computed_at: Utc::now(),
        };
        risk::upsert_risk_score(pool, repo_id, &index).await?;

        report.blocks_indexed += 1;
        report.incidents_recorded += incidents_this_run;
        report.coupling_pairs_retained += coupling.len() as u64;
    }

    graph_store::build::rebuild_full(store, pool, repo_id).await?;

    info!(?report, "risk index run complete");
    Ok(report)
}
