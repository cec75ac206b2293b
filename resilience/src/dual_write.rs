//! The dual-store write protocol every stage after the Stager follows
//!: the relational store is authoritative and must succeed,
//! or the whole unit of work fails; the graph projection is best-effort —
//! its failure is logged and swallowed, because `graph_store::build::
//! rebuild_full` can always recover it later from the relational store.

use std::future::Future;

use tracing::warn;

/// Runs `relational_write`; only if it succeeds, runs `graph_write` and
/// downgrades any error from the latter to a warning rather than
/// propagating it.
pub async fn relational_first<R, RFut, GFut, E>(
    relational_write: impl FnOnce() -> RFut,
    graph_write: impl FnOnce() -> GFut,
) -> Result<R, E>
where
    RFut: Future<Output = Result<R, E>>,
    GFut: Future<Output = Result<(), graph_store::errors::GraphStoreError>>,
{
    let result = relational_write().await?;

    if let Err(e) = graph_write().await {
        warn!(error = %e, "graph projection write failed, relational write stands; rebuild_full will reconcile");
    }

    Ok(result)
}
