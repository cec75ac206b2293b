//! Crate-wide error type for the Risk Indexer.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RiskIndexerError>;

#[derive(Debug, Error)]
pub enum RiskIndexerError {
    #[error(transparent)]
    Store(#[from] relational_store::StoreError),

    #[error(transparent)]
    Graph(#[from] graph_store::GraphStoreError),

    #[error(transparent)]
    Resilience(#[from] resilience::ResilienceError),
}
