//! Crate-wide error type aggregating every stage's own error enum via
//! `#[from]`, the way each stage crate aggregates its own dependencies.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] relational_store::StoreError),

    #[error(transparent)]
    Graph(#[from] graph_store::errors::GraphStoreError),

    #[error(transparent)]
    Resilience(#[from] resilience::ResilienceError),

    #[error(transparent)]
    Scm(#[from] scm_client::ScmError),

    #[error(transparent)]
    Stager(#[from] stager::StagerError),

    #[error(transparent)]
    Grapher(#[from] grapher::GrapherError),

    #[error(transparent)]
    Atomizer(#[from] atomizer::AtomizerError),

    #[error(transparent)]
    RiskIndexer(#[from] risk_indexer::RiskIndexerError),

    #[error("repository {0} is not registered")]
    UnknownRepository(uuid::Uuid),
}
