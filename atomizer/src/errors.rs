use thiserror::Error;

pub type Result<T> = std::result::Result<T, AtomizerError>;

#[derive(Debug, Error)]
pub enum AtomizerError {
    #[error(transparent)]
    Store(#[from] relational_store::StoreError),

    #[error(transparent)]
    Resilience(#[from] resilience::ResilienceError),

    #[error(transparent)]
    Llm(#[from] ai_llm_service::AiLlmError),

    #[error(transparent)]
    RepoCache(#[from] repo_cache::RepoCacheError),

    #[error("commit batch is not strictly ordered by topological_index: {0:?}")]
    OutOfOrder(resilience::topo::OutOfOrderCommit),
}
