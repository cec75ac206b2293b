//! Everything a pipeline call needs, bundled once at process startup and
//! borrowed by every entry point. Mirrors the old `api` crate's
//! `AppState`, minus anything HTTP-shaped.

use ai_llm_service::LlmServiceProfiles;
use atomizer::RepoCacheConfig;
use graph_store::GraphStore;
use relational_store::Pool;
use scm_client::ProviderClient;

pub struct PipelineState {
    pub pool: Pool,
    pub store: GraphStore,
    pub provider: ProviderClient,
    pub llm: Option<LlmServiceProfiles>,
    pub repo_cache: Option<RepoCacheConfig>,
}

impl PipelineState {
    pub fn new(
        pool: Pool,
        store: GraphStore,
        provider: ProviderClient,
        llm: Option<LlmServiceProfiles>,
        repo_cache: Option<RepoCacheConfig>,
    ) -> Self {
        Self { pool, store, provider, llm, repo_cache }
    }
}
