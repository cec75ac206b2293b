//! Thinnest possible operator entry point: loads `.env`, builds a
//! `PipelineState` from environment, dispatches one positional operation
//! against one repo id. Not the `crisk`/`crisk-sync` CLI surface described
//! elsewhere — this binary exists so the pipeline can be exercised without
//! standing up a server.

use std::env;
use std::error::Error;
use std::path::PathBuf;

use ai_llm_service::config::default_config::{
    config_ollama_embedding, config_ollama_fast, config_ollama_slow,
};
use ai_llm_service::LlmServiceProfiles;
use atomizer::RepoCacheConfig;
use coderisk_types::ProviderKind;
use graph_store::GraphStore;
use pipeline::{PipelineState, SyncMode};
use scm_client::{ProviderClient, ProviderConfig, RepoRef};
use uuid::Uuid;

fn provider_kind(raw: &str) -> ProviderKind {
    match raw.to_lowercase().as_str() {
        "gitlab" => ProviderKind::GitLab,
        "bitbucket" => ProviderKind::Bitbucket,
        _ => ProviderKind::GitHub,
    }
}

async fn build_state() -> Result<PipelineState, Box<dyn Error>> {
    let database_url = env::var("DATABASE_URL")?;
    let pool = relational_store::connect(&database_url, 10).await?;

    let graph_store_path = env::var("GRAPH_STORE_PATH").unwrap_or_else(|_| "./data/graph".into());
    let store = GraphStore::open(&graph_store_path)?;

    let provider = ProviderClient::from_config(ProviderConfig {
        kind: provider_kind(&env::var("SCM_PROVIDER_KIND").unwrap_or_else(|_| "github".into())),
        base_api: env::var("SCM_BASE_API")?,
        token: env::var("SCM_TOKEN")?,
    })?;

    let llm = match (config_ollama_fast(), config_ollama_embedding()) {
        (Ok(fast), Ok(embedding)) => {
            let slow = config_ollama_slow().ok();
            Some(LlmServiceProfiles::new(fast, slow, embedding, None)?)
        }
        _ => None,
    };

    let repo_cache = match (env::var("REPO_CACHE_DIR"), env::var("SCM_CLONE_URL")) {
        (Ok(base_dir), Ok(clone_url)) => {
            Some(RepoCacheConfig { base_dir: PathBuf::from(base_dir), clone_url })
        }
        _ => None,
    };

    Ok(PipelineState::new(pool, store, provider, llm, repo_cache))
}

fn parse_mode(raw: Option<&String>) -> SyncMode {
    match raw.map(String::as_str) {
        Some("full") => SyncMode::Full,
        Some("validate-only") => SyncMode::ValidateOnly,
        _ => SyncMode::Incremental,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let operation = args.get(1).cloned().unwrap_or_else(|| "sync".into());
    let repo_id: Uuid = args
        .get(2)
        .ok_or("usage: coderisk <stage|graph|atomize|index|sync> <repo_id> [project] [window_days|mode]")?
        .parse()?;

    let mut state = build_state().await?;

    match operation.as_str() {
        "stage" => {
            let project = args.get(3).ok_or("stage requires a <project> argument")?;
            let window_days: i64 = args.get(4).map(|s| s.parse()).transpose()?.unwrap_or(30);
            let report =
                pipeline::stage(&state, repo_id, &RepoRef::new(project.clone()), window_days).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "graph" => {
            let report = pipeline::graph(&mut state, repo_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "atomize" => {
            let report = pipeline::atomize(&state, repo_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "index" => {
            let report = pipeline::index(&mut state, repo_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "sync" => {
            let project = args.get(3).ok_or("sync requires a <project> argument")?;
            let mode = parse_mode(args.get(4));
            let window_days: i64 = args.get(5).map(|s| s.parse()).transpose()?.unwrap_or(30);
            let report =
                pipeline::sync(&mut state, repo_id, &RepoRef::new(project.clone()), mode, window_days)
                    .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => return Err(format!("unknown operation: {other}").into()),
    }

    Ok(())
}
