//! Shared LLM service: provider clients (Ollama/OpenAI), unified errors,
//! health checks, and fast/slow/embedding profiles.
//!
//! Construct a [`LlmServiceProfiles`] once, wrap it in `Arc`, and pass
//! clones to every dependent that needs text generation or embeddings.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use error_handler::AiLlmError;
pub use health_service::{HealthService, HealthStatus};
pub use service_profiles::LlmServiceProfiles;
