//! Environment-driven configuration for LLM provider clients.

pub mod default_config;
pub mod llm_model_config;
pub mod llm_provider;
