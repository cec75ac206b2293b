//! Error types and validation helpers for `ai-llm-service`.
//!
//! This module defines a focused set of configuration errors and small,
//! reusable helpers for reading/validating environment variables.
//!
//! All error messages include the suffix `[AI LLM Service]` so that logs
//! and bubbled-up errors can be easily attributed to this library.

use std::fmt;

use thiserror::Error;

use crate::services::ollama_service::OllamaError;

/// Convenient result alias for config and runtime operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error enum for environment/config-driven setup.
///
/// Keep this focused: only errors that realistically happen at config
/// load/validation time. Extend conservatively as needs arise.
///
/// All variants include `[AI LLM Service]` in their messages.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like ports, limits, timeouts).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_MAX_TOKENS`, `OLLAMA_PORT`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND`.
    #[error("[AI LLM Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `OLLAMA_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[AI LLM Service] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `temperature`).
        field: &'static str,
        /// Description of the expected range (e.g., `expected 0.0..=1.0`).
        detail: &'static str,
    },

    /// Model name was empty or invalid.
    #[error("[AI LLM Service] model name must not be empty")]
    EmptyModel,

    /// Stop sequences contained one or more empty strings.
    #[error("[AI LLM Service] stop sequences must not contain empty strings")]
    InvalidStopSequence,
}

/* ------------------------ Env helpers ------------------------ */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`ConfigError::MissingVar`] if the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a valid `u32`.
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.parse::<u32>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: name,
                    reason: "expected u32",
                })
        }
        _ => Ok(None),
    }
}

/* --------------------- Validation helpers --------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] when the string does not start
/// with a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        })
    }
}

/// Validates that a floating-point value lies within an inclusive range.
///
/// Useful for parameters like `temperature` (e.g., `0.0..=2.0`) or
/// `top_p` (`0.0..=1.0`).
///
/// # Parameters
/// - `field`: Logical field name (e.g., `"top_p"`).
/// - `value`: The value to validate.
/// - `min`: Inclusive lower bound.
/// - `max`: Inclusive upper bound.
///
/// # Errors
/// Returns [`ConfigError::OutOfRange`] if `value` is outside `[min, max]`.
pub fn validate_range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        })
    }
}

/// Ensures that a list of stop sequences is non-empty and contains no empty strings.
///
/// # Errors
/// Returns [`ConfigError::InvalidStopSequence`] if any element is an empty string.
pub fn validate_stop_sequences<S>(stops: &[S]) -> Result<()>
where
    S: AsRef<str>,
{
    if stops.iter().any(|s| s.as_ref().is_empty()) {
        Err(ConfigError::InvalidStopSequence)
    } else {
        Ok(())
    }
}

/* --------------------------- HTTP failure details --------------------------- */

/// Captured detail of a non-2xx HTTP response: status, request URL, and a
/// truncated snippet of the body (never the full payload, to keep logs and
/// error messages bounded).
#[derive(Debug, Clone)]
pub struct HttpError {
    /// HTTP status code returned by upstream.
    pub status: reqwest::StatusCode,
    /// The request URL that produced this status.
    pub url: String,
    /// Truncated response body, for diagnostics.
    pub snippet: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unexpected HTTP status {} from {}: {}",
            self.status, self.url, self.snippet
        )
    }
}

impl std::error::Error for HttpError {}

/// Truncates a response body to a short, log-friendly snippet.
pub fn make_snippet(text: &str) -> String {
    text.chars().take(240).collect()
}

/* ------------------------------ Health errors ------------------------------ */

/// Errors produced by [`crate::health_service::HealthService`]'s strict probes.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Probe reached the server but got a non-2xx response.
    #[error("[AI LLM Service] health probe failed: {0}")]
    HttpStatus(HttpError),

    /// Probe response could not be decoded or a prerequisite was missing.
    #[error("[AI LLM Service] health probe could not be evaluated: {0}")]
    Decode(String),
}

/* ----------------------------- Provider errors ----------------------------- */

/// Which backend a [`ProviderError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI (and OpenAI-compatible) API.
    OpenAI,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Ollama => write!(f, "Ollama"),
            Provider::OpenAI => write!(f, "OpenAI"),
        }
    }
}

/// The specific failure a provider client hit, independent of which
/// provider produced it.
#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    /// The config handed to a provider-specific client names a different provider.
    #[error("config names a different provider than this client")]
    InvalidProvider,

    /// Provider requires an API key and none was configured.
    #[error("missing API key")]
    MissingApiKey,

    /// Endpoint is empty or missing an `http://`/`https://` scheme.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Response body could not be decoded into the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Upstream returned a non-2xx status.
    #[error("{0}")]
    HttpStatus(HttpError),

    /// A completion response carried no usable choices.
    #[error("response contained no choices")]
    EmptyChoices,
}

/// A failure from a specific LLM provider client (Ollama, OpenAI, ...),
/// tagged with which provider raised it.
#[derive(Debug, Error)]
#[error("[AI LLM Service] {provider} error: {kind}")]
pub struct ProviderError {
    /// The provider the failing client was configured for.
    pub provider: Provider,
    /// The underlying failure.
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    /// Builds a new tagged provider error.
    pub fn new(provider: Provider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

/* ------------------------------- Top-level error ------------------------------- */

/// Unified error type surfaced by every public entry point in this crate.
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Config/env loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A health probe could not complete.
    #[error(transparent)]
    Health(#[from] HealthError),

    /// A provider-specific client call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The Ollama client failed.
    #[error(transparent)]
    Ollama(#[from] OllamaError),

    /// The underlying HTTP client could not be built or the request transport failed.
    #[error("[AI LLM Service] HTTP transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),
}
