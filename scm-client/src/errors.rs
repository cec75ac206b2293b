//! Crate-wide error hierarchy for scm-client.

use thiserror::Error;

pub type ScmResult<T> = Result<T, ScmError>;

#[derive(Debug, Error)]
pub enum ScmError {
    #[error(transparent)]
    Provider(#[from] ScmProviderError),

    #[error(transparent)]
    DiffParse(#[from] ScmDiffParseError),

    #[error(transparent)]
    Config(#[from] ScmConfigError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Provider-specific error used inside the provider layer.
#[derive(Debug, Error)]
pub enum ScmProviderError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429). `retry_after_secs` is read from the
    /// provider's `Retry-After` header when present; callers retrying
    /// against this error should honor it rather than use their own
    /// default backoff step.
    #[error("rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("server error: status {0}")]
    Server(u16),

    #[error("http status error: status {0}")]
    HttpStatus(u16),

    #[error("timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("unsupported provider operation")]
    Unsupported,
}

impl ScmProviderError {
    /// Whether a retry (after backoff) has any chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScmProviderError::RateLimited { .. }
                | ScmProviderError::Server(_)
                | ScmProviderError::Timeout
                | ScmProviderError::Network(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ScmDiffParseError {
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("integer overflow")]
    Overflow,
}

#[derive(Debug, Error)]
pub enum ScmConfigError {
    #[error("missing provider token")]
    MissingToken,

    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

impl From<reqwest::Error> for ScmError {
    fn from(e: reqwest::Error) -> Self {
        ScmError::Provider(ScmProviderError::from(e))
    }
}

impl From<reqwest::Error> for ScmProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ScmProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => ScmProviderError::Unauthorized,
                403 => ScmProviderError::Forbidden,
                404 => ScmProviderError::NotFound,
                429 => ScmProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => ScmProviderError::Server(code),
                _ => ScmProviderError::HttpStatus(code),
            };
        }

        ScmProviderError::Network(e.to_string())
    }
}
