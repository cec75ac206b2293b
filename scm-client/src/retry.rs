//! Exponential backoff for provider HTTP calls.
//!
//! Base 1s, factor 2, cap 60s, 5 attempts total. A
//! `Retry-After` header always wins over the computed step.

use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{ScmError, ScmProviderError};

const BASE: Duration = Duration::from_secs(1);
const FACTOR: u32 = 2;
const CAP: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 5;

fn step_for_attempt(attempt: u32) -> Duration {
    let multiplier = FACTOR.saturating_pow(attempt.min(16));
    (BASE * multiplier).min(CAP)
}

/// Runs `op` up to `MAX_ATTEMPTS` times, backing off between retryable
/// failures. Non-retryable errors (4xx other than 429) return immediately.
pub async fn with_backoff<T, F, Fut>(op_name: &str, mut op: F) -> Result<T, ScmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ScmError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(ScmError::Provider(provider_err)) if provider_err.is_retryable() => {
                attempt += 1;
                if attempt >= MAX_ATTEMPTS {
                    warn!(op = op_name, attempt, "exhausted retries");
                    return Err(ScmError::Provider(provider_err));
                }

                let wait = match &provider_err {
                    ScmProviderError::RateLimited {
                        retry_after_secs: Some(secs),
                    } => Duration::from_secs(*secs),
                    _ => step_for_attempt(attempt),
                };

                debug!(op = op_name, attempt, wait_secs = wait.as_secs(), "retrying after backoff");
                tokio::time::sleep(wait).await;
            }
            Err(other) => return Err(other),
        }
    }
}
