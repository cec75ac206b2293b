//! The four-kind failure taxonomy every stage classifies its errors into
//! before deciding whether to retry, DLQ, or abort outright.
//!
//! `scm-client`'s own error hierarchy already splits provider/IO failures
//! from local invariant violations; this crate collapses that pattern
//! across all four stages into one enum so the DLQ and the pipeline layer
//! only ever branch on one thing.

use thiserror::Error;

use relational_store::StoreError;

/// How a failure should be handled by the retry/DLQ substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Upstream (provider API, network) hiccup that a retry can plausibly
    /// fix: rate limits, 5xx, timeouts, connection resets.
    TransientUpstream,
    /// Upstream said no and retrying won't change that: 401/403/404, a
    /// permanently deleted resource.
    PermanentUpstream,
    /// A row/shape our own data can't currently satisfy (a unique-key
    /// clash we didn't expect, a missing foreign key) — a bug or a stale
    /// assumption, not something retrying fixes.
    LocalInvariant,
    /// Infrastructure itself is down (DB pool exhausted, disk full) —
    /// nothing downstream can make progress either, so this aborts the
    /// whole run rather than going through the DLQ.
    Fatal,
}

impl FailureKind {
    /// Whether the DLQ's backoff schedule should ever retry this kind —
    /// `Fatal` propagates immediately instead of being enqueued.
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureKind::TransientUpstream | FailureKind::LocalInvariant)
    }
}

/// Classifies a relational-store failure.
pub fn classify_store_error(err: &StoreError) -> FailureKind {
    match err {
        StoreError::Db(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => FailureKind::Fatal,
        StoreError::Migrate(_) => FailureKind::Fatal,
        _ if err.is_unique_violation() => FailureKind::LocalInvariant,
        StoreError::UniqueViolation { .. } => FailureKind::LocalInvariant,
        StoreError::NotFound(_) => FailureKind::LocalInvariant,
        StoreError::Db(_) => FailureKind::TransientUpstream,
    }
}

/// Classifies any error that looks like `scm_client::ScmError` without
/// creating a hard dependency edge back onto `scm-client` from every
/// caller — stager is the only crate that actually produces these, and it
/// passes in the pre-computed retryability instead.
pub fn classify_upstream(retryable: bool, not_found: bool) -> FailureKind {
    if not_found {
        FailureKind::PermanentUpstream
    } else if retryable {
        FailureKind::TransientUpstream
    } else {
        FailureKind::PermanentUpstream
    }
}

#[derive(Debug, Error)]
pub enum ResilienceError {
    #[error("relational store error: {0}")]
    Store(#[from] StoreError),

    #[error("graph store error: {0}")]
    Graph(#[from] graph_store::errors::GraphStoreError),
}

pub type Result<T> = std::result::Result<T, ResilienceError>;
