//! Crate-wide error type for the Stager.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StagerError>;

#[derive(Debug, Error)]
pub enum StagerError {
    #[error(transparent)]
    Scm(#[from] scm_client::ScmError),

    #[error(transparent)]
    Store(#[from] relational_store::StoreError),

    #[error(transparent)]
    Resilience(#[from] resilience::ResilienceError),
}

/// Maps an SCM fetch failure onto the four-kind taxonomy in `resilience`,
/// the way `resilience::errors` documents scm-client errors should be
/// classified by their one caller.
pub fn classify_scm_error(err: &scm_client::ScmError) -> resilience::FailureKind {
    use scm_client::{ScmError, ScmProviderError};

    match err {
        ScmError::Provider(p) => {
            let not_found = matches!(p, ScmProviderError::NotFound);
            resilience::classify_upstream(p.is_retryable(), not_found)
        }
        _ => resilience::FailureKind::PermanentUpstream,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scm_client::{ScmError, ScmProviderError};

    #[test]
    fn not_found_is_permanent() {
        let err = ScmError::Provider(ScmProviderError::NotFound);
        assert_eq!(classify_scm_error(&err), resilience::FailureKind::PermanentUpstream);
    }

    #[test]
    fn rate_limited_is_transient() {
        let err = ScmError::Provider(ScmProviderError::RateLimited {
            retry_after_secs: Some(30),
        });
        assert_eq!(classify_scm_error(&err), resilience::FailureKind::TransientUpstream);
    }

    #[test]
    fn validation_error_is_permanent() {
        let err = ScmError::Validation("bad project id".into());
        assert_eq!(classify_scm_error(&err), resilience::FailureKind::PermanentUpstream);
    }
}
