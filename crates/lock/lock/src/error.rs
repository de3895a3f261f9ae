use thiserror::Error;

/// Errors from lock backend construction and lock operations.
///
/// A lock that is already held is not an error: [`acquire`] reports it as
/// `Ok(false)`.
///
/// [`acquire`]: crate::LockBackend::acquire
#[derive(Debug, Error)]
pub enum LockError {
    /// The configuration string or options cannot produce a backend.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The store could not be reached or did not answer in time.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something the backend cannot use.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LockError {
    /// Whether retrying the same call later may succeed.
    ///
    /// Only connectivity failures qualify; configuration and argument
    /// errors will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(LockError::Unavailable("timed out".into()).is_retryable());
        assert!(!LockError::Configuration("no master".into()).is_retryable());
        assert!(!LockError::Backend("bad reply".into()).is_retryable());
        assert!(!LockError::InvalidArgument("empty".into()).is_retryable());
    }

    #[test]
    fn display_includes_detail() {
        let err = LockError::Configuration("master_name is required".into());
        assert_eq!(
            err.to_string(),
            "configuration error: master_name is required"
        );
    }
}
