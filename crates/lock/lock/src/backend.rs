use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockError;

/// Trait for store-backed singleton locks.
///
/// A lock is the existence of a key named after the unit of work; its value
/// is the owner token of the current holder. Implementations must be
/// `Send + Sync` and safe for concurrent access, and `acquire` must be a
/// single atomic set-if-absent at the store, never a read followed by a
/// write. Every operation taking a lock name rejects an empty one with
/// [`LockError::InvalidArgument`].
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Try to take the lock `name` on behalf of `owner`.
    ///
    /// Returns `true` if the lock was newly created, `false` if another
    /// holder already has it. Without a `ttl` the lock persists until it is
    /// released or cleared, even if the holder crashes.
    async fn acquire(
        &self,
        name: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, LockError>;

    /// Delete the lock. Releasing a lock nobody holds is a no-op.
    async fn release(&self, name: &str) -> Result<(), LockError>;

    /// Get the owner token of the current holder, or `None` if unheld.
    async fn get(&self, name: &str) -> Result<Option<String>, LockError>;

    /// Delete every lock whose name starts with `prefix` and return how
    /// many were removed.
    ///
    /// Not atomic: a lock created while the clear is in progress may or
    /// may not survive it.
    async fn clear_all(&self, prefix: &str) -> Result<usize, LockError>;
}

/// Reject lock names the store cannot key on.
pub fn validate_lock_name(name: &str) -> Result<(), LockError> {
    if name.is_empty() {
        return Err(LockError::InvalidArgument(
            "lock name must not be empty".to_owned(),
        ));
    }
    Ok(())
}

/// Reject a zero TTL; an absent TTL means "no expiry".
pub fn validate_ttl(ttl: Option<Duration>) -> Result<(), LockError> {
    if ttl.is_some_and(|d| d.is_zero()) {
        return Err(LockError::InvalidArgument(
            "lock ttl must be positive".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify object safety.
    fn _assert_dyn_lock_backend(_: &dyn LockBackend) {}

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            validate_lock_name(""),
            Err(LockError::InvalidArgument(_))
        ));
        assert!(validate_lock_name("job:1").is_ok());
    }

    #[test]
    fn zero_ttl_rejected() {
        assert!(matches!(
            validate_ttl(Some(Duration::ZERO)),
            Err(LockError::InvalidArgument(_))
        ));
        assert!(validate_ttl(None).is_ok());
        assert!(validate_ttl(Some(Duration::from_millis(1))).is_ok());
    }
}
