use deadpool_redis::PoolError;
use redis::RedisError;

use singleton_lock::LockError;

/// Sort a Redis client error into "could not reach the store" and "the
/// store said something unusable".
pub(crate) fn store_error(e: RedisError) -> LockError {
    if e.is_io_error() || e.is_timeout() || e.is_connection_refusal() || e.is_connection_dropped()
    {
        LockError::Unavailable(e.to_string())
    } else {
        LockError::Backend(e.to_string())
    }
}

/// Failing to check a connection out of the pool always means the store is
/// out of reach, unless Redis itself rejected the new connection.
pub(crate) fn pool_error(e: PoolError) -> LockError {
    match e {
        PoolError::Backend(e) => store_error(e),
        other => LockError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use redis::ErrorKind;

    use super::*;

    #[test]
    fn io_errors_are_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = store_error(RedisError::from(io));
        assert!(matches!(err, LockError::Unavailable(_)));
    }

    #[test]
    fn reply_errors_are_backend() {
        let err = store_error(RedisError::from((ErrorKind::TypeError, "not a string")));
        assert!(matches!(err, LockError::Backend(_)));
    }

    #[test]
    fn closed_pool_is_unavailable() {
        let err = pool_error(PoolError::Closed);
        assert!(matches!(err, LockError::Unavailable(_)));
    }
}
