//! Redis-backed singleton locks.
//!
//! A lock is a plain Redis string: the key is the lock name, the value is
//! the owner token. Acquisition is a single `SET name owner NX PX ttl`, so
//! two workers racing for the same name can never both succeed against the
//! same master.
//!
//! # Guarantees
//!
//! With a single Redis instance, at most one owner holds a lock at a time.
//! Behind Sentinel, replication is asynchronous: if the master fails after
//! a lock was written but before it reached a replica, the promoted replica
//! does not know about the lock and a second worker may take it.
//!
//! Locks taken without a TTL survive a crashed holder until released or
//! cleared.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::AsyncCommands;

use singleton_lock::{LockBackend, LockError, validate_lock_name, validate_ttl};

use crate::config::RedisConfig;
use crate::error::{pool_error, store_error};
use crate::resolver;

/// Redis-backed implementation of [`LockBackend`].
///
/// Cheap to share: every call checks a connection out of the pool.
pub struct RedisLockBackend {
    pool: Pool,
    scan_count: usize,
}

impl RedisLockBackend {
    /// Resolve the configured address and create the connection pool.
    ///
    /// For a direct URL no connection is opened yet. For a Sentinel address
    /// the Sentinel nodes are queried once for the current master.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Configuration`] for an unusable address or
    /// missing `master_name`, and [`LockError::Unavailable`] if no Sentinel
    /// node can name a reachable master.
    pub async fn connect(config: &RedisConfig) -> Result<Self, LockError> {
        let pool = resolver::resolve(config).await?;
        Ok(Self {
            pool,
            scan_count: config.scan_count.max(1),
        })
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, LockError> {
        self.pool.get().await.map_err(pool_error)
    }
}

#[async_trait]
impl LockBackend for RedisLockBackend {
    async fn acquire(
        &self,
        name: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, LockError> {
        validate_lock_name(name)?;
        validate_ttl(ttl)?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(name).arg(owner).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        let mut conn = self.conn().await?;
        // `OK` when written, nil when the key already existed.
        let reply: Option<String> = cmd.query_async(&mut conn).await.map_err(store_error)?;
        let acquired = reply.is_some();

        tracing::debug!(lock = %name, owner = %owner, acquired, "redis lock acquire");
        Ok(acquired)
    }

    async fn release(&self, name: &str) -> Result<(), LockError> {
        validate_lock_name(name)?;
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(name).await.map_err(store_error)?;

        tracing::debug!(lock = %name, existed = removed > 0, "redis lock released");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<String>, LockError> {
        validate_lock_name(name)?;
        let mut conn = self.conn().await?;
        conn.get(name).await.map_err(store_error)
    }

    async fn clear_all(&self, prefix: &str) -> Result<usize, LockError> {
        let pattern = format!("{}*", escape_glob(prefix));
        let mut conn = self.conn().await?;

        let mut cursor: u64 = 0;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(self.scan_count)
                .query_async(&mut conn)
                .await
                .map_err(store_error)?;

            if !keys.is_empty() {
                let deleted: usize = conn.del(&keys).await.map_err(store_error)?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(prefix = %prefix, removed, "redis locks cleared");
        Ok(removed)
    }
}

/// TTL in whole milliseconds, never below one.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Escape Redis glob metacharacters so `prefix` only matches itself.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_one_millisecond() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(ttl_millis(Duration::from_secs(60)), 60_000);
    }

    #[test]
    fn plain_prefix_is_unchanged() {
        assert_eq!(escape_glob("celery-singleton:"), "celery-singleton:");
    }

    #[test]
    fn glob_metacharacters_are_escaped() {
        assert_eq!(escape_glob("job[1]*?"), r"job\[1\]\*\?");
        assert_eq!(escape_glob(r"a\b"), r"a\\b");
    }

    #[tokio::test]
    async fn invalid_arguments_fail_before_any_connection() {
        // Nothing listens here; validation must reject the call first.
        let backend = RedisLockBackend::connect(&RedisConfig::new("redis://127.0.0.1:1"))
            .await
            .expect("direct pools are lazy");

        let result = backend.acquire("", "task-a", None).await;
        assert!(matches!(result, Err(LockError::InvalidArgument(_))));

        let result = backend
            .acquire("job:1", "task-a", Some(Duration::ZERO))
            .await;
        assert!(matches!(result, Err(LockError::InvalidArgument(_))));

        let result = backend.get("").await;
        assert!(matches!(result, Err(LockError::InvalidArgument(_))));

        let result = backend.release("").await;
        assert!(matches!(result, Err(LockError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let config = RedisConfig {
            connection_timeout: Duration::from_millis(500),
            ..RedisConfig::new("redis://127.0.0.1:1")
        };
        let backend = RedisLockBackend::connect(&config)
            .await
            .expect("direct pools are lazy");

        let err = backend
            .get("job:1")
            .await
            .expect_err("nothing listens on port 1");
        assert!(err.is_retryable(), "expected an unavailable error, got {err}");
    }
}
