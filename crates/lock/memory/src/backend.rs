use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

use singleton_lock::{LockBackend, LockError, validate_lock_name, validate_ttl};

/// Internal entry representing a held lock.
#[derive(Debug, Clone)]
struct LockEntry {
    owner: String,
    expires_at: Option<Instant>,
}

impl LockEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory [`LockBackend`] backed by a [`DashMap`].
///
/// Lock expiry is lazy: expired entries are evicted on the next acquire
/// attempt for the same lock name and are invisible to `get` and
/// `clear_all` in the meantime. Clones share the same lock table.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockBackend {
    locks: Arc<DashMap<String, LockEntry>>,
}

impl MemoryLockBackend {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `fresh` under `name` unless a live entry is already there.
    ///
    /// The entry guard holds the shard lock, so check and insert are one step.
    fn claim(&self, name: &str, fresh: LockEntry) -> bool {
        match self.locks.entry(name.to_owned()) {
            Entry::Occupied(mut occupied) if occupied.get().is_expired() => {
                occupied.insert(fresh);
                true
            }
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        }
    }
}

#[async_trait]
impl LockBackend for MemoryLockBackend {
    async fn acquire(
        &self,
        name: &str,
        owner: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, LockError> {
        validate_lock_name(name)?;
        validate_ttl(ttl)?;

        // Remove expired entries lazily.
        self.locks.remove_if(name, |_, entry| entry.is_expired());

        let acquired = self.claim(
            name,
            LockEntry {
                owner: owner.to_owned(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );

        tracing::debug!(lock = %name, owner = %owner, acquired, "memory lock acquire");
        Ok(acquired)
    }

    async fn release(&self, name: &str) -> Result<(), LockError> {
        validate_lock_name(name)?;
        self.locks.remove(name);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<String>, LockError> {
        validate_lock_name(name)?;
        Ok(self
            .locks
            .get(name)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.owner.clone()))
    }

    async fn clear_all(&self, prefix: &str) -> Result<usize, LockError> {
        let mut removed = 0;
        self.locks.retain(|name, entry| {
            if !name.starts_with(prefix) {
                return true;
            }
            if !entry.is_expired() {
                removed += 1;
            }
            false
        });

        tracing::debug!(prefix = %prefix, removed, "memory locks cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use singleton_lock::testing::run_lock_conformance_tests;

    use super::*;

    #[tokio::test]
    async fn conformance() {
        let backend = MemoryLockBackend::new();
        run_lock_conformance_tests(&backend, "conformance:")
            .await
            .expect("lock conformance tests should pass");
    }

    #[tokio::test(start_paused = true)]
    async fn lock_expires_after_ttl() {
        let backend = MemoryLockBackend::new();

        let acquired = backend
            .acquire("expire-lock", "task-a", Some(Duration::from_secs(2)))
            .await
            .unwrap();
        assert!(acquired);
        assert_eq!(
            backend.get("expire-lock").await.unwrap().as_deref(),
            Some("task-a")
        );

        // Advance past TTL.
        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(backend.get("expire-lock").await.unwrap().is_none());

        let acquired = backend
            .acquire("expire-lock", "task-b", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        assert!(acquired, "should acquire after TTL expiry");
    }

    #[tokio::test(start_paused = true)]
    async fn claim_replaces_entry_that_expired_after_eviction() {
        let backend = MemoryLockBackend::new();

        // An entry that expires between the lazy eviction and the claim.
        backend.locks.insert(
            "stale".to_owned(),
            LockEntry {
                owner: "task-a".to_owned(),
                expires_at: Some(Instant::now() + Duration::from_secs(1)),
            },
        );
        tokio::time::advance(Duration::from_secs(2)).await;

        let claimed = backend.claim(
            "stale",
            LockEntry {
                owner: "task-b".to_owned(),
                expires_at: None,
            },
        );
        assert!(claimed, "an expired holder must not block the claim");
        assert_eq!(backend.get("stale").await.unwrap().as_deref(), Some("task-b"));

        let claimed = backend.claim(
            "stale",
            LockEntry {
                owner: "task-c".to_owned(),
                expires_at: None,
            },
        );
        assert!(!claimed, "a live holder still blocks the claim");
    }

    #[tokio::test(start_paused = true)]
    async fn lock_without_ttl_never_expires() {
        let backend = MemoryLockBackend::new();
        assert!(backend.acquire("forever", "task-a", None).await.unwrap());

        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;

        assert_eq!(
            backend.get("forever").await.unwrap().as_deref(),
            Some("task-a")
        );
        assert!(!backend.acquire("forever", "task-b", None).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_all_skips_expired_locks_in_count() {
        let backend = MemoryLockBackend::new();
        backend
            .acquire("job:1", "t1", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        backend.acquire("job:2", "t2", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(backend.clear_all("job:").await.unwrap(), 1);
        assert!(backend.locks.is_empty(), "expired entries are evicted too");
    }

    #[tokio::test]
    async fn clones_share_lock_table() {
        let backend = MemoryLockBackend::new();
        let other = backend.clone();

        assert!(backend.acquire("shared", "task-a", None).await.unwrap());
        assert!(!other.acquire("shared", "task-b", None).await.unwrap());

        other.release("shared").await.unwrap();
        assert!(backend.get("shared").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_acquire_has_one_winner() {
        let backend = Arc::new(MemoryLockBackend::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                backend
                    .acquire("contended", &format!("task-{i}"), None)
                    .await
                    .expect("acquire should not fail")
            }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.expect("task should not panic") {
                winners += 1;
            }
        }

        assert_eq!(winners, 1, "exactly one task should hold the lock");
    }
}
