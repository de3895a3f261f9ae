use std::time::Duration;

use crate::backend::LockBackend;
use crate::error::LockError;

/// TTL used by the expiry check; short enough to wait out in a test.
const SHORT_TTL: Duration = Duration::from_millis(100);

/// Run the full lock backend conformance test suite.
///
/// Every lock the suite touches starts with `prefix`, so a shared store can
/// be tested without disturbing other keys. Call this from your backend's
/// test module with a fresh backend and a prefix unique to the run.
///
/// # Errors
///
/// Returns an error if the backend fails an operation; violated
/// properties panic.
pub async fn run_lock_conformance_tests(
    backend: &dyn LockBackend,
    prefix: &str,
) -> Result<(), LockError> {
    test_get_unheld(backend, prefix).await?;
    test_acquire_then_get(backend, prefix).await?;
    test_acquire_contention(backend, prefix).await?;
    test_concurrent_acquire_single_winner(backend, prefix).await?;
    test_release_unheld(backend, prefix).await?;
    test_reacquire_after_release(backend, prefix).await?;
    test_ttl_expiry(backend, prefix).await?;
    test_clear_all_by_prefix(backend, prefix).await?;
    test_invalid_arguments(backend, prefix).await?;
    Ok(())
}

async fn test_get_unheld(backend: &dyn LockBackend, prefix: &str) -> Result<(), LockError> {
    let name = format!("{prefix}unheld");
    let holder = backend.get(&name).await?;
    assert!(holder.is_none(), "get on an unheld lock should return None");
    Ok(())
}

async fn test_acquire_then_get(backend: &dyn LockBackend, prefix: &str) -> Result<(), LockError> {
    let name = format!("{prefix}acquire-get");
    let acquired = backend.acquire(&name, "task-a", None).await?;
    assert!(acquired, "uncontested acquire should succeed");

    let holder = backend.get(&name).await?;
    assert_eq!(holder.as_deref(), Some("task-a"), "holder should be the owner token");

    backend.release(&name).await?;
    Ok(())
}

async fn test_acquire_contention(backend: &dyn LockBackend, prefix: &str) -> Result<(), LockError> {
    let name = format!("{prefix}contention");
    assert!(backend.acquire(&name, "task-a", None).await?);

    let second = backend.acquire(&name, "task-b", None).await?;
    assert!(!second, "second acquire should fail while the lock is held");

    let holder = backend.get(&name).await?;
    assert_eq!(holder.as_deref(), Some("task-a"), "original holder should remain");

    backend.release(&name).await?;
    Ok(())
}

async fn test_concurrent_acquire_single_winner(
    backend: &dyn LockBackend,
    prefix: &str,
) -> Result<(), LockError> {
    let name = format!("{prefix}race");
    let (a, b) = tokio::join!(
        backend.acquire(&name, "task-a", None),
        backend.acquire(&name, "task-b", None),
    );
    let (a, b) = (a?, b?);
    assert!(a ^ b, "exactly one concurrent acquire should win");

    let winner = if a { "task-a" } else { "task-b" };
    let holder = backend.get(&name).await?;
    assert_eq!(holder.as_deref(), Some(winner));

    backend.release(&name).await?;
    Ok(())
}

async fn test_release_unheld(backend: &dyn LockBackend, prefix: &str) -> Result<(), LockError> {
    let name = format!("{prefix}never-held");
    backend.release(&name).await?;
    backend.release(&name).await?;
    Ok(())
}

async fn test_reacquire_after_release(
    backend: &dyn LockBackend,
    prefix: &str,
) -> Result<(), LockError> {
    let name = format!("{prefix}reacquire");
    assert!(backend.acquire(&name, "task-a", None).await?);
    backend.release(&name).await?;

    let acquired = backend.acquire(&name, "task-b", None).await?;
    assert!(acquired, "lock should be acquirable again after release");
    assert_eq!(backend.get(&name).await?.as_deref(), Some("task-b"));

    backend.release(&name).await?;
    Ok(())
}

async fn test_ttl_expiry(backend: &dyn LockBackend, prefix: &str) -> Result<(), LockError> {
    let name = format!("{prefix}ttl");
    assert!(backend.acquire(&name, "task-a", Some(SHORT_TTL)).await?);
    assert_eq!(backend.get(&name).await?.as_deref(), Some("task-a"));

    tokio::time::sleep(SHORT_TTL * 3).await;

    assert!(
        backend.get(&name).await?.is_none(),
        "lock should be gone once its ttl has passed"
    );
    assert!(
        backend.acquire(&name, "task-b", None).await?,
        "expired lock should be acquirable"
    );

    backend.release(&name).await?;
    Ok(())
}

async fn test_clear_all_by_prefix(
    backend: &dyn LockBackend,
    prefix: &str,
) -> Result<(), LockError> {
    let jobs = format!("{prefix}job:");
    let job_1 = format!("{jobs}1");
    let job_2 = format!("{jobs}2");
    let other = format!("{prefix}other:1");

    assert!(backend.acquire(&job_1, "t1", None).await?);
    assert!(backend.acquire(&job_2, "t2", None).await?);
    assert!(backend.acquire(&other, "t3", None).await?);

    let removed = backend.clear_all(&jobs).await?;
    assert_eq!(removed, 2, "clear should report both matching locks");

    assert!(backend.get(&job_1).await?.is_none());
    assert!(backend.get(&job_2).await?.is_none());
    assert_eq!(
        backend.get(&other).await?.as_deref(),
        Some("t3"),
        "locks outside the prefix should survive"
    );

    let removed = backend.clear_all(&jobs).await?;
    assert_eq!(removed, 0, "clearing an empty prefix should succeed");

    backend.release(&other).await?;
    Ok(())
}

async fn test_invalid_arguments(backend: &dyn LockBackend, prefix: &str) -> Result<(), LockError> {
    let result = backend.acquire("", "task-a", None).await;
    assert!(
        matches!(result, Err(LockError::InvalidArgument(_))),
        "empty lock name should be rejected"
    );

    let result = backend.get("").await;
    assert!(
        matches!(result, Err(LockError::InvalidArgument(_))),
        "get with an empty lock name should be rejected"
    );

    let result = backend.release("").await;
    assert!(
        matches!(result, Err(LockError::InvalidArgument(_))),
        "release with an empty lock name should be rejected"
    );

    let name = format!("{prefix}zero-ttl");
    let result = backend.acquire(&name, "task-a", Some(Duration::ZERO)).await;
    assert!(
        matches!(result, Err(LockError::InvalidArgument(_))),
        "zero ttl should be rejected"
    );
    assert!(backend.get(&name).await?.is_none(), "rejected acquire must not write");
    Ok(())
}
