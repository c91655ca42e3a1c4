//! Per-account distributed lock
//!
//! Serializes balance-affecting operations on one account number across
//! callers. The backend is an explicit dependency behind [`LockBackend`];
//! [`InProcessLockBackend`] is the in-tree implementation and the trait seam
//! is where a Redis-style backend would plug in.
//!
//! Leases are time-bounded: an acquired lock auto-expires after the lease
//! duration even if the holder never releases it, which bounds the blast
//! radius of a crashed holder. A holder whose work outlives the lease can
//! have its lock taken over mid-operation; the lease is a safety valve, not
//! a correctness guarantee.

pub mod memory;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InProcessLockBackend;

const LOCK_KEY_PREFIX: &str = "ACLK:";

/// Lock acquisition failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Another caller holds the lock and it did not free up within the wait
    /// bound.
    #[error("Account {account_number} is locked by another transaction")]
    Unavailable { account_number: String },

    /// The lock backend itself failed. Surfaced to the caller rather than
    /// proceeding without the lock.
    #[error("Lock backend unavailable: {0}")]
    Backend(String),
}

impl LockError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "lock_unavailable",
            Self::Backend(_) => "lock_backend_unavailable",
        }
    }
}

/// Proof of one lock acquisition.
///
/// The token identifies the acquisition itself: release only frees the lock
/// for the holder that presents the matching token, so a holder whose lease
/// already expired (and was taken over) cannot release the new holder's
/// lease on its way out.
#[derive(Debug, Clone)]
pub struct LockGuard {
    pub account_number: String,
    pub token: String,
}

/// Named, time-bounded mutual exclusion.
///
/// `try_lock` waits up to `wait` for the key to free up and, once acquired,
/// holds it for at most `lease`. Returns the acquisition's holder token, or
/// `Ok(None)` when the wait bound elapses without acquisition; `Err` only for
/// backend failures.
#[async_trait]
pub trait LockBackend: Send + Sync {
    async fn try_lock(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<String>, LockError>;

    /// Releases the key only if `token` matches the current lease. Unheld,
    /// expired or taken-over acquisitions are tolerated and ignored.
    async fn unlock(&self, key: &str, token: &str) -> Result<(), LockError>;
}

fn lock_key(account_number: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{account_number}")
}

/// Lock manager keyed by account number.
#[derive(Clone)]
pub struct LockService {
    backend: Arc<dyn LockBackend>,
    wait: Duration,
    lease: Duration,
}

impl LockService {
    pub fn new(backend: Arc<dyn LockBackend>, wait: Duration, lease: Duration) -> Self {
        Self {
            backend,
            wait,
            lease,
        }
    }

    /// Acquire the lock for `account_number`, waiting up to the configured
    /// bound. The returned guard is the only way to release the acquisition.
    pub async fn lock(&self, account_number: &str) -> Result<LockGuard, LockError> {
        tracing::debug!(account_number, "trying lock");
        let token = self
            .backend
            .try_lock(&lock_key(account_number), self.wait, self.lease)
            .await?;
        match token {
            Some(token) => Ok(LockGuard {
                account_number: account_number.to_string(),
                token,
            }),
            None => {
                tracing::error!(account_number, "lock acquisition failed");
                Err(LockError::Unavailable {
                    account_number: account_number.to_string(),
                })
            }
        }
    }

    /// Release an acquisition. Stale guards (expired or taken-over leases)
    /// are ignored by the backend; backend failures on release are logged and
    /// swallowed so they never mask the guarded operation's result.
    pub async fn unlock(&self, guard: LockGuard) {
        tracing::debug!(account_number = %guard.account_number, "trying unlock");
        if let Err(e) = self
            .backend
            .unlock(&lock_key(&guard.account_number), &guard.token)
            .await
        {
            tracing::warn!(account_number = %guard.account_number, error = %e, "lock release failed");
        }
    }

    /// Guarded invocation: acquire, run `f`, release on every exit path.
    ///
    /// A failed acquisition returns before `f` runs, so no failure transaction
    /// is recorded for lock errors.
    pub async fn with_account_lock<F, Fut, T, E>(
        &self,
        account_number: &str,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let guard = self.lock(account_number).await?;
        let result = f().await;
        self.unlock(guard).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn service(wait_ms: u64, lease_ms: u64) -> LockService {
        LockService::new(
            Arc::new(InProcessLockBackend::new()),
            Duration::from_millis(wait_ms),
            Duration::from_millis(lease_ms),
        )
    }

    #[tokio::test]
    async fn test_lock_blocks_second_acquirer() {
        let locks = service(50, 60_000);

        locks.lock("1000000000").await.unwrap();
        let err = locks.lock("1000000000").await.unwrap_err();
        assert_eq!(err.error_code(), "lock_unavailable");
        assert!(matches!(err, LockError::Unavailable { account_number } if account_number == "1000000000"));
    }

    #[tokio::test]
    async fn test_distinct_accounts_never_contend() {
        let locks = service(50, 60_000);

        locks.lock("1000000000").await.unwrap();
        locks.lock("1000000001").await.unwrap();
    }

    #[tokio::test]
    async fn test_unlock_frees_the_key() {
        let locks = service(50, 60_000);

        let guard = locks.lock("1000000000").await.unwrap();
        locks.unlock(guard).await;
        locks.lock("1000000000").await.unwrap();
    }

    #[tokio::test]
    async fn test_unlock_without_lock_is_tolerated() {
        let locks = service(50, 60_000);
        locks
            .unlock(LockGuard {
                account_number: "1000000000".to_string(),
                token: "never-issued".to_string(),
            })
            .await;
        locks.lock("1000000000").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_lease_can_be_taken_over() {
        let locks = service(200, 50);

        locks.lock("1000000000").await.unwrap();
        // Holder never releases; the lease expires within the second
        // acquirer's wait bound.
        locks.lock("1000000000").await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_release_does_not_free_live_lease() {
        let backend = Arc::new(InProcessLockBackend::new());
        let short_lease = LockService::new(
            backend.clone(),
            Duration::from_millis(100),
            Duration::from_millis(30),
        );
        let long_lease = LockService::new(
            backend.clone(),
            Duration::from_millis(200),
            Duration::from_secs(60),
        );

        // First holder's lease expires without a release
        let stale = short_lease.lock("1000000000").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Second holder takes over the expired lease
        let _live = long_lease.lock("1000000000").await.unwrap();

        // The first holder finally exits; its guard no longer matches the
        // current lease and must not release it
        short_lease.unlock(stale).await;

        let quick = LockService::new(
            backend,
            Duration::from_millis(20),
            Duration::from_secs(60),
        );
        let err = quick.lock("1000000000").await.unwrap_err();
        assert_eq!(err.error_code(), "lock_unavailable");
    }

    #[tokio::test]
    async fn test_guarded_invocation_releases_on_error() {
        let locks = service(50, 60_000);

        let result: Result<(), LockError> = locks
            .with_account_lock("1000000000", || async {
                Err(LockError::Backend("boom".to_string()))
            })
            .await;
        assert!(matches!(result, Err(LockError::Backend(_))));

        // The failed invocation must not leak the lock
        locks.lock("1000000000").await.unwrap();
    }

    #[tokio::test]
    async fn test_guarded_invocations_are_serialized() {
        let locks = service(5_000, 60_000);
        let in_flight = Arc::new(AtomicI64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                locks
                    .with_account_lock("1000000000", || async {
                        // Exactly one guarded invocation may be in flight
                        assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        assert_eq!(in_flight.fetch_sub(1, Ordering::SeqCst), 1);
                        Ok::<_, LockError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }
}
