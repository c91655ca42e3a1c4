//! In-process lock backend
//!
//! A mutex-guarded lease table. Suitable for a single-process deployment and
//! for tests; multi-process deployments want a shared backend behind the same
//! trait.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{LockBackend, LockError};

/// How often a waiting acquirer re-checks the lease table.
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

struct Lease {
    token: String,
    expires: Instant,
}

/// [`LockBackend`] over an in-process lease table.
///
/// Each acquisition gets a fresh token; release only removes the lease whose
/// token matches, so a stale holder cannot free a successor's live lease.
#[derive(Default)]
pub struct InProcessLockBackend {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InProcessLockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockBackend for InProcessLockBackend {
    async fn try_lock(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<String>, LockError> {
        let deadline = Instant::now() + wait;
        loop {
            {
                let mut leases = self.leases.lock().await;
                let now = Instant::now();
                let held = leases.get(key).is_some_and(|l| l.expires > now);
                if !held {
                    // Free, or the previous holder's lease expired
                    let token = Uuid::new_v4().simple().to_string();
                    leases.insert(
                        key.to_string(),
                        Lease {
                            token: token.clone(),
                            expires: now + lease,
                        },
                    );
                    return Ok(Some(token));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn unlock(&self, key: &str, token: &str) -> Result<(), LockError> {
        let mut leases = self.leases.lock().await;
        if leases.get(key).is_some_and(|l| l.token == token) {
            leases.remove(key);
        }
        Ok(())
    }
}
