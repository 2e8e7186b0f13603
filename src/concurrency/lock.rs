//! Named-resource mutual exclusion.

use crate::models::LadderError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Proof of holding a named resource. Only the matching lease can release it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockLease {
    pub resource: String,
    pub token: Uuid,
}

/// Lock backend. In-process for single-node deployments; a lease service can implement the
/// same trait for multi-node ones.
pub trait ResourceLock: Send + Sync {
    /// Take `resource` or fail with [`LadderError::OperationInProgress`]. Never blocks.
    fn try_acquire(&self, resource: &str) -> Result<LockLease, LadderError>;

    /// Give `lease` back. A lease that was already force-released is ignored.
    fn release(&self, lease: &LockLease);
}

/// Releases its lease when dropped.
pub struct LockGuard<'a> {
    lock: &'a dyn ResourceLock,
    lease: LockLease,
}

impl<'a> LockGuard<'a> {
    pub fn acquire(lock: &'a dyn ResourceLock, resource: &str) -> Result<Self, LadderError> {
        let lease = lock.try_acquire(resource)?;
        Ok(Self { lock, lease })
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(&self.lease);
    }
}

/// Run `f` while holding `resource`.
pub fn with_lock<R>(
    lock: &dyn ResourceLock,
    resource: &str,
    f: impl FnOnce() -> Result<R, LadderError>,
) -> Result<R, LadderError> {
    let _guard = LockGuard::acquire(lock, resource)?;
    f()
}

/// Lock resource name for a round.
pub fn round_resource(round_id: Uuid) -> String {
    format!("round:{}", round_id)
}

struct Held {
    token: Uuid,
    acquired_at: Instant,
}

/// Process-local lock table. A lease older than `timeout` is forcibly released on the next
/// acquisition attempt (or sweep) and logged as stale.
pub struct InMemoryLock {
    held: Mutex<HashMap<String, Held>>,
    timeout: Duration,
}

impl InMemoryLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Drop every stale lease. Returns how many were released.
    pub fn sweep_stale(&self) -> usize {
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(_) => return 0,
        };
        let before = held.len();
        let timeout = self.timeout;
        held.retain(|resource, h| {
            let stale = h.acquired_at.elapsed() >= timeout;
            if stale {
                log::warn!(
                    "Forcibly released stale lock {} (held {:?})",
                    resource,
                    h.acquired_at.elapsed()
                );
            }
            !stale
        });
        before - held.len()
    }

    pub fn is_held(&self, resource: &str) -> bool {
        self.held
            .lock()
            .map(|held| {
                held.get(resource)
                    .is_some_and(|h| h.acquired_at.elapsed() < self.timeout)
            })
            .unwrap_or(false)
    }
}

impl ResourceLock for InMemoryLock {
    fn try_acquire(&self, resource: &str) -> Result<LockLease, LadderError> {
        let mut held = self
            .held
            .lock()
            .map_err(|_| LadderError::Storage("lock error".to_string()))?;
        if let Some(existing) = held.get(resource) {
            let age = existing.acquired_at.elapsed();
            if age < self.timeout {
                return Err(LadderError::OperationInProgress(resource.to_string()));
            }
            log::warn!("Forcibly released stale lock {} (held {:?})", resource, age);
        }
        let token = Uuid::new_v4();
        held.insert(
            resource.to_string(),
            Held {
                token,
                acquired_at: Instant::now(),
            },
        );
        Ok(LockLease {
            resource: resource.to_string(),
            token,
        })
    }

    fn release(&self, lease: &LockLease) {
        let Ok(mut held) = self.held.lock() else {
            return;
        };
        if held
            .get(&lease.resource)
            .is_some_and(|h| h.token == lease.token)
        {
            held.remove(&lease.resource);
        }
    }
}
