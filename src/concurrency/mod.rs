//! Concurrency guard: named locks plus optimistic integrity checks.

mod integrity;
mod lock;

pub use integrity::{round_fingerprint, IntegrityCheck};
pub use lock::{round_resource, with_lock, InMemoryLock, LockGuard, LockLease, ResourceLock};
