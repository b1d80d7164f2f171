// src/exec/locks.rs

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tracing::trace;

/// Exclusive access keyed by filesystem path.
///
/// Two jobs holding the same key never overlap. The guard returned by
/// [`ScopedLocks::acquire`] releases the key when dropped, which covers
/// success, error, panic and cancellation alike.
#[derive(Debug, Clone, Default)]
pub struct ScopedLocks {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ScopedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.to_path_buf()).or_default())
        };
        trace!(?key, "waiting for scoped lock");
        lock.lock_owned().await
    }

    /// Run `body` while holding the lock for `key`.
    pub async fn with_lock<F, Fut, R>(&self, key: &Path, body: F) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let _guard = self.acquire(key).await;
        body().await
    }
}
