// src/exec/pool.rs

//! Bounded pool for blocking work.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::trace;

/// Runs blocking jobs on Tokio's blocking threads, at most `workers` at once.
///
/// Jobs never run on the async workers, so a slow native call cannot starve
/// the scheduler. Waiting for a free worker is an async suspension point.
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl BoundedExecutor {
    /// `workers` is clamped to at least 1.
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of workers currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run `job` on the pool and wait for its result.
    ///
    /// Fails only if the job panicked or the pool was shut down.
    pub async fn submit<F, R>(&self, job: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .context("blocking pool is closed")?;
        trace!(free = self.permits.available_permits(), "blocking job acquired a worker");

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .context("blocking job panicked")
    }
}
