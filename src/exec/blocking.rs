// src/exec/blocking.rs

//! Running the blocking part of a [`BlockingJob`].

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::exec::locks::ScopedLocks;
use crate::exec::pool::BoundedExecutor;
use crate::task::{BlockingJob, Continuation, Failure};

/// The parts of a [`BlockingJob`] that run on the pool.
pub(crate) struct JobParts<V> {
    pre: Option<Box<dyn FnOnce() -> Result<()> + Send>>,
    body: Box<dyn FnOnce() -> Result<V> + Send>,
    post: Option<Box<dyn FnOnce() + Send>>,
    lock: Option<PathBuf>,
}

impl<T, V> BlockingJob<T, V> {
    /// Split into what runs on the pool and the continuation.
    pub(crate) fn into_parts(self) -> (JobParts<V>, Continuation<Result<V, Failure<T>>, T, V>) {
        let parts = JobParts {
            pre: self.pre,
            body: self.body,
            post: self.post,
            lock: self.lock,
        };
        (parts, self.then)
    }
}

/// Run `pre`, `body` and `post` on the pool, holding the scoped lock if any.
///
/// `post` runs exactly once on every path, including a panicking `body`.
pub(crate) async fn run_job<V>(
    executor: &BoundedExecutor,
    locks: &ScopedLocks,
    parts: JobParts<V>,
) -> Result<V>
where
    V: Send + 'static,
{
    let JobParts {
        pre,
        body,
        post,
        lock,
    } = parts;

    // Take the lock before a worker so waiting for it does not hold a slot.
    let guard = match &lock {
        Some(path) => Some(locks.acquire(path).await),
        None => None,
    };

    executor
        .submit(move || {
            let _guard = guard;

            let outcome = catch_unwind(AssertUnwindSafe(move || {
                if let Some(pre) = pre {
                    pre()?;
                }
                body()
            }))
            .unwrap_or_else(|_| Err(anyhow!("blocking job panicked")));

            if let Some(post) = post {
                debug!(failed = outcome.is_err(), "running post step");
                post();
            }

            outcome
        })
        .await?
}
