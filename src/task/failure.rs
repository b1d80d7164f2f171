// src/task/failure.rs

use std::fmt;
use std::sync::Arc;

use crate::types::TargetId;

/// What a task resolves to: its value or the reason it has none.
pub type Outcome<T, V> = Result<V, Failure<T>>;

/// Why a task could not produce a value.
///
/// Failures are plain values inside the scheduler: they travel through the
/// same slots as successful results, so they are cheap to clone and every
/// waiter of a memoized task observes the same failure.
#[derive(Debug, Clone)]
pub enum Failure<T> {
    /// The producer's `step`, a continuation, or a blocking body returned an error.
    Step { task: T, cause: Arc<anyhow::Error> },
    /// A dependency cycle; the path starts and ends at the same task.
    CycleFound { path: Vec<T> },
    /// An awaited sub-task failed, so `task` failed without running its continuation.
    Dependency { task: T, cause: Box<Failure<T>> },
    /// The evaluation owning a duplicate target failed.
    TargetFailed { target: TargetId, cause: Box<Failure<T>> },
    /// The computation was torn down (panic) before publishing anything.
    Abandoned { task: T },
}

impl<T> Failure<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    pub fn step(task: T, cause: anyhow::Error) -> Self {
        Failure::Step {
            task,
            cause: Arc::new(cause),
        }
    }

    /// Convert an error returned by producer code into a failure of `task`.
    ///
    /// Errors that already are failures (e.g. a blocking continuation that
    /// re-raised the body's failure with `?`) are passed through unchanged.
    pub fn from_error(task: T, err: anyhow::Error) -> Self {
        match err.downcast::<Failure<T>>() {
            Ok(failure) => failure,
            Err(err) => Failure::step(task, err),
        }
    }

    pub fn dependency(task: T, cause: Failure<T>) -> Self {
        Failure::Dependency {
            task,
            cause: Box::new(cause),
        }
    }
}

impl<T> Failure<T> {
    /// Innermost failure, following propagated/target-failed links.
    pub fn root_cause(&self) -> &Failure<T> {
        let mut current = self;
        loop {
            match current {
                Failure::Dependency { cause, .. } | Failure::TargetFailed { cause, .. } => {
                    current = cause;
                }
                _ => return current,
            }
        }
    }

    /// Cycle path if this failure was (ultimately) caused by a cycle.
    pub fn cycle_path(&self) -> Option<&[T]> {
        match self.root_cause() {
            Failure::CycleFound { path } => Some(path),
            _ => None,
        }
    }

    /// Task the failure is attributed to, if any.
    pub fn task(&self) -> Option<&T> {
        match self {
            Failure::Step { task, .. }
            | Failure::Dependency { task, .. }
            | Failure::Abandoned { task } => Some(task),
            Failure::CycleFound { path } => path.first(),
            Failure::TargetFailed { .. } => None,
        }
    }
}

impl<T: fmt::Debug> fmt::Display for Failure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Step { task, cause } => write!(f, "task {task:?} failed: {cause:#}"),
            Failure::CycleFound { path } => {
                write!(f, "dependency cycle detected: ")?;
                for (i, task) in path.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{task:?}")?;
                }
                Ok(())
            }
            Failure::Dependency { task, cause } => {
                write!(f, "task {task:?} depends on a failed task: {cause}")
            }
            Failure::TargetFailed { target, cause } => {
                write!(f, "target '{target}' failed to build: {cause}")
            }
            Failure::Abandoned { task } => {
                write!(f, "computation of task {task:?} was abandoned")
            }
        }
    }
}

impl<T: fmt::Debug> std::error::Error for Failure<T> {}
