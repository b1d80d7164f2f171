// src/task/step.rs

//! Step-by-step evaluation result types.

use std::fmt;
use std::path::PathBuf;

use crate::task::failure::Failure;
use crate::types::TargetId;

/// Continuation invoked once the awaited input is available.
///
/// Returning `Err` fails the task being reduced.
pub type Continuation<I, T, V> = Box<dyn FnOnce(I) -> anyhow::Result<Step<T, V>> + Send>;

/// Outcome of running a single evaluation step of a task.
///
/// Only `Done` and `DuplicateTarget` are terminal; everything else is
/// reduced further by the scheduler, possibly producing another `Step`.
pub enum Step<T, V> {
    /// Final value.
    Done(V),
    /// Needs the value of one sub-task.
    DependsOnOne(T, Continuation<V, T, V>),
    /// Needs the values of several sub-tasks, delivered in request order.
    DependsOnMany(Vec<T>, Continuation<Vec<V>, T, V>),
    /// Must run native/blocking work on the bounded worker pool.
    Blocking(BlockingJob<T, V>),
    /// Same physical artifact as an in-flight computation; wait for it.
    DuplicateTarget(TargetId),
}

impl<T, V> Step<T, V> {
    pub fn done(value: V) -> Self {
        Step::Done(value)
    }

    pub fn depends_on<F>(task: T, then: F) -> Self
    where
        F: FnOnce(V) -> anyhow::Result<Step<T, V>> + Send + 'static,
    {
        Step::DependsOnOne(task, Box::new(then))
    }

    pub fn depends_on_many<F>(tasks: Vec<T>, then: F) -> Self
    where
        F: FnOnce(Vec<V>) -> anyhow::Result<Step<T, V>> + Send + 'static,
    {
        Step::DependsOnMany(tasks, Box::new(then))
    }

    pub fn duplicate_of(target: impl Into<TargetId>) -> Self {
        Step::DuplicateTarget(target.into())
    }

    /// Short variant name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Done(_) => "done",
            Step::DependsOnOne(..) => "depends-on-one",
            Step::DependsOnMany(..) => "depends-on-many",
            Step::Blocking(_) => "blocking",
            Step::DuplicateTarget(_) => "duplicate-target",
        }
    }
}

impl<T: fmt::Debug, V: fmt::Debug> fmt::Debug for Step<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Done(v) => f.debug_tuple("Done").field(v).finish(),
            Step::DependsOnOne(t, _) => f.debug_tuple("DependsOnOne").field(t).finish_non_exhaustive(),
            Step::DependsOnMany(ts, _) => f.debug_tuple("DependsOnMany").field(ts).finish_non_exhaustive(),
            Step::Blocking(job) => f.debug_tuple("Blocking").field(job).finish(),
            Step::DuplicateTarget(id) => f.debug_tuple("DuplicateTarget").field(id).finish(),
        }
    }
}

type PreStep = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;
type Body<V> = Box<dyn FnOnce() -> anyhow::Result<V> + Send>;
type PostStep = Box<dyn FnOnce() + Send>;

/// A unit of blocking work plus what to do with its outcome.
///
/// `pre`, `body` and `post` run back to back on one worker of the bounded
/// pool. `post` runs exactly once whatever `pre`/`body` did; if `pre` fails,
/// `body` is skipped and `pre`'s error becomes the job's outcome.
pub struct BlockingJob<T, V> {
    pub(crate) pre: Option<PreStep>,
    pub(crate) body: Body<V>,
    pub(crate) post: Option<PostStep>,
    pub(crate) lock: Option<PathBuf>,
    pub(crate) then: Continuation<Result<V, Failure<T>>, T, V>,
}

impl<T, V> BlockingJob<T, V>
where
    T: fmt::Debug + Send + Sync + 'static,
    V: Send + 'static,
{
    /// Job whose outcome becomes the task's value (or failure) as is.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<V> + Send + 'static,
    {
        Self {
            pre: None,
            body: Box::new(body),
            post: None,
            lock: None,
            then: Box::new(
                |outcome: Result<V, Failure<T>>| -> anyhow::Result<Step<T, V>> {
                    Ok(Step::Done(outcome?))
                },
            ),
        }
    }

    pub fn pre<F>(mut self, pre: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.pre = Some(Box::new(pre));
        self
    }

    pub fn post<F>(mut self, post: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.post = Some(Box::new(post));
        self
    }

    /// Hold the scoped lock for `path` while the job runs.
    pub fn lock(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock = Some(path.into());
        self
    }

    /// Replace the default continuation.
    ///
    /// `then` also sees failures of `body`, so it can clean up or recover.
    pub fn then<F>(mut self, then: F) -> Self
    where
        F: FnOnce(Result<V, Failure<T>>) -> anyhow::Result<Step<T, V>> + Send + 'static,
    {
        self.then = Box::new(then);
        self
    }

    pub fn into_step(self) -> Step<T, V> {
        Step::Blocking(self)
    }
}

impl<T, V> fmt::Debug for BlockingJob<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingJob")
            .field("pre", &self.pre.is_some())
            .field("post", &self.post.is_some())
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}
