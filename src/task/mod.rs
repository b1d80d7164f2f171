// src/task/mod.rs

//! The vocabulary the engine operates on.
//!
//! - [`Task`] is an opaque, equality-comparable unit of work. The engine only
//!   looks at its identity and at the `cacheable` / `notable` tags.
//! - [`step`] defines [`Step`], the result of running one evaluation step:
//!   either a final value or a continuation that still needs something.
//! - [`failure`] defines [`Failure`], the value a task resolves to when it
//!   cannot produce one.
//! - [`producer`] defines the [`Producer`] contract the scheduler drives.

use std::fmt::Debug;
use std::hash::Hash;

pub mod failure;
pub mod producer;
pub mod step;

pub use failure::{Failure, Outcome};
pub use producer::Producer;
pub use step::{BlockingJob, Continuation, Step};

/// Descriptor of one unit of work.
///
/// Two equal tasks denote the same logical work and memoize to the same
/// outcome.
pub trait Task: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Whether outcomes of this task are memoized for the session.
    fn is_cacheable(&self) -> bool {
        true
    }

    /// Whether the cycle detector tracks this task as a graph node.
    ///
    /// Every task kind that can plausibly recur (evaluating a named target,
    /// a call expression, an import) must be notable, otherwise a cycle
    /// through it cannot be reported.
    fn is_notable(&self) -> bool {
        false
    }
}

/// Values flowing between tasks.
pub trait Value: Clone + Send + Sync + 'static {}

impl<V> Value for V where V: Clone + Send + Sync + 'static {}
