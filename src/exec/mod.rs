// src/exec/mod.rs

//! Execution services consumed by the scheduler.
//!
//! - [`pool`] provides [`BoundedExecutor`], the fixed-size pool blocking
//!   jobs run on.
//! - [`locks`] provides [`ScopedLocks`], path-keyed mutual exclusion held
//!   for the duration of a job.
//! - [`blocking`] glues a [`crate::task::BlockingJob`] onto both.

pub mod blocking;
pub mod locks;
pub mod pool;

pub use locks::ScopedLocks;
pub use pool::BoundedExecutor;
