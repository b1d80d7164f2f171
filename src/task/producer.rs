// src/task/producer.rs

//! The contract between the scheduler and the layer that knows what tasks mean.

use crate::engine::StepContext;
use crate::task::{Step, Task, Value};

/// Single-step evaluator of tasks.
///
/// The scheduler calls [`Producer::step`] once per evaluation of a task and
/// then drives the returned [`Step`] to completion, calling back into the
/// continuations it carries. `step` may be called concurrently for distinct
/// tasks; engine bookkeeping it needs (e.g. claiming a target) goes through
/// `cx`, which serializes it with the engine's own bookkeeping.
///
/// Errors returned from `step` become a [`crate::task::Failure::Step`] of
/// that task only; they never abort unrelated evaluations.
pub trait Producer: Send + Sync + 'static {
    type Task: Task;
    type Value: Value;

    fn step(
        &self,
        task: &Self::Task,
        cx: &StepContext<Self::Task, Self::Value>,
    ) -> anyhow::Result<Step<Self::Task, Self::Value>>;
}
