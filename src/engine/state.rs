// src/engine/state.rs

//! Engine-owned bookkeeping behind a single lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::dag::CycleDetector;
use crate::errors::ContractViolation;
use crate::store::{MemoCache, TargetStore};
use crate::task::{Outcome, Task, Value};

/// Everything the scheduler mutates while evaluating.
///
/// Claiming a memo cell, registering a cycle-detector edge and publishing
/// a target all happen under the same lock, so these operations are
/// totally ordered relative to each other. The lock is never held across
/// an `.await` or while producer code runs.
#[derive(Debug)]
pub struct EngineState<T: Task, V: Value> {
    pub memo: MemoCache<T, Outcome<T, V>>,
    pub cycles: CycleDetector<T>,
    pub targets: TargetStore<Outcome<T, V>>,
    pub violations: Vec<ContractViolation>,
}

impl<T: Task, V: Value> EngineState<T, V> {
    pub fn new() -> Self {
        Self {
            memo: MemoCache::new(),
            cycles: CycleDetector::new(),
            targets: TargetStore::new(),
            violations: Vec::new(),
        }
    }
}

impl<T: Task, V: Value> Default for EngineState<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to [`EngineState`].
pub struct SharedState<T: Task, V: Value>(Arc<Mutex<EngineState<T, V>>>);

impl<T: Task, V: Value> SharedState<T, V> {
    pub fn new() -> Self {
        SharedState(Arc::new(Mutex::new(EngineState::new())))
    }

    /// Lock the state. A panic while holding the lock cannot leave the
    /// append-only stores half-updated, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, EngineState<T, V>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Task, V: Value> Clone for SharedState<T, V> {
    fn clone(&self) -> Self {
        SharedState(Arc::clone(&self.0))
    }
}

impl<T: Task, V: Value> Default for SharedState<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Size snapshot of the engine's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Memoized (cacheable) tasks requested so far.
    pub memo_entries: usize,
    /// Notable tasks known to the cycle detector.
    pub notable_nodes: usize,
    /// Edges among notable tasks.
    pub notable_edges: usize,
    /// Target identities referenced so far.
    pub targets: usize,
}

impl<T: Task, V: Value> EngineState<T, V> {
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            memo_entries: self.memo.len(),
            notable_nodes: self.cycles.graph().node_count(),
            notable_edges: self.cycles.graph().edge_count(),
            targets: self.targets.len(),
        }
    }
}
