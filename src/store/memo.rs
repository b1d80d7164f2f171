// src/store/memo.rs

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tracing::trace;

use crate::store::slot::OnceSlot;

/// Result of asking the cache for a task's cell.
#[derive(Debug)]
pub enum Claim<X> {
    /// The cell was just created; the caller must compute and publish.
    Owner(Arc<OnceSlot<X>>),
    /// Someone else owns the computation; await the cell.
    Waiter(Arc<OnceSlot<X>>),
}

impl<X> Claim<X> {
    pub fn slot(&self) -> &Arc<OnceSlot<X>> {
        match self {
            Claim::Owner(slot) | Claim::Waiter(slot) => slot,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Claim::Owner(_))
    }
}

/// Session-wide memoization of cacheable tasks.
///
/// Entries are append-only: a task's cell is created on first request,
/// resolved exactly once, and then shared by every later requester.
#[derive(Debug)]
pub struct MemoCache<K, X> {
    cells: HashMap<K, Arc<OnceSlot<X>>>,
}

impl<K, X> MemoCache<K, X>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    X: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Return the cell for `key`, creating it (and making the caller its
    /// owner) if this is the first request.
    pub fn claim(&mut self, key: &K) -> Claim<X> {
        if let Some(slot) = self.cells.get(key) {
            trace!(?key, "memo hit");
            return Claim::Waiter(Arc::clone(slot));
        }

        trace!(?key, "memo miss; claiming cell");
        let slot = Arc::new(OnceSlot::new());
        self.cells.insert(key.clone(), Arc::clone(&slot));
        Claim::Owner(slot)
    }

    /// Published value for `key`, if its computation has finished.
    pub fn get(&self, key: &K) -> Option<X> {
        self.cells.get(key).and_then(|slot| slot.get())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cells.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, X> Default for MemoCache<K, X>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    X: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
