// src/store/fingerprint.rs

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::types::TargetId;

/// Build state of one target identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintState<V> {
    NotStarted,
    Started,
    Succeeded(V),
    Failed,
}

/// In-memory fingerprint store deciding who builds a target.
///
/// Producers call [`FingerprintStore::try_start`] before building a target.
/// Exactly one concurrent caller gets `already_started = false` and becomes
/// the builder; everyone else should redirect with
/// [`crate::task::Step::DuplicateTarget`] (or reuse the prior value).
///
/// Persistence across sessions is out of scope; this store lives as long
/// as the producer that owns it.
#[derive(Debug)]
pub struct FingerprintStore<V> {
    states: Mutex<HashMap<TargetId, FingerprintState<V>>>,
}

impl<V: Clone> FingerprintStore<V> {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Try to become the builder of `id`.
    ///
    /// Returns `(already_started, prior_state)`:
    /// - `Started` / `Succeeded(_)`: `already_started = true`, state unchanged.
    /// - `NotStarted` / `Failed`: state becomes `Started` and
    ///   `already_started = false`; the caller now owns the build.
    pub fn try_start(&self, id: &TargetId) -> (bool, FingerprintState<V>) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let prior = states
            .get(id)
            .cloned()
            .unwrap_or(FingerprintState::NotStarted);

        match prior {
            FingerprintState::Started | FingerprintState::Succeeded(_) => {
                debug!(target_id = %id, "fingerprint: target already started");
                (true, prior)
            }
            FingerprintState::NotStarted | FingerprintState::Failed => {
                states.insert(id.clone(), FingerprintState::Started);
                debug!(target_id = %id, "fingerprint: target started");
                (false, prior)
            }
        }
    }

    pub fn mark_succeeded(&self, id: &TargetId, value: V) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.insert(id.clone(), FingerprintState::Succeeded(value));
    }

    pub fn mark_failed(&self, id: &TargetId) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.insert(id.clone(), FingerprintState::Failed);
    }

    /// Put `id` back into `state`, undoing a `try_start` whose build was
    /// handed to someone else.
    pub fn revert(&self, id: &TargetId, state: FingerprintState<V>) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        match state {
            FingerprintState::NotStarted => {
                states.remove(id);
            }
            other => {
                states.insert(id.clone(), other);
            }
        }
    }

    pub fn state(&self, id: &TargetId) -> FingerprintState<V> {
        let states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .get(id)
            .cloned()
            .unwrap_or(FingerprintState::NotStarted)
    }
}

impl<V: Clone> Default for FingerprintStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
