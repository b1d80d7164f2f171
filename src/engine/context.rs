// src/engine/context.rs

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::engine::state::SharedState;
use crate::errors::ContractViolation;
use crate::task::{Task, Value};
use crate::types::TargetId;

/// Engine callbacks available to [`crate::task::Producer::step`].
///
/// Each callback takes the engine's bookkeeping lock only for the duration
/// of the call.
pub struct StepContext<T: Task, V: Value> {
    state: SharedState<T, V>,
    task: T,
    claimed: Mutex<Vec<TargetId>>,
}

impl<T: Task, V: Value> StepContext<T, V> {
    pub(crate) fn new(state: SharedState<T, V>, task: T) -> Self {
        Self {
            state,
            task,
            claimed: Mutex::new(Vec::new()),
        }
    }

    /// The task being stepped.
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Declare that this evaluation builds the physical target `id`.
    ///
    /// When the evaluation finishes, its outcome (value or failure) is
    /// published under `id`, releasing every task that redirected there
    /// with [`crate::task::Step::DuplicateTarget`]. Claiming an id that
    /// was already claimed in this session is a contract violation.
    pub fn claim_target(&self, id: impl Into<TargetId>) -> Result<(), ContractViolation> {
        let id = id.into();
        {
            let mut state = self.state.lock();
            if let Err(violation) = state.targets.claim(&id) {
                state.violations.push(violation.clone());
                return Err(violation);
            }
        }
        debug!(task = ?self.task, target_id = %id, "task claimed target");
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
        Ok(())
    }

    /// Like [`StepContext::claim_target`], but an id this session already
    /// handed to another evaluation is not a violation: returns `false` and
    /// the caller is expected to redirect with
    /// [`crate::task::Step::DuplicateTarget`] instead.
    pub fn try_claim_target(&self, id: impl Into<TargetId>) -> bool {
        let id = id.into();
        if self.state.lock().targets.claim(&id).is_err() {
            debug!(task = ?self.task, target_id = %id, "target already owned in this session");
            return false;
        }
        debug!(task = ?self.task, target_id = %id, "task claimed target");
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
        true
    }

    /// Whether some evaluation already published `id`.
    pub fn is_target_ready(&self, id: &TargetId) -> bool {
        self.state.lock().targets.is_ready(id)
    }

    pub(crate) fn into_claims(self) -> Vec<TargetId> {
        self.claimed
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Task, V: Value> fmt::Debug for StepContext<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}
