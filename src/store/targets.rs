// src/store/targets.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::errors::ContractViolation;
use crate::store::slot::OnceSlot;
use crate::types::TargetId;

#[derive(Debug)]
struct TargetEntry<X> {
    slot: Arc<OnceSlot<X>>,
    /// Whether some evaluation has claimed ownership of this target.
    owned: bool,
}

/// Deduplication of physical build artifacts across task identities.
///
/// Memoization keys on the task; this store keys on the content-derived
/// [`TargetId`], so two different tasks that build the same artifact
/// share one result. Entries are created lazily by whichever arrives first:
/// the owner claiming the target, or a `DuplicateTarget` redirect.
#[derive(Debug)]
pub struct TargetStore<X> {
    entries: HashMap<TargetId, TargetEntry<X>>,
}

impl<X: Clone + Send + Sync> TargetStore<X> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn entry(&mut self, id: &TargetId) -> &mut TargetEntry<X> {
        self.entries
            .entry(id.clone())
            .or_insert_with(|| TargetEntry {
                slot: Arc::new(OnceSlot::new()),
                owned: false,
            })
    }

    /// Cell for `id`, created empty if nobody referenced it yet.
    pub fn get_or_create(&mut self, id: &TargetId) -> Arc<OnceSlot<X>> {
        Arc::clone(&self.entry(id).slot)
    }

    /// Register the caller as the single evaluation that will publish `id`.
    pub fn claim(&mut self, id: &TargetId) -> Result<Arc<OnceSlot<X>>, ContractViolation> {
        let entry = self.entry(id);
        if entry.owned {
            return Err(ContractViolation::TargetClaimedTwice(id.clone()));
        }
        entry.owned = true;
        debug!(target_id = %id, "target claimed");
        Ok(Arc::clone(&entry.slot))
    }

    /// Publish the result for `id`; the first writer wins and a second
    /// publish is a contract violation.
    pub fn publish(&mut self, id: &TargetId, value: X) -> Result<(), ContractViolation> {
        let entry = self.entry(id);
        if entry.slot.publish(value) {
            debug!(target_id = %id, "target published");
            Ok(())
        } else {
            Err(ContractViolation::TargetPublishedTwice(id.clone()))
        }
    }

    pub fn slot(&self, id: &TargetId) -> Option<Arc<OnceSlot<X>>> {
        self.entries.get(id).map(|e| Arc::clone(&e.slot))
    }

    pub fn is_ready(&self, id: &TargetId) -> bool {
        self.entries.get(id).is_some_and(|e| e.slot.is_set())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<X: Clone + Send + Sync> Default for TargetStore<X> {
    fn default() -> Self {
        Self::new()
    }
}
