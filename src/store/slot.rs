// src/store/slot.rs

use tokio::sync::watch;

/// Single-assignment cell that any number of tasks can await.
///
/// The first `publish` wins; later ones are ignored and reported as `false`.
#[derive(Debug)]
pub struct OnceSlot<X> {
    tx: watch::Sender<Option<X>>,
}

impl<X: Clone + Send + Sync> OnceSlot<X> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Store `value` if the slot is still empty. Returns whether it was stored.
    pub fn publish(&self, value: X) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                false
            } else {
                *current = Some(value);
                true
            }
        })
    }

    pub fn is_set(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Current value, if published.
    pub fn get(&self) -> Option<X> {
        self.tx.borrow().clone()
    }

    /// Wait until a value is published and return a clone of it.
    ///
    /// Returns `None` only if the slot is dropped while waiting, which cannot
    /// happen while the caller holds a reference to it.
    pub async fn wait(&self) -> Option<X> {
        let mut rx = self.tx.subscribe();
        let value = rx.wait_for(Option::is_some).await.ok()?;
        value.clone()
    }
}

impl<X: Clone + Send + Sync> Default for OnceSlot<X> {
    fn default() -> Self {
        Self::new()
    }
}
