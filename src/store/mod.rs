// src/store/mod.rs

//! Session-scoped, append-only result stores.
//!
//! - [`slot`] is the single-assignment cell everything else is built on.
//! - [`memo`] memoizes cacheable tasks by task identity.
//! - [`targets`] deduplicates physical artifacts by target identity.
//! - [`fingerprint`] is an in-memory store deciding which evaluation builds
//!   a target; producers consult it, the scheduler never does.

pub mod fingerprint;
pub mod memo;
pub mod slot;
pub mod targets;

pub use fingerprint::{FingerprintState, FingerprintStore};
pub use memo::{Claim, MemoCache};
pub use slot::OnceSlot;
pub use targets::TargetStore;
