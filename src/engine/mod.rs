// src/engine/mod.rs

//! Evaluation engine for dynadag.
//!
//! This module ties together:
//! - the memo cache, cycle detector and target store, all guarded by one
//!   lock ([`state`])
//! - the callbacks producers use during a step ([`context`])
//! - the scheduler loop that reduces steps to outcomes ([`scheduler`])

pub mod context;
pub mod scheduler;
pub mod state;

pub use context::StepContext;
pub use scheduler::Scheduler;
pub use state::{EngineState, EngineStats, SharedState};
