// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Per-task failures during evaluation are *values* (see
//! [`crate::task::Failure`]); the types here cover everything that is not a
//! task outcome: configuration problems and programming-contract violations.

use thiserror::Error;

use crate::types::TargetId;

/// Misuse of the engine's bookkeeping callbacks by a producer.
///
/// These never describe a failed build step. They mean the producer broke
/// one of the engine's ownership rules, so `Scheduler::evaluate` reports
/// them as an error instead of folding them into a root's outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("target '{0}' was claimed by more than one evaluation")]
    TargetClaimedTwice(TargetId),

    #[error("target '{0}' was published more than once")]
    TargetPublishedTwice(TargetId),

    #[error("task redirected to target '{0}', which its own evaluation owns")]
    SelfRedirect(TargetId),
}

#[derive(Error, Debug)]
pub enum DynadagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Engine contract violated: {0}")]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DynadagError>;
