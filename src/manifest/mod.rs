// src/manifest/mod.rs

//! A reference front end: a [`crate::task::Producer`] whose tasks come from
//! a TOML manifest and whose build steps are shell commands.
//!
//! - [`producer`] maps manifest entries onto engine steps.
//! - [`shell`] runs a command on the blocking pool.

pub mod producer;
pub mod shell;

pub use producer::{ManifestProducer, ManifestTask};
pub use shell::run_shell;
