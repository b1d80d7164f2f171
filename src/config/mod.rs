// src/config/mod.rs

//! Manifest and engine configuration.
//!
//! - [`model`] holds the serde types for the TOML manifest.
//! - [`loader`] reads a manifest from disk.
//! - [`validate`] turns a [`RawManifest`] into a checked [`Manifest`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_manifest_path, load_and_validate, load_from_path};
pub use model::{EngineConfig, Manifest, RawManifest, TaskSpec};
