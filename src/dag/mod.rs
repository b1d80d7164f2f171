// src/dag/mod.rs

//! Dependency graph bookkeeping.
//!
//! - [`graph`] holds the reduced graph among notable tasks.
//! - [`cycle`] maintains notable-ancestor sets and reports cycles as edges
//!   are discovered at run time.

pub mod cycle;
pub mod graph;

pub use cycle::CycleDetector;
pub use graph::NotableGraph;
