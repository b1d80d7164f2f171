// src/config/model.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level manifest as read from a TOML file, before validation.
///
/// ```toml
/// [engine]
/// blocking_workers = 4
///
/// [task.codegen]
/// cmd = "./gen.sh"
///
/// [task.compile]
/// after = ["codegen"]
/// cmd = "cc -c main.c"
/// dir = "build"
/// target = "build/main.o"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    /// Engine sizing from `[engine]`.
    #[serde(default)]
    pub engine: EngineConfig,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskSpec>,
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of blocking jobs running at once.
    ///
    /// Defaults to the number of available CPUs.
    #[serde(default = "default_blocking_workers")]
    pub blocking_workers: usize,
}

pub(crate) fn default_blocking_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            blocking_workers: default_blocking_workers(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskSpec {
    /// Tasks whose values this task needs, evaluated concurrently.
    #[serde(default)]
    pub after: Vec<String>,

    /// Shell command producing this task's value (its trimmed stdout).
    #[serde(default)]
    pub cmd: Option<String>,

    /// Working directory of `cmd`; also the key of the directory lock held
    /// while it runs.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Identity of the artifact `cmd` builds. Tasks sharing a `target`
    /// build it once.
    #[serde(default)]
    pub target: Option<String>,

    /// Literal value for tasks without `cmd`.
    #[serde(default)]
    pub value: Option<String>,
}

/// A validated manifest.
///
/// Only constructed through `TryFrom<RawManifest>`, so every `after` entry
/// names a known task. Dependency cycles are *not* rejected here; the
/// engine reports them while evaluating.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub engine: EngineConfig,
    pub task: BTreeMap<String, TaskSpec>,
}

impl Manifest {
    pub(crate) fn new_unchecked(engine: EngineConfig, task: BTreeMap<String, TaskSpec>) -> Self {
        Self { engine, task }
    }

    pub fn get(&self, name: &str) -> Option<&TaskSpec> {
        self.task.get(name)
    }

    /// Tasks no other task depends on (the final artifacts).
    ///
    /// Falls back to every task when all of them are depended on, which
    /// only happens when the manifest contains a cycle.
    pub fn roots(&self) -> Vec<String> {
        let depended_on: BTreeSet<&str> = self
            .task
            .values()
            .flat_map(|t| t.after.iter().map(|s| s.as_str()))
            .collect();

        let roots: Vec<String> = self
            .task
            .keys()
            .filter(|name| !depended_on.contains(name.as_str()))
            .cloned()
            .collect();

        if roots.is_empty() {
            self.task.keys().cloned().collect()
        } else {
            roots
        }
    }
}
