// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod manifest;
pub mod store;
pub mod task;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{Manifest, load_and_validate};
use crate::manifest::{ManifestProducer, ManifestTask};

pub use crate::engine::{Scheduler, StepContext};
pub use crate::errors::{ContractViolation, DynadagError};
pub use crate::task::{BlockingJob, Failure, Outcome, Producer, Step, Task, Value};
pub use crate::types::TargetId;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading + validation
/// - the manifest producer and the scheduler
/// - evaluation of the requested roots and reporting
///
/// Returns an error when any requested root failed.
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = args.manifest.clone();
    let mut manifest = load_and_validate(&manifest_path)?;

    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            bail!("--jobs must be >= 1");
        }
        manifest.engine.blocking_workers = jobs;
    }

    let roots = requested_roots(&manifest, &args.task)?;

    if args.dry_run {
        print_dry_run(&manifest, &roots);
        return Ok(());
    }

    let engine = manifest.engine.clone();
    let producer = ManifestProducer::new(manifest, manifest_root_dir(&manifest_path));
    let scheduler = Scheduler::new(producer, &engine);

    let tasks: Vec<ManifestTask> = roots.iter().cloned().map(ManifestTask::Named).collect();
    info!(?roots, "evaluating roots");
    let results = scheduler.evaluate(tasks.clone()).await?;
    debug!(stats = ?scheduler.stats(), "evaluation finished");

    let mut failed = 0usize;
    for task in &tasks {
        match results.get(task) {
            Some(Ok(value)) => println!("{}: {}", task.name(), value),
            Some(Err(failure)) => {
                failed += 1;
                println!("{}: FAILED: {}", task.name(), failure);
            }
            None => {
                failed += 1;
                println!("{}: FAILED: no outcome", task.name());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} task(s) failed", tasks.len());
    }
    Ok(())
}

/// Directory commands run in by default.
///
/// - If the manifest path has a non-empty parent (e.g. "build/Dynadag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Dynadag.toml" (parent = ""),
///   we fall back to the current working directory "."
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// `--task` selections, or every manifest root when none were given.
fn requested_roots(manifest: &Manifest, selected: &[String]) -> Result<Vec<String>> {
    if selected.is_empty() {
        return Ok(manifest.roots());
    }
    for name in selected {
        if manifest.get(name).is_none() {
            bail!("unknown task '{name}' passed to --task");
        }
    }
    Ok(selected.to_vec())
}

/// Simple dry-run output: print engine sizing, tasks and roots.
fn print_dry_run(manifest: &Manifest, roots: &[String]) {
    println!("dynadag dry-run");
    println!(
        "  engine.blocking_workers = {}",
        manifest.engine.blocking_workers
    );
    println!("  roots = {:?}", roots);
    println!();

    println!("tasks ({}):", manifest.task.len());
    for (name, task) in manifest.task.iter() {
        println!("  - {name}");
        if let Some(ref cmd) = task.cmd {
            println!("      cmd: {cmd}");
        }
        if let Some(ref value) = task.value {
            println!("      value: {value}");
        }
        if !task.after.is_empty() {
            println!("      after: {:?}", task.after);
        }
        if let Some(ref dir) = task.dir {
            println!("      dir: {}", dir.display());
        }
        if let Some(ref target) = task.target {
            println!("      target: {target}");
        }
    }

    debug!("dry-run complete (no execution)");
}
