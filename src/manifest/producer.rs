// src/manifest/producer.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::config::{Manifest, TaskSpec};
use crate::engine::StepContext;
use crate::manifest::shell::run_shell;
use crate::store::{FingerprintState, FingerprintStore};
use crate::task::{BlockingJob, Producer, Step, Task};
use crate::types::TargetId;

/// Tasks understood by [`ManifestProducer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ManifestTask {
    /// Evaluate a named manifest task: its dependencies, then its value.
    Named(String),
    /// Build the artifact of a named task by running its command.
    Build(String),
}

impl ManifestTask {
    pub fn named(name: impl Into<String>) -> Self {
        ManifestTask::Named(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ManifestTask::Named(name) | ManifestTask::Build(name) => name,
        }
    }
}

impl Task for ManifestTask {
    fn is_notable(&self) -> bool {
        matches!(self, ManifestTask::Named(_))
    }
}

/// A [`Producer`] driven by a validated [`Manifest`].
///
/// Commands run as blocking jobs in `root` (joined with the task's `dir`).
/// Before building, the producer asks its [`FingerprintStore`] whether the
/// target is already being built, and the session whether it already owns
/// the target; either way it redirects with [`Step::DuplicateTarget`]
/// instead of running the command again.
#[derive(Debug)]
pub struct ManifestProducer {
    manifest: Manifest,
    root: PathBuf,
    fingerprints: Arc<FingerprintStore<String>>,
}

impl ManifestProducer {
    pub fn new(manifest: Manifest, root: impl Into<PathBuf>) -> Self {
        Self::with_fingerprints(manifest, root, Arc::new(FingerprintStore::new()))
    }

    /// Share a fingerprint store, e.g. across several sessions.
    pub fn with_fingerprints(
        manifest: Manifest,
        root: impl Into<PathBuf>,
        fingerprints: Arc<FingerprintStore<String>>,
    ) -> Self {
        Self {
            manifest,
            root: root.into(),
            fingerprints,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn fingerprints(&self) -> &Arc<FingerprintStore<String>> {
        &self.fingerprints
    }

    /// Root tasks of the manifest, ready to pass to `Scheduler::evaluate`.
    pub fn root_tasks(&self) -> Vec<ManifestTask> {
        self.manifest
            .roots()
            .into_iter()
            .map(ManifestTask::Named)
            .collect()
    }

    fn spec(&self, name: &str) -> Result<&TaskSpec> {
        self.manifest
            .get(name)
            .ok_or_else(|| anyhow!("unknown manifest task '{name}'"))
    }

    fn work_dir(&self, spec: &TaskSpec) -> PathBuf {
        match &spec.dir {
            Some(dir) => self.root.join(dir),
            None => self.root.clone(),
        }
    }

    /// Identity of the artifact a task builds.
    ///
    /// An explicit `target` wins; otherwise the command and its working
    /// directory define the artifact, so identical commands dedupe.
    pub fn target_of(&self, spec: &TaskSpec) -> Option<TargetId> {
        if let Some(target) = &spec.target {
            return Some(TargetId::new(target.as_str()));
        }
        let cmd = spec.cmd.as_deref()?;
        let dir = self.work_dir(spec);
        Some(TargetId::from_content([
            cmd.as_bytes(),
            dir.as_os_str().as_encoded_bytes(),
        ]))
    }

    fn step_named(&self, name: &str) -> Result<Step<ManifestTask, String>> {
        let spec = self.spec(name)?;
        let deps: Vec<ManifestTask> = spec.after.iter().cloned().map(ManifestTask::Named).collect();

        let build = spec.cmd.as_ref().map(|_| ManifestTask::Build(name.to_string()));
        let literal = spec.value.clone();
        let finish = move |values: Vec<String>| -> Result<Step<ManifestTask, String>> {
            Ok(match build {
                Some(build) => Step::depends_on(build, |value| Ok(Step::done(value))),
                None => Step::done(literal.unwrap_or_else(|| values.join(","))),
            })
        };

        if deps.is_empty() {
            finish(Vec::new())
        } else {
            Ok(Step::depends_on_many(deps, finish))
        }
    }

    fn step_build(
        &self,
        name: &str,
        cx: &StepContext<ManifestTask, String>,
    ) -> Result<Step<ManifestTask, String>> {
        let spec = self.spec(name)?;
        let cmd = spec
            .cmd
            .clone()
            .with_context(|| format!("task '{name}' has no `cmd` to build"))?;
        let id = self
            .target_of(spec)
            .with_context(|| format!("task '{name}' has no target identity"))?;

        let (already_started, prior) = self.fingerprints.try_start(&id);
        if already_started {
            debug!(task = %name, target_id = %id, "target already started elsewhere");
            return Ok(match prior {
                FingerprintState::Succeeded(value) => Step::done(value),
                _ => Step::DuplicateTarget(id),
            });
        }

        // A build that failed earlier in this session leaves the fingerprint
        // restartable, but the session's outcome for the target is final.
        if !cx.try_claim_target(id.clone()) {
            self.fingerprints.revert(&id, prior);
            return Ok(Step::DuplicateTarget(id));
        }

        let dir = self.work_dir(spec);
        let fingerprints = Arc::clone(&self.fingerprints);
        let job = BlockingJob::new({
            let dir = dir.clone();
            move || run_shell(&cmd, &dir)
        })
        .then(move |outcome| {
            match &outcome {
                Ok(value) => fingerprints.mark_succeeded(&id, value.clone()),
                Err(_) => fingerprints.mark_failed(&id),
            }
            Ok(Step::Done(outcome?))
        });

        Ok(lock_if_scoped(job, spec, &dir).into_step())
    }
}

/// Tasks with an explicit `dir` hold that directory's lock while building.
fn lock_if_scoped(
    job: BlockingJob<ManifestTask, String>,
    spec: &TaskSpec,
    dir: &Path,
) -> BlockingJob<ManifestTask, String> {
    if spec.dir.is_some() {
        job.lock(dir)
    } else {
        job
    }
}

impl Producer for ManifestProducer {
    type Task = ManifestTask;
    type Value = String;

    fn step(
        &self,
        task: &ManifestTask,
        cx: &StepContext<ManifestTask, String>,
    ) -> Result<Step<ManifestTask, String>> {
        match task {
            ManifestTask::Named(name) => self.step_named(name),
            ManifestTask::Build(name) => self.step_build(name, cx),
        }
    }
}
