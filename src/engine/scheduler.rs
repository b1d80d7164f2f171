// src/engine/scheduler.rs

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::{BoxFuture, FutureExt, join_all};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::context::StepContext;
use crate::engine::state::{EngineStats, SharedState};
use crate::errors::{ContractViolation, Result};
use crate::exec::blocking::run_job;
use crate::exec::{BoundedExecutor, ScopedLocks};
use crate::task::{Failure, Outcome, Producer, Step, Task};
use crate::types::TargetId;

type TaskOf<P> = <P as Producer>::Task;
type ValueOf<P> = <P as Producer>::Value;
type OutcomeOf<P> = Outcome<TaskOf<P>, ValueOf<P>>;

/// Drives a [`Producer`] over a dependency graph that is revealed as it is
/// evaluated.
///
/// For each requested task the scheduler:
/// - memoizes cacheable tasks so their step runs at most once per session
/// - asks the producer for one step and reduces the returned [`Step`],
///   evaluating sub-tasks (concurrently for `DependsOnMany`)
/// - sends blocking work to the bounded pool
/// - records every request edge with the cycle detector and fails the
///   requester as soon as a cycle closes
/// - routes `DuplicateTarget` redirects to the target store
///
/// Cloning is cheap and clones share the session: memo cache, cycle
/// detector and target store live as long as the last clone.
pub struct Scheduler<P: Producer> {
    inner: Arc<Inner<P>>,
}

struct Inner<P: Producer> {
    producer: P,
    state: SharedState<P::Task, P::Value>,
    executor: BoundedExecutor,
    locks: ScopedLocks,
}

impl<P: Producer> Clone for Scheduler<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Producer> fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("executor", &self.inner.executor)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<P: Producer> Scheduler<P> {
    /// Construct a scheduler with services sized from `config`.
    pub fn new(producer: P, config: &EngineConfig) -> Self {
        Self::with_services(
            producer,
            BoundedExecutor::new(config.blocking_workers),
            ScopedLocks::new(),
        )
    }

    /// Construct a scheduler sharing externally owned services.
    pub fn with_services(producer: P, executor: BoundedExecutor, locks: ScopedLocks) -> Self {
        Self {
            inner: Arc::new(Inner {
                producer,
                state: SharedState::new(),
                executor,
                locks,
            }),
        }
    }

    pub fn producer(&self) -> &P {
        &self.inner.producer
    }

    pub fn executor(&self) -> &BoundedExecutor {
        &self.inner.executor
    }

    /// Evaluate `roots` concurrently and return each root's outcome.
    ///
    /// A failing root never affects the others. The only error is a
    /// contract violation by the producer (see [`ContractViolation`]),
    /// reported after every root has finished.
    pub async fn evaluate(
        &self,
        roots: Vec<TaskOf<P>>,
    ) -> Result<HashMap<TaskOf<P>, OutcomeOf<P>>> {
        info!(roots = roots.len(), "evaluation started");

        {
            let mut state = self.inner.state.lock();
            for root in &roots {
                state.cycles.register_root(root);
            }
        }

        let handles: Vec<_> = roots
            .iter()
            .cloned()
            .map(|root| tokio::spawn(Arc::clone(&self.inner).eval(root)))
            .collect();
        let joined = join_all(handles).await;

        let mut outcomes = HashMap::with_capacity(roots.len());
        let mut failed = 0usize;
        for (root, joined) in roots.into_iter().zip(joined) {
            let outcome = joined.unwrap_or_else(|err| {
                warn!(task = ?root, error = %err, "root evaluation did not complete");
                Err(Failure::Abandoned { task: root.clone() })
            });
            if let Err(failure) = &outcome {
                failed += 1;
                warn!(task = ?root, %failure, "root failed");
            }
            outcomes.insert(root, outcome);
        }

        let violations = std::mem::take(&mut self.inner.state.lock().violations);
        if let Some(violation) = violations.into_iter().next() {
            warn!(%violation, "producer violated the engine contract");
            return Err(violation.into());
        }

        info!(
            roots = outcomes.len(),
            failed,
            stats = ?self.stats(),
            "evaluation finished"
        );
        Ok(outcomes)
    }

    /// Evaluate a single root.
    pub async fn evaluate_one(&self, root: TaskOf<P>) -> Result<OutcomeOf<P>> {
        let mut outcomes = self.evaluate(vec![root.clone()]).await?;
        Ok(outcomes
            .remove(&root)
            .unwrap_or(Err(Failure::Abandoned { task: root })))
    }

    /// Memoized outcome of `task`, if it has been computed in this session.
    pub fn memoized(&self, task: &TaskOf<P>) -> Option<OutcomeOf<P>> {
        self.inner.state.lock().memo.get(task)
    }

    pub fn stats(&self) -> EngineStats {
        self.inner.state.lock().stats()
    }
}

impl<P: Producer> Inner<P> {
    /// Evaluate one task, going through the memo cache if it is cacheable.
    fn eval(self: Arc<Self>, task: TaskOf<P>) -> BoxFuture<'static, OutcomeOf<P>> {
        async move {
            if !task.is_cacheable() {
                return self.compute(task).await;
            }

            let claim = self.state.lock().memo.claim(&task);
            let slot = Arc::clone(claim.slot());

            if claim.is_owner() {
                // The computation gets its own task so it publishes even if
                // this requester stops waiting.
                let inner = Arc::clone(&self);
                let owned = task.clone();
                let publish_to = Arc::clone(&slot);
                tokio::spawn(async move {
                    let outcome = inner.compute(owned).await;
                    publish_to.publish(outcome);
                });
            } else {
                debug!(?task, "awaiting memoized task");
            }

            slot.wait()
                .await
                .unwrap_or(Err(Failure::Abandoned { task }))
        }
        .boxed()
    }

    /// Run the producer's step for `task` and reduce it to an outcome.
    async fn compute(self: Arc<Self>, task: TaskOf<P>) -> OutcomeOf<P> {
        debug!(?task, "stepping task");
        let (first, claims) = self.first_step(&task);

        let outcome = match first {
            Ok(step) => AssertUnwindSafe(Arc::clone(&self).reduce(task.clone(), step, &claims))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!(?task, "task evaluation panicked");
                    Err(Failure::Abandoned { task: task.clone() })
                }),
            Err(err) => Err(Failure::from_error(task.clone(), err)),
        };

        if !claims.is_empty() {
            self.publish_targets(&task, &claims, &outcome);
        }

        match &outcome {
            Ok(_) => debug!(?task, "task completed"),
            Err(failure) => debug!(?task, %failure, "task failed"),
        }
        outcome
    }

    fn first_step(
        &self,
        task: &TaskOf<P>,
    ) -> (anyhow::Result<Step<TaskOf<P>, ValueOf<P>>>, Vec<TargetId>) {
        let cx = StepContext::new(self.state.clone(), task.clone());
        let step = catch_unwind(AssertUnwindSafe(|| self.producer.step(task, &cx)))
            .unwrap_or_else(|_| Err(anyhow!("producer step panicked")));
        (step, cx.into_claims())
    }

    /// Trampoline over continuations until a terminal outcome.
    async fn reduce(
        self: Arc<Self>,
        task: TaskOf<P>,
        mut step: Step<TaskOf<P>, ValueOf<P>>,
        claims: &[TargetId],
    ) -> OutcomeOf<P> {
        loop {
            debug!(?task, kind = step.kind(), "reducing step");

            let next = match step {
                Step::Done(value) => return Ok(value),
                Step::DependsOnOne(sub, then) => {
                    self.relate(&task, std::slice::from_ref(&sub))?;
                    let value = Arc::clone(&self)
                        .eval(sub)
                        .await
                        .map_err(|cause| Failure::dependency(task.clone(), cause))?;
                    then(value)
                }
                Step::DependsOnMany(subs, then) => {
                    self.relate(&task, &subs)?;
                    let values = Arc::clone(&self).fan_out(&task, subs).await?;
                    then(values)
                }
                Step::Blocking(job) => {
                    let (parts, then) = job.into_parts();
                    let outcome = run_job(&self.executor, &self.locks, parts)
                        .await
                        .map_err(|err| Failure::step(task.clone(), err));
                    then(outcome)
                }
                Step::DuplicateTarget(id) => return self.await_target(&task, id, claims).await,
            };

            step = next.map_err(|err| Failure::from_error(task.clone(), err))?;
        }
    }

    /// Register `parent -> child` for each child; fails on the first cycle.
    fn relate(
        &self,
        parent: &TaskOf<P>,
        children: &[TaskOf<P>],
    ) -> std::result::Result<(), Failure<TaskOf<P>>> {
        let mut state = self.state.lock();
        for child in children {
            if let Err(path) = state.cycles.add_relation(parent, child) {
                return Err(Failure::CycleFound { path });
            }
        }
        Ok(())
    }

    /// Evaluate `subs` concurrently and collect their values in request order.
    ///
    /// Every sub-task runs to completion even if a sibling fails; the first
    /// failure (in request order) is reported once all have finished.
    async fn fan_out(
        self: Arc<Self>,
        task: &TaskOf<P>,
        subs: Vec<TaskOf<P>>,
    ) -> std::result::Result<Vec<ValueOf<P>>, Failure<TaskOf<P>>> {
        let handles: Vec<_> = subs
            .iter()
            .cloned()
            .map(|sub| tokio::spawn(Arc::clone(&self).eval(sub)))
            .collect();
        let joined = join_all(handles).await;

        let mut values = Vec::with_capacity(subs.len());
        let mut first_failure = None;
        for (sub, joined) in subs.into_iter().zip(joined) {
            match joined {
                Ok(Ok(value)) => values.push(value),
                Ok(Err(failure)) => {
                    first_failure.get_or_insert(failure);
                }
                Err(err) => {
                    warn!(task = ?sub, error = %err, "sub-task evaluation did not complete");
                    first_failure.get_or_insert(Failure::Abandoned { task: sub });
                }
            }
        }

        match first_failure {
            Some(cause) => Err(Failure::dependency(task.clone(), cause)),
            None => Ok(values),
        }
    }

    /// Wait for the owner of `id` to publish its outcome.
    async fn await_target(
        &self,
        task: &TaskOf<P>,
        id: TargetId,
        claims: &[TargetId],
    ) -> OutcomeOf<P> {
        if claims.contains(&id) {
            let violation = ContractViolation::SelfRedirect(id);
            self.state.lock().violations.push(violation.clone());
            return Err(Failure::step(task.clone(), violation.into()));
        }

        let slot = self.state.lock().targets.get_or_create(&id);
        debug!(?task, target_id = %id, "waiting for duplicate target");

        match slot.wait().await {
            Some(Ok(value)) => Ok(value),
            Some(Err(cause)) => Err(Failure::TargetFailed {
                target: id,
                cause: Box::new(cause),
            }),
            None => Err(Failure::Abandoned { task: task.clone() }),
        }
    }

    fn publish_targets(&self, task: &TaskOf<P>, claims: &[TargetId], outcome: &OutcomeOf<P>) {
        let mut state = self.state.lock();
        for id in claims {
            match state.targets.publish(id, outcome.clone()) {
                Ok(()) => debug!(?task, target_id = %id, ok = outcome.is_ok(), "published target"),
                Err(violation) => {
                    warn!(?task, %violation, "target published twice");
                    state.violations.push(violation);
                }
            }
        }
    }
}
