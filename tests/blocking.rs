// tests/blocking.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use dynadag::exec::{BoundedExecutor, ScopedLocks};
use dynadag::{BlockingJob, Failure, Step, StepContext};
use dynadag_test_utils::builders::{Node, ProducerBuilder};
use dynadag_test_utils::probe::ConcurrencyProbe;
use dynadag_test_utils::{init_tracing, scheduler, with_timeout};

type Script = Box<dyn Fn(&StepContext<Node, i32>) -> anyhow::Result<Step<Node, i32>> + Send + Sync>;

fn counting_post(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn post_runs_once_when_body_panics() {
    init_tracing();

    let posts = Arc::new(AtomicUsize::new(0));
    let script: Script = {
        let posts = Arc::clone(&posts);
        Box::new(move |_| {
            Ok(BlockingJob::new(|| -> anyhow::Result<i32> { panic!("native code crashed") })
                .post(counting_post(&posts))
                .into_step())
        })
    };
    let producer = ProducerBuilder::new().on("crash", script).build();
    let sched = scheduler(producer, 1);

    let failure = with_timeout(sched.evaluate_one(Node::plain("crash")))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(posts.load(Ordering::SeqCst), 1);
    assert!(matches!(failure, Failure::Step { .. }), "{failure:?}");
    assert!(failure.to_string().contains("panicked"));
}

#[tokio::test]
async fn failing_pre_skips_the_body() {
    init_tracing();

    let posts = Arc::new(AtomicUsize::new(0));
    let bodies = Arc::new(AtomicUsize::new(0));
    let script: Script = {
        let posts = Arc::clone(&posts);
        let bodies = Arc::clone(&bodies);
        Box::new(move |_| {
            let bodies = Arc::clone(&bodies);
            Ok(BlockingJob::new(move || {
                bodies.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .pre(|| Err(anyhow!("no scratch dir")))
            .post(counting_post(&posts))
            .into_step())
        })
    };
    let producer = ProducerBuilder::new().on("job", script).build();
    let sched = scheduler(producer, 1);

    let failure = with_timeout(sched.evaluate_one(Node::plain("job")))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(bodies.load(Ordering::SeqCst), 0);
    assert_eq!(posts.load(Ordering::SeqCst), 1);
    assert!(failure.to_string().contains("no scratch dir"));
}

#[tokio::test]
async fn continuation_can_recover_from_a_failed_body() {
    init_tracing();

    let producer = ProducerBuilder::<i32>::new()
        .on("fallback", |_| {
            Ok(BlockingJob::new(|| -> anyhow::Result<i32> { Err(anyhow!("missing")) })
                .then(|outcome| Ok(Step::done(outcome.unwrap_or(-1))))
                .into_step())
        })
        .build();
    let sched = scheduler(producer, 1);

    let value = sched.evaluate_one(Node::plain("fallback")).await.unwrap().unwrap();

    assert_eq!(value, -1);
}

#[tokio::test]
async fn pool_never_exceeds_its_worker_count() {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let mut builder = ProducerBuilder::<i32>::new();
    for i in 0..8 {
        let probe = probe.clone();
        builder = builder.on(&format!("job{i}"), move |_| {
            let probe = probe.clone();
            Ok(BlockingJob::new(move || {
                let _inside = probe.enter();
                std::thread::sleep(Duration::from_millis(20));
                Ok(i)
            })
            .into_step())
        });
    }
    let producer = builder.build();
    let sched = scheduler(producer, 2);

    let roots: Vec<Node> = (0..8).map(|i| Node::plain(&format!("job{i}"))).collect();
    let results = with_timeout(sched.evaluate(roots)).await.unwrap();

    assert!(results.values().all(|r| r.is_ok()));
    assert_eq!(probe.total(), 8);
    assert!(probe.peak() <= 2, "peak was {}", probe.peak());
    assert_eq!(sched.executor().available(), 2);
}

#[tokio::test]
async fn jobs_sharing_a_lock_never_overlap() {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let mut builder = ProducerBuilder::<i32>::new();
    for i in 0..4 {
        let probe = probe.clone();
        builder = builder.on(&format!("writer{i}"), move |_| {
            let probe = probe.clone();
            Ok(BlockingJob::new(move || {
                let _inside = probe.enter();
                std::thread::sleep(Duration::from_millis(15));
                Ok(i)
            })
            .lock("out/shared")
            .into_step())
        });
    }
    let sched = scheduler(builder.build(), 4);

    let roots: Vec<Node> = (0..4).map(|i| Node::plain(&format!("writer{i}"))).collect();
    let results = with_timeout(sched.evaluate(roots)).await.unwrap();

    assert!(results.values().all(|r| r.is_ok()));
    assert_eq!(probe.total(), 4);
    assert_eq!(probe.peak(), 1);
}

#[tokio::test]
async fn executor_clamps_workers_and_reports_panics() {
    let pool = BoundedExecutor::new(0);
    assert_eq!(pool.workers(), 1);

    assert_eq!(pool.submit(|| 2 + 2).await.unwrap(), 4);
    let err = pool.submit(|| -> u32 { panic!("boom") }).await.unwrap_err();
    assert!(err.to_string().contains("panicked"));
    assert_eq!(pool.available(), 1);
}

#[tokio::test]
async fn scoped_lock_is_released_after_the_body() {
    let locks = ScopedLocks::new();
    let key = std::path::Path::new("build/dir");

    let first = locks.with_lock(key, || async { 1 }).await;
    let second = with_timeout(locks.with_lock(key, || async { 2 })).await;

    assert_eq!(first + second, 3);
}
