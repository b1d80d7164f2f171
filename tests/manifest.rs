// tests/manifest.rs

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use dynadag::cli::CliArgs;
use dynadag::config::{Manifest, load_and_validate};
use dynadag::manifest::{ManifestProducer, ManifestTask};
use dynadag::store::FingerprintStore;
use dynadag::{Failure, Scheduler};
use dynadag_test_utils::{init_tracing, with_timeout};

fn write_manifest(dir: &TempDir, contents: &str) -> Manifest {
    let path = dir.path().join("Dynadag.toml");
    fs::write(&path, contents).unwrap();
    load_and_validate(&path).unwrap()
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).map(|s| s.lines().count()).unwrap_or(0)
}

fn scheduler_for(manifest: Manifest, dir: &TempDir) -> Scheduler<ManifestProducer> {
    let engine = manifest.engine.clone();
    Scheduler::new(ManifestProducer::new(manifest, dir.path()), &engine)
}

#[tokio::test]
async fn values_flow_from_dependencies() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[engine]
blocking_workers = 2

[task.gen]
cmd = "echo generated"

[task.lit]
value = "x"

[task.all]
after = ["gen", "lit"]
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let roots = sched.producer().root_tasks();
    assert_eq!(roots, vec![ManifestTask::named("all")]);

    let value = with_timeout(sched.evaluate_one(ManifestTask::named("all")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value, "generated,x");
}

#[tokio::test]
async fn shared_target_is_built_once() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.one]
cmd = "echo run >> builds.log && echo built"
target = "shared.o"

[task.two]
cmd = "echo run >> builds.log && echo built"
target = "shared.o"
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let roots = sched.producer().root_tasks();
    let results = with_timeout(sched.evaluate(roots)).await.unwrap();

    assert_eq!(results.len(), 2);
    for outcome in results.values() {
        assert_eq!(outcome.as_ref().unwrap(), "built");
    }
    assert_eq!(line_count(&dir.path().join("builds.log")), 1);
}

#[tokio::test]
async fn identical_commands_dedupe_without_explicit_target() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.left]
cmd = "echo x >> hits.log && echo same"

[task.right]
cmd = "echo x >> hits.log && echo same"

[task.top]
after = ["left", "right"]
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let value = with_timeout(sched.evaluate_one(ManifestTask::named("top")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(value, "same,same");
    assert_eq!(line_count(&dir.path().join("hits.log")), 1);
}

#[tokio::test]
async fn commands_run_in_their_directory() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("marker.txt"), "inside sub\n").unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.read]
cmd = "cat marker.txt"
dir = "sub"
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let value = with_timeout(sched.evaluate_one(ManifestTask::named("read")))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(value, "inside sub");
}

#[tokio::test]
async fn failing_command_fails_its_dependents() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.bad]
cmd = "echo oops >&2; exit 3"

[task.app]
after = ["bad"]
value = "never"
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let failure = with_timeout(sched.evaluate_one(ManifestTask::named("app")))
        .await
        .unwrap()
        .unwrap_err();

    let message = failure.to_string();
    assert!(message.contains("exited with code 3"), "{message}");
    assert!(message.contains("oops"), "{message}");
    assert!(matches!(failure, Failure::Dependency { .. }));
}

#[tokio::test]
async fn manifest_cycle_is_reported_at_runtime() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.a]
after = ["b"]

[task.b]
after = ["a"]
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let failure = with_timeout(sched.evaluate_one(ManifestTask::named("a")))
        .await
        .unwrap()
        .unwrap_err();

    let path = failure.cycle_path().expect("cycle path");
    assert_eq!(
        path,
        [ManifestTask::named("a"), ManifestTask::named("b"), ManifestTask::named("a")]
    );
}

#[tokio::test]
async fn fingerprints_carry_over_to_a_new_session() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.obj]
cmd = "echo run >> builds.log && echo obj"
"#,
    );
    let fingerprints = Arc::new(FingerprintStore::new());

    for _ in 0..2 {
        let producer =
            ManifestProducer::with_fingerprints(manifest.clone(), dir.path(), Arc::clone(&fingerprints));
        let sched = Scheduler::new(producer, &manifest.engine);
        let value = with_timeout(sched.evaluate_one(ManifestTask::named("obj")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, "obj");
    }

    assert_eq!(line_count(&dir.path().join("builds.log")), 1);
}

fn cli_args(manifest: &Path) -> CliArgs {
    CliArgs {
        manifest: manifest.to_path_buf(),
        task: Vec::new(),
        jobs: None,
        log_level: None,
        dry_run: false,
    }
}

#[tokio::test]
async fn run_reports_failed_roots_as_an_error() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_manifest(
        &dir,
        r#"
[task.ok]
value = "fine"

[task.broken]
cmd = "exit 1"
"#,
    );
    let path = dir.path().join("Dynadag.toml");

    let err = dynadag::run(cli_args(&path)).await.unwrap_err();
    assert!(err.to_string().contains("1 of 2"), "{err}");

    let only_ok = CliArgs {
        task: vec!["ok".to_string()],
        ..cli_args(&path)
    };
    dynadag::run(only_ok).await.unwrap();

    let dry = CliArgs {
        dry_run: true,
        ..cli_args(&path)
    };
    dynadag::run(dry).await.unwrap();

    let unknown = CliArgs {
        task: vec!["missing".to_string()],
        ..cli_args(&path)
    };
    assert!(dynadag::run(unknown).await.is_err());

    let zero_jobs = CliArgs {
        jobs: Some(0),
        ..cli_args(&path)
    };
    assert!(dynadag::run(zero_jobs).await.is_err());
}

#[tokio::test]
async fn failed_target_is_shared_by_later_builders_in_the_session() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.a]
cmd = "echo x >> attempts.log; exit 1"
target = "out"

[task.slow]
cmd = "sleep 0.3 && echo slow"

[task.d]
after = ["slow"]
cmd = "echo x >> attempts.log; exit 1"
target = "out"
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let results = with_timeout(sched.evaluate(vec![
        ManifestTask::named("a"),
        ManifestTask::named("d"),
    ]))
    .await
    .expect("a failed build is a per-root failure, not an engine error");

    assert!(results[&ManifestTask::named("a")].is_err());
    match results[&ManifestTask::named("d")].clone().unwrap_err() {
        Failure::Dependency { cause, .. } => {
            assert!(matches!(*cause, Failure::TargetFailed { .. }), "{cause:?}");
        }
        other => panic!("expected d to fail through the shared target, got {other:?}"),
    }
    assert_eq!(line_count(&dir.path().join("attempts.log")), 1);
}

#[tokio::test]
async fn failed_target_stays_failed_across_evaluate_calls() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(
        &dir,
        r#"
[task.first]
cmd = "echo x >> attempts.log; exit 2"
target = "lib.so"

[task.second]
cmd = "echo x >> attempts.log; exit 2"
target = "lib.so"
"#,
    );
    let sched = scheduler_for(manifest, &dir);

    let first = with_timeout(sched.evaluate_one(ManifestTask::named("first")))
        .await
        .unwrap();
    assert!(first.is_err());

    let second = with_timeout(sched.evaluate_one(ManifestTask::named("second")))
        .await
        .expect("second builder must not trip a contract violation")
        .unwrap_err();
    match second {
        Failure::Dependency { cause, .. } => match *cause {
            Failure::TargetFailed { target, .. } => assert_eq!(target.as_str(), "lib.so"),
            other => panic!("expected TargetFailed, got {other:?}"),
        },
        other => panic!("expected a dependency failure, got {other:?}"),
    }

    assert_eq!(line_count(&dir.path().join("attempts.log")), 1);
    assert_eq!(
        sched.producer().fingerprints().state(&dynadag::TargetId::new("lib.so")),
        dynadag::store::FingerprintState::Failed
    );
}
