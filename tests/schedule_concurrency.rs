mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use dagrun::dag::NodeStatus;
use dagrun::sched::{Config, Scheduler};
use dagrun_test_utils::{graph, FakeRunner, Recorder, StepBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn sleepy_nodes(recorder: &Arc<Recorder>, latency: Duration) -> Vec<dagrun::dag::Node> {
    ["A", "B", "C", "D"]
        .iter()
        .map(|name| {
            StepBuilder::new(name).build_node(Arc::new(
                FakeRunner::new()
                    .with_latency(latency)
                    .with_recorder(recorder.clone()),
            ))
        })
        .collect()
}

#[tokio::test]
async fn max_active_runs_caps_parallelism() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let g = graph(sleepy_nodes(&recorder, Duration::from_millis(200)));

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        max_active_runs: 2,
        ..Config::default()
    });

    let started = Instant::now();
    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;
    let elapsed = started.elapsed();

    assert!(recorder.peak_running() <= 2, "peak {}", recorder.peak_running());
    assert!(
        elapsed >= Duration::from_millis(400),
        "four 200ms steps under a cap of 2 finished in {elapsed:?}"
    );

    for node in g.nodes() {
        assert_eq!(node.status(), NodeStatus::Success, "step {}", node.name());
    }

    Ok(())
}

#[tokio::test]
async fn unlimited_cap_runs_siblings_together() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let g = graph(sleepy_nodes(&recorder, Duration::from_millis(300)));

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        max_active_runs: 0,
        ..Config::default()
    });

    let started = Instant::now();
    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;
    let elapsed = started.elapsed();

    assert!(recorder.peak_running() >= 2, "peak {}", recorder.peak_running());
    // Serialized execution would take at least 1.2s.
    assert!(
        elapsed < Duration::from_millis(1100),
        "independent steps did not overlap: {elapsed:?}"
    );

    Ok(())
}

#[tokio::test]
async fn launch_delay_staggers_dispatch() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let g = graph(vec![
        StepBuilder::new("A").build_node(Arc::new(
            FakeRunner::new().with_recorder(recorder.clone()),
        )),
        StepBuilder::new("B").build_node(Arc::new(
            FakeRunner::new().with_recorder(recorder.clone()),
        )),
        StepBuilder::new("C").build_node(Arc::new(
            FakeRunner::new().with_recorder(recorder.clone()),
        )),
    ]);

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        delay: Duration::from_millis(150),
        ..Config::default()
    });

    let started = Instant::now();
    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;
    let elapsed = started.elapsed();

    assert_eq!(recorder.execution_count(), 3);
    assert!(
        elapsed >= Duration::from_millis(450),
        "three launches with a 150ms delay finished in {elapsed:?}"
    );

    Ok(())
}
