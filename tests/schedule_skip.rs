mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use dagrun::conditions::{Condition, ConditionError, ConditionEvaluator};
use dagrun::dag::NodeStatus;
use dagrun::errors::NodeError;
use dagrun::sched::{Config, Scheduler, SchedulerStatus};
use dagrun_test_utils::{graph, FakeRunner, Recorder, StepBuilder};

type TestResult = Result<(), Box<dyn Error>>;

/// Evaluator that rejects every condition, whatever it says.
struct RejectAll;

impl ConditionEvaluator for RejectAll {
    fn eval_condition(
        &self,
        condition: &Condition,
    ) -> std::result::Result<(), ConditionError> {
        Err(ConditionError {
            condition: condition.condition.clone(),
            expected: condition.expected.clone(),
            actual: "rejected".to_string(),
        })
    }
}

#[tokio::test]
async fn failed_precondition_skips_step() -> TestResult {
    init_tracing();

    let recorder = Recorder::new();
    let g = graph(vec![StepBuilder::new("gated")
        .precondition("1", "0")
        .build_node(Arc::new(
            FakeRunner::new().with_recorder(recorder.clone()),
        ))]);

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        ..Config::default()
    });

    // A skipped step is not a failure.
    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;

    let node = g.node_by_name("gated").unwrap();
    assert_eq!(node.status(), NodeStatus::Skipped);
    assert!(matches!(node.error(), Some(NodeError::Precondition(_))));
    assert!(recorder.executions().is_empty());
    assert_eq!(scheduler.status(&g), SchedulerStatus::Success);

    Ok(())
}

#[tokio::test]
async fn skip_does_not_propagate_past_continue_on_skipped() -> TestResult {
    init_tracing();

    let g = graph(vec![
        StepBuilder::new("A")
            .precondition("1", "0")
            .continue_on_skipped()
            .build_node(Arc::new(FakeRunner::new())),
        StepBuilder::new("B").after("A").build_node(Arc::new(FakeRunner::new())),
        StepBuilder::new("C").after("B").build_node(Arc::new(FakeRunner::new())),
    ]);

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        ..Config::default()
    });

    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;

    assert_eq!(g.node_by_name("A").unwrap().status(), NodeStatus::Skipped);
    assert_eq!(g.node_by_name("B").unwrap().status(), NodeStatus::Success);
    assert_eq!(g.node_by_name("C").unwrap().status(), NodeStatus::Success);
    assert_eq!(scheduler.status(&g), SchedulerStatus::Success);

    Ok(())
}

#[tokio::test]
async fn skip_propagates_down_the_chain_by_default() -> TestResult {
    init_tracing();

    let g = graph(vec![
        StepBuilder::new("A")
            .precondition("1", "0")
            .build_node(Arc::new(FakeRunner::new())),
        StepBuilder::new("B").after("A").build_node(Arc::new(FakeRunner::new())),
        StepBuilder::new("C").after("B").build_node(Arc::new(FakeRunner::new())),
    ]);

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        ..Config::default()
    });

    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;

    assert_eq!(g.node_by_name("A").unwrap().status(), NodeStatus::Skipped);

    let b = g.node_by_name("B").unwrap();
    assert_eq!(b.status(), NodeStatus::Skipped);
    assert_eq!(b.error(), Some(NodeError::UpstreamSkipped));
    assert_eq!(g.node_by_name("C").unwrap().status(), NodeStatus::Skipped);

    // Nothing failed, so the run as a whole still counts as a success.
    assert_eq!(scheduler.status(&g), SchedulerStatus::Success);

    Ok(())
}

#[tokio::test]
async fn custom_evaluator_replaces_the_default() -> TestResult {
    init_tracing();

    let g = graph(vec![StepBuilder::new("gated")
        .precondition("1", "1")
        .build_node(Arc::new(FakeRunner::new()))]);

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        ..Config::default()
    })
    .with_evaluator(Arc::new(RejectAll));

    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;

    // The default evaluator would have let "1" == "1" through.
    assert_eq!(g.node_by_name("gated").unwrap().status(), NodeStatus::Skipped);

    Ok(())
}

#[tokio::test]
async fn env_preconditions_gate_steps() -> TestResult {
    init_tracing();

    std::env::set_var("DAGRUN_TEST_SKIP_GATE", "on");

    let recorder = Recorder::new();
    let g = graph(vec![
        StepBuilder::new("enabled")
            .precondition("${DAGRUN_TEST_SKIP_GATE}", "on")
            .build_node(Arc::new(FakeRunner::new().with_recorder(recorder.clone()))),
        StepBuilder::new("disabled")
            .precondition("$DAGRUN_TEST_SKIP_GATE_MISSING", "on")
            .build_node(Arc::new(FakeRunner::new().with_recorder(recorder.clone()))),
    ]);

    let logs = tempfile::tempdir()?;
    let scheduler = Scheduler::new(Config {
        log_dir: Some(logs.path().to_path_buf()),
        ..Config::default()
    });

    timeout(Duration::from_secs(10), scheduler.schedule(&g, None)).await??;

    assert_eq!(g.node_by_name("enabled").unwrap().status(), NodeStatus::Success);
    assert_eq!(g.node_by_name("disabled").unwrap().status(), NodeStatus::Skipped);
    assert_eq!(recorder.executions(), vec!["enabled"]);

    Ok(())
}
