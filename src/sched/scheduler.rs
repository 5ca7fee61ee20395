// src/sched/scheduler.rs

//! The scheduler: dispatch loop, lifecycle handlers, signal/cancel
//! control and status derivation.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::conditions::{ConditionEvaluator, EnvEvaluator};
use crate::dag::{readiness, ExecutionGraph, Node, NodeStatus};
use crate::errors::{NodeError, Result, SchedulerError};
use crate::exec::Signal;
use crate::sched::worker::{self, WorkerEnv};
use crate::sched::{DoneSender, HandlerType, SchedState, SchedulerStatus};

/// Scheduler configuration. Plain record, stored by value.
#[derive(Debug, Default)]
pub struct Config {
    /// Directory for per-step log files. Defaults from
    /// [`settings::default_log_dir`](crate::settings::default_log_dir).
    pub log_dir: Option<PathBuf>,
    /// Maximum concurrently running steps; 0 means unlimited.
    pub max_active_runs: usize,
    /// Pause inserted after each step launch.
    pub delay: Duration,
    /// If true, nothing is executed and every step succeeds.
    pub dry: bool,
    pub on_exit: Option<Node>,
    pub on_success: Option<Node>,
    pub on_failure: Option<Node>,
    pub on_cancel: Option<Node>,
}

/// Drives an [`ExecutionGraph`] to completion.
///
/// All methods take `&self`; a run can be cancelled or signalled from
/// another task while [`schedule`](Scheduler::schedule) is in flight.
pub struct Scheduler {
    config: Config,
    /// Poll period of the dispatch and drain loops.
    pause: Duration,
    state: Arc<SchedState>,
    handlers: HashMap<HandlerType, Arc<Node>>,
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl Scheduler {
    pub fn new(mut config: Config) -> Self {
        let mut handlers = HashMap::new();
        if let Some(node) = config.on_exit.take() {
            handlers.insert(HandlerType::Exit, Arc::new(node));
        }
        if let Some(node) = config.on_success.take() {
            handlers.insert(HandlerType::Success, Arc::new(node));
        }
        if let Some(node) = config.on_failure.take() {
            handlers.insert(HandlerType::Failure, Arc::new(node));
        }
        if let Some(node) = config.on_cancel.take() {
            handlers.insert(HandlerType::Cancel, Arc::new(node));
        }

        Self {
            config,
            pause: Duration::from_millis(100),
            state: Arc::new(SchedState::new()),
            handlers,
            evaluator: Arc::new(EnvEvaluator),
        }
    }

    /// Replace the precondition evaluator.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Drive the graph to completion and run lifecycle handlers.
    ///
    /// Every node is delivered on `done` as it reaches a terminal status.
    /// Returns the last step or handler error observed, if any.
    pub async fn schedule(
        &self,
        graph: &ExecutionGraph,
        done: Option<DoneSender>,
    ) -> Result<()> {
        let log_dir = self.setup()?;
        graph.set_started_at(SystemTime::now());

        let env = Arc::new(WorkerEnv {
            dry: self.config.dry,
            log_dir: log_dir.clone(),
            state: Arc::clone(&self.state),
        });
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !is_finished(graph) {
            if self.state.is_canceled() {
                break;
            }

            for node in graph.nodes() {
                if node.status() != NodeStatus::NotStarted {
                    continue;
                }
                if !readiness::evaluate(graph, node.as_ref()) {
                    continue;
                }
                if self.state.is_canceled() {
                    break;
                }
                if self.config.max_active_runs > 0
                    && running_count(graph) >= self.config.max_active_runs
                {
                    continue;
                }

                let preconditions = &node.step().preconditions;
                if !preconditions.is_empty() {
                    debug!(step = %node.name(), "checking preconditions");
                    if let Err(err) = self.evaluator.eval_conditions(preconditions) {
                        info!(step = %node.name(), %err, "precondition not met; skipping step");
                        node.update_status(NodeStatus::Skipped);
                        node.set_error(NodeError::Precondition(err.to_string()));
                        continue;
                    }
                }

                info!(step = %node.name(), "starting step");
                node.update_status(NodeStatus::Running);
                node.set_started_at(SystemTime::now());
                workers.push(tokio::spawn(worker::run_node(
                    Arc::clone(&env),
                    Arc::clone(node),
                    done.clone(),
                )));

                if !self.config.delay.is_zero() {
                    sleep(self.config.delay).await;
                }
            }

            sleep(self.pause).await;
        }

        for handle in workers {
            let _ = handle.await;
        }

        // Nodes never launched before cancellation still need a terminal
        // status.
        if self.state.is_canceled() {
            for node in graph.nodes() {
                if node.status() == NodeStatus::NotStarted {
                    node.update_status(NodeStatus::Cancel);
                }
            }
        }

        graph.set_finished_at(SystemTime::now());

        self.run_handlers(graph, &log_dir, &done).await;

        match self.state.last_error() {
            Some(error) => Err(SchedulerError::Step(error)),
            None => Ok(()),
        }
    }

    /// Stop launching new work and request termination of every node.
    pub fn cancel(&self, graph: &ExecutionGraph) {
        info!("cancelling run");
        self.state.set_canceled();
        for node in graph.nodes() {
            node.cancel();
        }
    }

    /// Forward `signal` to every non-repeating node and stop launching new
    /// work. Repeating nodes are left to finish their current iteration;
    /// the cancel flag keeps them from starting another.
    ///
    /// When `done` is provided the call waits until no node is running,
    /// then emits `true`.
    pub async fn signal(
        &self,
        graph: &ExecutionGraph,
        signal: Signal,
        done: Option<oneshot::Sender<bool>>,
    ) {
        info!(%signal, "signalling run");
        if !self.state.is_canceled() {
            self.state.set_canceled();
        }
        for node in graph.nodes() {
            if !node.step().repeat_policy.repeat {
                node.signal(signal);
            }
        }

        if let Some(done) = done {
            while is_running(graph) {
                sleep(self.pause).await;
            }
            let _ = done.send(true);
        }
    }

    /// Derive the overall status of a run.
    pub fn status(&self, graph: &ExecutionGraph) -> SchedulerStatus {
        if self.state.is_canceled()
            && !every_node_in(graph, &[NodeStatus::Success, NodeStatus::Skipped])
        {
            return SchedulerStatus::Cancel;
        }

        let ts = graph.run_timestamps();
        if ts.started_at.is_none() {
            return SchedulerStatus::NotStarted;
        }
        if ts.finished_at.is_none() {
            return SchedulerStatus::Running;
        }
        if self.state.last_error().is_some() {
            return SchedulerStatus::Error;
        }
        SchedulerStatus::Success
    }

    pub fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    pub fn handler_node(&self, handler: HandlerType) -> Option<&Arc<Node>> {
        self.handlers.get(&handler)
    }

    /// Resolve the log directory and create it unless this is a dry run.
    fn setup(&self) -> Result<PathBuf> {
        let dir = self
            .config
            .log_dir
            .clone()
            .unwrap_or_else(crate::settings::default_log_dir);
        if !self.config.dry {
            fs::create_dir_all(&dir).map_err(|source| SchedulerError::LogDir {
                dir: dir.clone(),
                source,
            })?;
        }
        Ok(dir)
    }

    /// Run the status-specific handler, then `onExit`, serially. Handlers
    /// ignore cancellation and have no policies; their failures replace
    /// the last error.
    async fn run_handlers(
        &self,
        graph: &ExecutionGraph,
        log_dir: &Path,
        done: &Option<DoneSender>,
    ) {
        let mut order = Vec::with_capacity(2);
        match self.status(graph) {
            SchedulerStatus::Success => order.push(HandlerType::Success),
            SchedulerStatus::Error => order.push(HandlerType::Failure),
            SchedulerStatus::Cancel => order.push(HandlerType::Cancel),
            SchedulerStatus::NotStarted | SchedulerStatus::Running => {}
        }
        order.push(HandlerType::Exit);

        for handler in order {
            let Some(node) = self.handlers.get(&handler) else {
                continue;
            };

            info!(handler = %handler, step = %node.name(), "running lifecycle handler");
            if let Err(error) = self.run_handler_node(node, log_dir).await {
                self.state.set_last_error(error);
            }
            if let Some(done) = done {
                let _ = done.send(Arc::clone(node));
            }
        }
    }

    async fn run_handler_node(
        &self,
        node: &Arc<Node>,
        log_dir: &Path,
    ) -> std::result::Result<(), NodeError> {
        node.update_status(NodeStatus::Running);
        node.set_started_at(SystemTime::now());

        let result = if self.config.dry {
            Ok(())
        } else {
            if let Err(err) = node.setup_log(log_dir).and_then(|_| node.open_log_file()) {
                warn!(step = %node.name(), error = %err, "failed to open handler log file");
            }
            let result = node.execute().await;
            node.close_log_file();
            result
        };

        node.set_finished_at(SystemTime::now());

        match result {
            Ok(()) => {
                node.update_status(NodeStatus::Success);
                Ok(())
            }
            Err(err) => {
                warn!(step = %node.name(), error = %err, "lifecycle handler failed");
                node.update_status(NodeStatus::Error);
                let error = NodeError::Execution(format!("{err:#}"));
                node.set_error(error.clone());
                Err(error)
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn is_running(graph: &ExecutionGraph) -> bool {
    graph
        .nodes()
        .iter()
        .any(|node| node.status() == NodeStatus::Running)
}

fn running_count(graph: &ExecutionGraph) -> usize {
    graph
        .nodes()
        .iter()
        .filter(|node| node.status() == NodeStatus::Running)
        .count()
}

/// A graph is finished when no node is running or waiting to start.
fn is_finished(graph: &ExecutionGraph) -> bool {
    !graph
        .nodes()
        .iter()
        .any(|node| matches!(node.status(), NodeStatus::Running | NodeStatus::NotStarted))
}

fn every_node_in(graph: &ExecutionGraph, statuses: &[NodeStatus]) -> bool {
    graph
        .nodes()
        .iter()
        .all(|node| statuses.contains(&node.status()))
}
