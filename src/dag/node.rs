// src/dag/node.rs

//! Per-step runtime state and the capability surface the scheduler drives.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::dag::step::Step;
use crate::errors::NodeError;
use crate::exec::{Signal, StepRunner};

/// Execution status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    NotStarted,
    Running,
    Success,
    Error,
    Cancel,
    Skipped,
}

impl NodeStatus {
    /// Whether no further transition will happen outside the retry path.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Success | NodeStatus::Error | NodeStatus::Cancel | NodeStatus::Skipped
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::NotStarted => "not started",
            NodeStatus::Running => "running",
            NodeStatus::Success => "finished",
            NodeStatus::Error => "failed",
            NodeStatus::Cancel => "canceled",
            NodeStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Value snapshot of a node's mutable state.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub status: NodeStatus,
    pub retry_count: u32,
    pub done_count: u32,
    pub error: Option<NodeError>,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            status: NodeStatus::NotStarted,
            retry_count: 0,
            done_count: 0,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

struct LogHandle {
    path: Option<PathBuf>,
    file: Option<File>,
}

/// One executable step bound to its runner capability and runtime state.
///
/// Status transitions are serialized behind the state mutex; reads return
/// value snapshots. The guard is never held across an `await`.
pub struct Node {
    pub(crate) id: usize,
    step: Step,
    runner: Arc<dyn StepRunner>,
    state: Mutex<NodeState>,
    log: Mutex<LogHandle>,
}

impl Node {
    pub fn new(step: Step, runner: Arc<dyn StepRunner>) -> Self {
        Self {
            id: 0,
            step,
            runner,
            state: Mutex::new(NodeState::default()),
            log: Mutex::new(LogHandle {
                path: None,
                file: None,
            }),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.step.name
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        // A poisoned guard only means a worker panicked mid-update; the
        // state itself is still a coherent value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn log(&self) -> MutexGuard<'_, LogHandle> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn status(&self) -> NodeStatus {
        self.state().status
    }

    pub fn update_status(&self, status: NodeStatus) {
        self.state().status = status;
    }

    pub fn snapshot(&self) -> NodeState {
        self.state().clone()
    }

    pub fn error(&self) -> Option<NodeError> {
        self.state().error.clone()
    }

    pub fn set_error(&self, error: NodeError) {
        self.state().error = Some(error);
    }

    pub fn retry_count(&self) -> u32 {
        self.state().retry_count
    }

    pub fn inc_retry_count(&self) {
        self.state().retry_count += 1;
    }

    pub fn done_count(&self) -> u32 {
        self.state().done_count
    }

    pub fn inc_done_count(&self) {
        self.state().done_count += 1;
    }

    pub fn set_started_at(&self, at: SystemTime) {
        self.state().started_at = Some(at);
    }

    pub fn set_finished_at(&self, at: SystemTime) {
        self.state().finished_at = Some(at);
    }

    /// Run the step's command through the node's runner, writing output to
    /// the open log file if there is one.
    pub async fn execute(&self) -> anyhow::Result<()> {
        let log = {
            let guard = self.log();
            match guard.file.as_ref() {
                Some(file) => Some(file.try_clone()?),
                None => None,
            }
        };
        self.runner.execute(&self.step, log).await
    }

    /// Forward a signal to the running process, if any.
    pub fn signal(&self, signal: Signal) {
        self.runner.signal(signal);
    }

    /// Request termination. The node reports `Cancel` from here on unless
    /// it had already reached a terminal status.
    pub fn cancel(&self) {
        {
            let mut state = self.state();
            if matches!(state.status, NodeStatus::NotStarted | NodeStatus::Running) {
                state.status = NodeStatus::Cancel;
            }
        }
        self.runner.cancel();
    }

    /// Decide where this node's log file will live.
    pub fn setup_log(&self, dir: &Path) -> std::io::Result<()> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let file_name = format!("{}.{stamp}.log", safe_file_name(&self.step.name));
        self.log().path = Some(dir.join(file_name));
        Ok(())
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log().path.clone()
    }

    /// Open the log file chosen by [`setup_log`](Node::setup_log).
    pub fn open_log_file(&self) -> std::io::Result<()> {
        let mut guard = self.log();
        if let Some(path) = guard.path.clone() {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            guard.file = Some(file);
        }
        Ok(())
    }

    /// Release the log file handle. Safe to call when none is open.
    pub fn close_log_file(&self) {
        self.log().file.take();
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("step", &self.step.name)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
